//! Duration edits on a single day.
//!
//! Growing a block absorbs the one-slot periods that follow it; any longer
//! block in the way is first broken back into one-slot lessons. Shrinking a
//! block hands every vacated slot back as an empty one-slot lesson. Breaks
//! never move and never count towards a duration.
//!
//! Every edit runs against a scratch copy and is committed only once the
//! tiling and grid checks pass, so a failed call leaves the caller's state
//! untouched.

use chrono::Weekday;
use tracing::{debug, error};

use super::error::{Result, TimetableError};
use super::grid::{project, recompute_row_spans, GridColumn, GridConfig};
use super::period::{Period, PeriodSequence};
use super::slot::SlotTemplate;
use super::validate::{check_grid, check_tiling};

/// Longest duration the block at `start_slot` may take: every non-break slot
/// from its start to the end of the day. Longer blocks further on do not
/// limit it, they get broken up when the block grows into them.
pub fn max_available_duration(
    sequence: &PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
) -> Result<u32> {
    let period = resizable_period(sequence, start_slot)?;
    Ok(template.non_break_count_from(period.start_slot()))
}

pub fn duration_options(
    sequence: &PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
) -> Result<Vec<u32>> {
    let max = max_available_duration(sequence, template, start_slot)?;
    Ok((1..=max).collect())
}

/// Changes the duration of the Lesson/NIT block starting at `start_slot`.
pub fn change_duration(
    sequence: &mut PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
    new_duration: u32,
) -> Result<()> {
    let old_duration = check_preconditions(sequence, template, start_slot, new_duration)?;
    if old_duration == new_duration {
        return Ok(());
    }

    let mut scratch = sequence.clone();
    resequence(&mut scratch, template, start_slot, old_duration, new_duration)?;
    check_tiling(&scratch, template).map_err(|e| abort(start_slot, e))?;

    *sequence = scratch;
    Ok(())
}

/// Same as [`change_duration`], keeping the day's grid column in step.
pub fn change_duration_in_column(
    sequence: &mut PeriodSequence,
    column: &mut GridColumn,
    template: &SlotTemplate,
    config: &GridConfig,
    start_slot: u32,
    new_duration: u32,
) -> Result<()> {
    if !column.is_working_day {
        return Err(TimetableError::invalid_operation(format!(
            "{} is not a working day",
            column.day
        )));
    }
    let old_duration = check_preconditions(sequence, template, start_slot, new_duration)?;
    let cell = column
        .cell_at(start_slot)
        .ok_or(TimetableError::NotFound { slot: start_slot })?;
    let expected_spans = recompute_row_spans(cell, old_duration, new_duration, template, config)?;
    if old_duration == new_duration {
        return Ok(());
    }

    let mut scratch = sequence.clone();
    resequence(&mut scratch, template, start_slot, old_duration, new_duration)?;
    let rebuilt = project(&scratch, template, column.day, true, config)?;

    let result = check_tiling(&scratch, template)
        .and_then(|_| check_grid(&scratch, &rebuilt))
        .and_then(|_| match rebuilt.cell_at(start_slot) {
            Some(c) if c.row_spans == expected_spans => Ok(()),
            _ => Err(TimetableError::inconsistent(format!(
                "row spans of slot {} diverged from the projection",
                start_slot
            ))),
        });
    result.map_err(|e| abort(start_slot, e))?;

    *sequence = scratch;
    *column = rebuilt;
    Ok(())
}

fn resizable_period(sequence: &PeriodSequence, start_slot: u32) -> Result<&Period> {
    let period = sequence
        .get(start_slot)
        .ok_or(TimetableError::NotFound { slot: start_slot })?;
    if !period.is_resizable() {
        return Err(TimetableError::invalid_operation(format!(
            "{} at slot {} cannot be resized",
            period.kind_str(),
            start_slot
        )));
    }
    Ok(period)
}

/// Returns the current duration when the edit is allowed.
fn check_preconditions(
    sequence: &PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
    new_duration: u32,
) -> Result<u32> {
    let period = resizable_period(sequence, start_slot)?;
    let max = template.non_break_count_from(start_slot);
    if new_duration == 0 || new_duration > max {
        return Err(TimetableError::InvalidDuration {
            requested: new_duration,
            max,
        });
    }
    Ok(period.number_of_slots())
}

fn abort(start_slot: u32, e: TimetableError) -> TimetableError {
    error!(start_slot, error = %e, "duration change aborted");
    e
}

fn resequence(
    sequence: &mut PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
    old_duration: u32,
    new_duration: u32,
) -> Result<()> {
    if new_duration > old_duration {
        grow(sequence, template, start_slot, old_duration, new_duration)
    } else {
        shrink(sequence, template, start_slot, old_duration, new_duration)
    }
}

fn grow(
    sequence: &mut PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
    old_duration: u32,
    new_duration: u32,
) -> Result<()> {
    let window = template.expand(start_slot, new_duration).ok_or_else(|| {
        TimetableError::inconsistent(format!(
            "slot {} cannot hold {} slots",
            start_slot, new_duration
        ))
    })?;
    let new_end = window.last().copied().unwrap_or(start_slot);

    // Break up every longer block that starts inside the new footprint so
    // that only one-slot periods remain to absorb.
    let in_the_way: Vec<(u32, u32)> = sequence
        .after(start_slot)
        .take_while(|p| p.start_slot() <= new_end)
        .filter(|p| p.is_resizable() && p.number_of_slots() > 1)
        .map(|p| (p.start_slot(), p.number_of_slots()))
        .collect();
    for (block_start, block_len) in in_the_way {
        debug!(block_start, block_len, "making room");
        shrink(sequence, template, block_start, block_len, 1)?;
    }

    let absorbed: Vec<u32> = sequence
        .after(start_slot)
        .filter(|p| p.is_resizable())
        .take((new_duration - old_duration) as usize)
        .map(|p| p.start_slot())
        .collect();
    if absorbed.as_slice() != &window[old_duration as usize..] {
        return Err(TimetableError::inconsistent(format!(
            "growing slot {} would absorb {:?}, expected {:?}",
            start_slot,
            absorbed,
            &window[old_duration as usize..]
        )));
    }
    for slot in &absorbed {
        sequence.remove(*slot);
    }
    debug!(start_slot, ?absorbed, new_duration, "grew block");

    set_duration(sequence, start_slot, new_duration)
}

fn shrink(
    sequence: &mut PeriodSequence,
    template: &SlotTemplate,
    start_slot: u32,
    old_duration: u32,
    new_duration: u32,
) -> Result<()> {
    let covered = template.expand(start_slot, old_duration).ok_or_else(|| {
        TimetableError::inconsistent(format!(
            "block at slot {} runs past the end of the day",
            start_slot
        ))
    })?;
    let vacated = &covered[new_duration as usize..];

    set_duration(sequence, start_slot, new_duration)?;
    for &slot in vacated {
        if sequence.insert(Period::empty_lesson(slot)).is_some() {
            return Err(TimetableError::inconsistent(format!(
                "vacated slot {} was already claimed",
                slot
            )));
        }
    }
    debug!(start_slot, ?vacated, new_duration, "shrank block");
    Ok(())
}

fn set_duration(sequence: &mut PeriodSequence, start_slot: u32, n: u32) -> Result<()> {
    sequence
        .get_mut(start_slot)
        .ok_or(TimetableError::NotFound { slot: start_slot })?
        .set_number_of_slots(n)
}

/// One day's editing session: the sequence and its grid column, owned
/// together so they cannot drift apart.
#[derive(Debug, Clone)]
pub struct DayEditor<'a> {
    template: &'a SlotTemplate,
    config: GridConfig,
    sequence: PeriodSequence,
    column: GridColumn,
}

impl<'a> DayEditor<'a> {
    pub fn new(
        template: &'a SlotTemplate,
        config: GridConfig,
        day: Weekday,
        is_working_day: bool,
        sequence: PeriodSequence,
    ) -> Result<Self> {
        check_tiling(&sequence, template)?;
        let column = project(&sequence, template, day, is_working_day, &config)?;
        Ok(Self {
            template,
            config,
            sequence,
            column,
        })
    }

    pub fn sequence(&self) -> &PeriodSequence {
        &self.sequence
    }

    pub fn column(&self) -> &GridColumn {
        &self.column
    }

    pub fn max_available_duration(&self, start_slot: u32) -> Result<u32> {
        max_available_duration(&self.sequence, self.template, start_slot)
    }

    pub fn duration_options(&self, start_slot: u32) -> Result<Vec<u32>> {
        duration_options(&self.sequence, self.template, start_slot)
    }

    pub fn change_duration(&mut self, start_slot: u32, new_duration: u32) -> Result<()> {
        change_duration_in_column(
            &mut self.sequence,
            &mut self.column,
            self.template,
            &self.config,
            start_slot,
            new_duration,
        )
    }

    pub fn set_subject(&mut self, start_slot: u32, subject: &str) -> Result<()> {
        self.sequence.set_subject(start_slot, subject)?;
        self.reproject()
    }

    pub fn set_duty_label(&mut self, start_slot: u32, label: Option<&str>) -> Result<()> {
        self.sequence.set_duty_label(start_slot, label)?;
        self.reproject()
    }

    /// Back to one period per slot.
    pub fn reset(&mut self) -> Result<()> {
        self.sequence = PeriodSequence::from_template(self.template);
        self.reproject()
    }

    fn reproject(&mut self) -> Result<()> {
        self.column = project(
            &self.sequence,
            self.template,
            self.column.day,
            self.column.is_working_day,
            &self.config,
        )?;
        Ok(())
    }
}
