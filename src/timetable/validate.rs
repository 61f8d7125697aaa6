//! Post-condition checks shared by loading and resequencing.

use super::error::{Result, TimetableError};
use super::grid::GridColumn;
use super::period::{Period, PeriodSequence};
use super::slot::SlotTemplate;

/// Every slot of `template` is claimed by exactly one period, breaks by Break
/// periods and everything else by Lesson/NIT blocks.
pub fn check_tiling(sequence: &PeriodSequence, template: &SlotTemplate) -> Result<()> {
    let mut owner: Vec<Option<u32>> = vec![None; template.len() as usize];

    for period in sequence.iter() {
        let start = period.start_slot();
        match period {
            Period::Break { .. } => {
                if !template.is_break(start) {
                    return Err(TimetableError::inconsistent(format!(
                        "break period at slot {} which is not a break slot",
                        start
                    )));
                }
            }
            Period::Lesson { .. } | Period::NonInstructional { .. } => {
                if template.kind(start).is_none() || template.is_break(start) {
                    return Err(TimetableError::inconsistent(format!(
                        "{} starts at slot {} which cannot hold it",
                        period.kind_str(),
                        start
                    )));
                }
                if period.number_of_slots() == 0 {
                    return Err(TimetableError::inconsistent(format!(
                        "{} at slot {} has zero slots",
                        period.kind_str(),
                        start
                    )));
                }
            }
        }

        let covered = period.covered_slots(template).ok_or_else(|| {
            TimetableError::inconsistent(format!(
                "{} at slot {} runs past the end of the day",
                period.kind_str(),
                start
            ))
        })?;
        for slot in covered {
            let cell = &mut owner[(slot - 1) as usize];
            if let Some(other) = cell {
                return Err(TimetableError::inconsistent(format!(
                    "slot {} claimed by periods at {} and {}",
                    slot, other, start
                )));
            }
            *cell = Some(start);
        }
    }

    if let Some(idx) = owner.iter().position(|o| o.is_none()) {
        return Err(TimetableError::inconsistent(format!(
            "slot {} is not covered by any period",
            idx + 1
        )));
    }
    Ok(())
}

/// The grid mirrors the sequence one cell per period, in the same order.
pub fn check_grid(sequence: &PeriodSequence, column: &GridColumn) -> Result<()> {
    if column.cells.len() != sequence.len() {
        return Err(TimetableError::inconsistent(format!(
            "grid has {} cells for {} periods",
            column.cells.len(),
            sequence.len()
        )));
    }
    for (cell, period) in column.cells.iter().zip(sequence.iter()) {
        if &cell.period != period {
            return Err(TimetableError::inconsistent(format!(
                "grid cell for slot {} does not match period at slot {}",
                cell.period.start_slot(),
                period.start_slot()
            )));
        }
    }
    Ok(())
}
