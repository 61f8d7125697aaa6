//! Projection of a day's periods onto grid rows and columns.
//!
//! Rows and columns follow CSS grid-line numbering: a span `(3, 5)` covers
//! rows 3 and 4. Slot `p` starts at row `p + header_rows`.

use chrono::{NaiveTime, Weekday};
use serde::Serialize;

use super::error::{Result, TimetableError};
use super::period::{Period, PeriodSequence};
use super::slot::SlotTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pub header_rows: u32,
    pub header_columns: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            header_rows: 2,
            header_columns: 1,
        }
    }
}

impl GridConfig {
    pub fn row_of(&self, slot: u32) -> u32 {
        slot + self.header_rows
    }

    pub fn column_of(&self, day: Weekday) -> u32 {
        day.num_days_from_monday() + 1 + self.header_columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSpan {
    pub start_row: u32,
    pub end_row: u32,
}

impl RowSpan {
    pub fn height(&self) -> u32 {
        self.end_row - self.start_row
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellSource {
    Template,
    Scheduled,
    /// Filler for a slot nothing else claims in the read-only week view.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub period: Period,
    pub source: CellSource,
    pub column: u32,
    pub row_spans: Vec<RowSpan>,
    pub label: String,
    #[serde(with = "opt_hhmm")]
    pub start_time: Option<NaiveTime>,
    #[serde(with = "opt_hhmm")]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridColumn {
    pub day: Weekday,
    pub column: u32,
    pub is_working_day: bool,
    pub cells: Vec<GridCell>,
}

impl GridColumn {
    pub fn cell_at(&self, start_slot: u32) -> Option<&GridCell> {
        self.cells
            .iter()
            .find(|c| c.period.start_slot() == start_slot)
    }
}

pub fn project(
    sequence: &PeriodSequence,
    template: &SlotTemplate,
    day: Weekday,
    is_working_day: bool,
    config: &GridConfig,
) -> Result<GridColumn> {
    let column = config.column_of(day);
    let cells = if is_working_day {
        sequence
            .iter()
            .map(|p| cell_for(p.clone(), CellSource::Template, column, template, config))
            .collect::<Result<Vec<_>>>()?
    } else {
        Vec::new()
    };
    Ok(GridColumn {
        day,
        column,
        is_working_day,
        cells,
    })
}

/// Row spans for `cell` after its duration changes from `old_duration` to
/// `new_duration`.
pub fn recompute_row_spans(
    cell: &GridCell,
    old_duration: u32,
    new_duration: u32,
    template: &SlotTemplate,
    config: &GridConfig,
) -> Result<Vec<RowSpan>> {
    if cell.period.is_break() {
        return Err(TimetableError::invalid_operation(format!(
            "break at slot {} cannot be resized",
            cell.period.start_slot()
        )));
    }
    if old_duration == new_duration {
        return Ok(cell.row_spans.clone());
    }
    block_row_spans(cell.period.start_slot(), new_duration, template, config)
}

/// Walks the template from `start`, opening a new span after every run of
/// break slots, until `duration` non-break slots are consumed.
pub fn block_row_spans(
    start: u32,
    duration: u32,
    template: &SlotTemplate,
    config: &GridConfig,
) -> Result<Vec<RowSpan>> {
    let max = template.non_break_count_from(start);
    if duration == 0 || duration > max {
        return Err(TimetableError::InvalidDuration {
            requested: duration,
            max,
        });
    }

    let mut spans = Vec::new();
    let mut open: Option<RowSpan> = None;
    let mut consumed = 0;
    for position in start..=template.len() {
        if template.is_break(position) {
            if let Some(span) = open.take() {
                spans.push(span);
            }
            continue;
        }
        let row = config.row_of(position);
        match open.as_mut() {
            Some(span) => span.end_row = row + 1,
            None => {
                open = Some(RowSpan {
                    start_row: row,
                    end_row: row + 1,
                })
            }
        }
        consumed += 1;
        if consumed == duration {
            break;
        }
    }
    spans.extend(open);
    Ok(spans)
}

pub(crate) fn cell_for(
    period: Period,
    source: CellSource,
    column: u32,
    template: &SlotTemplate,
    config: &GridConfig,
) -> Result<GridCell> {
    let start = period.start_slot();
    let row_spans = match &period {
        Period::Break { .. } => {
            let row = config.row_of(start);
            vec![RowSpan {
                start_row: row,
                end_row: row + 1,
            }]
        }
        _ => block_row_spans(start, period.number_of_slots(), template, config)?,
    };
    let (start_time, end_time) = period
        .covered_slots(template)
        .and_then(|covered| {
            let last = *covered.last()?;
            template.time_range(start, last)
        })
        .map(|(s, e)| (Some(s), Some(e)))
        .unwrap_or((None, None));
    Ok(GridCell {
        label: period.label().to_string(),
        period,
        source,
        column,
        row_spans,
        start_time,
        end_time,
    })
}

mod opt_hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(t: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }
}
