//! Timetable grid layout and period resequencing.
//!
//! A day is measured against its [`SlotTemplate`]; the [`PeriodSequence`]
//! carves that template into breaks and lesson/NIT blocks, and
//! [`grid::project`] turns the sequence into a [`GridColumn`] of row spans.
//! [`resequence`] is the only place a sequence changes shape.

pub mod error;
pub mod grid;
pub mod period;
pub mod resequence;
pub mod slot;
pub mod validate;
pub mod week;

pub use error::{Result, TimetableError};
pub use grid::{
    block_row_spans, project, recompute_row_spans, CellSource, GridCell, GridColumn, GridConfig,
    RowSpan,
};
pub use period::{Period, PeriodSequence};
pub use resequence::{
    change_duration, change_duration_in_column, duration_options, max_available_duration,
    DayEditor,
};
pub use slot::{SlotDefinition, SlotKind, SlotTemplate};
pub use week::{project_week, ScheduledLesson, WEEK};
