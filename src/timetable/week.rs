//! Read-only week view: scheduled lessons laid over each day's template.
//!
//! Slot by slot, a scheduled lesson starting on the slot wins, then the day's
//! template period, then an empty filler cell. A per-day coverage row keeps
//! multi-slot blocks from being filled twice. Nothing here mutates a
//! sequence.

use std::collections::{HashMap, HashSet};

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::Result;
use super::grid::{cell_for, CellSource, GridColumn, GridConfig};
use super::period::{Period, PeriodSequence};
use super::slot::SlotTemplate;

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn one() -> u32 {
    1
}

/// A lesson from the lesson-plan store, keyed by `(day, start_slot)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledLesson {
    pub day: Weekday,
    pub start_slot: u32,
    #[serde(default = "one")]
    pub number_of_slots: u32,
    #[serde(default)]
    pub subject_name: String,
}

pub fn project_week(
    template: &SlotTemplate,
    day_templates: &HashMap<Weekday, PeriodSequence>,
    working_days: &[Weekday],
    scheduled: &[ScheduledLesson],
    config: &GridConfig,
) -> Result<Vec<GridColumn>> {
    let slot_count = template.len() as usize;
    let mut coverage = vec![vec![false; slot_count]; WEEK.len()];
    let mut used: HashSet<(Weekday, u32)> = HashSet::new();

    let mut by_start: HashMap<(Weekday, u32), &ScheduledLesson> = HashMap::new();
    for lesson in scheduled {
        if by_start.insert((lesson.day, lesson.start_slot), lesson).is_some() {
            warn!(day = %lesson.day, start_slot = lesson.start_slot, "duplicate scheduled lesson, keeping the last one");
        }
    }

    let mut columns = Vec::with_capacity(WEEK.len());
    for (day_idx, &day) in WEEK.iter().enumerate() {
        let column = config.column_of(day);
        let is_working_day = working_days.contains(&day);
        if !is_working_day {
            columns.push(GridColumn {
                day,
                column,
                is_working_day,
                cells: Vec::new(),
            });
            continue;
        }

        let fallback;
        let day_template = match day_templates.get(&day) {
            Some(seq) => seq,
            None => {
                fallback = PeriodSequence::from_template(template);
                &fallback
            }
        };
        let covered = &mut coverage[day_idx];
        let scheduled_here = |slot: u32| by_start.contains_key(&(day, slot));

        let mut cells = Vec::new();
        for slot in template.positions() {
            if covered[(slot - 1) as usize] {
                continue;
            }

            let (period, source) = if template.is_break(slot) {
                let period = day_template
                    .get(slot)
                    .filter(|p| p.is_break())
                    .cloned()
                    .unwrap_or_else(|| Period::Break {
                        duty_label: None,
                        start_slot: slot,
                    });
                (period, CellSource::Template)
            } else if let Some(lesson) = by_start.get(&(day, slot)) {
                used.insert((day, slot));
                let want = lesson.number_of_slots.max(1);
                let n = free_run(template, covered.as_slice(), slot, want, |_| false);
                if n < want {
                    warn!(%day, start_slot = slot, want, got = n, "scheduled lesson clamped");
                }
                let period = Period::Lesson {
                    subject_name: lesson.subject_name.clone(),
                    start_slot: slot,
                    number_of_slots: n,
                };
                (period, CellSource::Scheduled)
            } else if let Some(tp) = day_template.get(slot).filter(|p| !p.is_break()) {
                // Stop short of any later slot a scheduled lesson claims.
                let n = free_run(template, covered.as_slice(), slot, tp.number_of_slots(), |s| {
                    s != slot && scheduled_here(s)
                });
                let mut period = tp.clone();
                period.set_number_of_slots(n)?;
                (period, CellSource::Template)
            } else {
                (Period::empty_lesson(slot), CellSource::Empty)
            };

            if let Some(slots) = period.covered_slots(template) {
                for s in slots {
                    covered[(s - 1) as usize] = true;
                }
            }
            cells.push(cell_for(period, source, column, template, config)?);
        }

        columns.push(GridColumn {
            day,
            column,
            is_working_day,
            cells,
        });
    }

    for lesson in scheduled {
        if !used.contains(&(lesson.day, lesson.start_slot)) {
            warn!(day = %lesson.day, start_slot = lesson.start_slot, "scheduled lesson not shown");
        }
    }

    Ok(columns)
}

/// How many of the `want` non-break slots from `start` are still free,
/// stopping at the first covered slot or the first slot `stop` rejects.
fn free_run(
    template: &SlotTemplate,
    covered: &[bool],
    start: u32,
    want: u32,
    stop: impl Fn(u32) -> bool,
) -> u32 {
    template
        .non_break_positions_from(start)
        .take(want as usize)
        .take_while(|&s| !covered[(s - 1) as usize] && !stop(s))
        .count()
        .max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::fixtures::sample_template;
    use crate::timetable::resequence::change_duration;

    fn lesson(day: Weekday, start_slot: u32, n: u32, subject: &str) -> ScheduledLesson {
        ScheduledLesson {
            day,
            start_slot,
            number_of_slots: n,
            subject_name: subject.to_string(),
        }
    }

    fn weekdays() -> Vec<Weekday> {
        WEEK[..5].to_vec()
    }

    #[test]
    fn scheduled_lessons_take_precedence() {
        let t = sample_template();
        let cols = project_week(
            &t,
            &HashMap::new(),
            &weekdays(),
            &[lesson(Weekday::Tue, 2, 2, "Maths")],
            &GridConfig::default(),
        )
        .expect("week");
        assert_eq!(cols.len(), 7);

        let tue = &cols[1];
        assert_eq!(tue.cells.len(), 7);
        let maths = tue.cell_at(2).expect("maths");
        assert_eq!(maths.source, CellSource::Scheduled);
        assert_eq!(maths.label, "Maths");
        assert_eq!(maths.row_spans.len(), 2);
        assert!(tue.cell_at(4).is_none());
        assert_eq!(cols[0].cells.len(), 8);
        assert!(cols[5].cells.is_empty());
    }

    #[test]
    fn template_blocks_stop_before_scheduled_lessons() {
        let t = sample_template();
        let mut mon = PeriodSequence::from_template(&t);
        change_duration(&mut mon, &t, 4, 4).expect("template block 4,5,7,8");
        let templates = HashMap::from([(Weekday::Mon, mon)]);

        let cols = project_week(
            &t,
            &templates,
            &weekdays(),
            &[lesson(Weekday::Mon, 7, 1, "Art")],
            &GridConfig::default(),
        )
        .expect("week");
        let mon = &cols[0];
        assert_eq!(mon.cell_at(4).map(|c| c.period.number_of_slots()), Some(2));
        assert_eq!(
            mon.cell_at(7).map(|c| c.source),
            Some(CellSource::Scheduled)
        );
        assert_eq!(mon.cell_at(8).map(|c| c.source), Some(CellSource::Empty));
    }

    #[test]
    fn lessons_on_breaks_or_covered_slots_are_dropped() {
        let t = sample_template();
        let cols = project_week(
            &t,
            &HashMap::new(),
            &weekdays(),
            &[
                lesson(Weekday::Wed, 3, 1, "Lunch club"),
                lesson(Weekday::Wed, 1, 3, "Science"),
                lesson(Weekday::Wed, 4, 1, "Shadowed"),
            ],
            &GridConfig::default(),
        )
        .expect("week");
        let wed = &cols[2];
        assert_eq!(wed.cell_at(3).map(|c| c.label.as_str()), Some("Break"));
        assert_eq!(wed.cell_at(1).map(|c| c.period.number_of_slots()), Some(3));
        assert!(wed.cell_at(4).is_none());

        let total: u32 = wed
            .cells
            .iter()
            .map(|c| c.period.number_of_slots())
            .sum();
        assert_eq!(total, t.len());
    }
}
