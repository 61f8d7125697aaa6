use chrono::{NaiveTime, Weekday};
use timetabled::timetable::validate::check_tiling;
use timetabled::timetable::{
    block_row_spans, change_duration, DayEditor, GridConfig, Period, PeriodSequence, RowSpan,
    SlotDefinition, SlotKind, SlotTemplate, TimetableError,
};

fn slot(kind: SlotKind, position: u32, start: (u32, u32), end: (u32, u32)) -> SlotDefinition {
    SlotDefinition {
        kind,
        position,
        start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).expect("start"),
        end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).expect("end"),
        name: None,
    }
}

/// Slots 1,2 lesson; 3 break; 4,5 lesson; 6 break; 7,8 lesson.
fn eight_slot_day() -> SlotTemplate {
    use SlotKind::{Break, LessonCapable};
    SlotTemplate::new(vec![
        slot(LessonCapable, 1, (8, 30), (9, 15)),
        slot(LessonCapable, 2, (9, 15), (10, 0)),
        slot(Break, 3, (10, 0), (10, 20)),
        slot(LessonCapable, 4, (10, 20), (11, 5)),
        slot(LessonCapable, 5, (11, 5), (11, 50)),
        slot(Break, 6, (11, 50), (12, 30)),
        slot(LessonCapable, 7, (12, 30), (13, 15)),
        slot(LessonCapable, 8, (13, 15), (14, 0)),
    ])
    .expect("template")
}

/// Break first, NIT on 3, breaks on 4 and 5 back to back.
fn mixed_day() -> SlotTemplate {
    use SlotKind::{Break, LessonCapable, NonInstructional};
    SlotTemplate::new(vec![
        slot(Break, 1, (8, 0), (8, 15)),
        slot(LessonCapable, 2, (8, 15), (9, 0)),
        slot(NonInstructional, 3, (9, 0), (9, 45)),
        slot(Break, 4, (9, 45), (10, 0)),
        slot(Break, 5, (10, 0), (10, 20)),
        slot(LessonCapable, 6, (10, 20), (11, 5)),
    ])
    .expect("template")
}

fn editor(t: &SlotTemplate) -> DayEditor<'_> {
    DayEditor::new(
        t,
        GridConfig::default(),
        Weekday::Mon,
        true,
        PeriodSequence::from_template(t),
    )
    .expect("editor")
}

fn spans(pairs: &[(u32, u32)]) -> Vec<RowSpan> {
    pairs
        .iter()
        .map(|&(start_row, end_row)| RowSpan { start_row, end_row })
        .collect()
}

#[test]
fn growing_first_lesson_across_recess() {
    let t = eight_slot_day();
    let mut ed = editor(&t);
    ed.change_duration(1, 3).expect("grow to 3");

    assert_eq!(ed.column().cells.len(), 6);
    assert_eq!(ed.sequence().len(), 6);
    let grown = ed.column().cell_at(1).expect("grown cell");
    assert_eq!(grown.row_spans, spans(&[(3, 5), (6, 7)]));

    let starts = ed.sequence().start_slots();
    assert_eq!(starts, vec![1, 3, 5, 6, 7, 8]);
    for s in [1, 3, 6] {
        assert!(starts.contains(&s));
    }
    check_tiling(ed.sequence(), &t).expect("still tiled");
}

#[test]
fn grow_to_whole_day_then_back_to_one() {
    let t = eight_slot_day();
    let mut ed = editor(&t);
    ed.change_duration(1, 6).expect("grow to 6");
    assert_eq!(ed.sequence().start_slots(), vec![1, 3, 6]);
    assert_eq!(
        ed.column().cell_at(1).map(|c| c.row_spans.clone()),
        Some(spans(&[(3, 5), (6, 8), (9, 11)]))
    );

    ed.change_duration(1, 1).expect("shrink to 1");
    assert_eq!(ed.column().cells.len(), 8);
    assert_eq!(ed.sequence().start_slots(), (1..=8).collect::<Vec<_>>());
    for cell in &ed.column().cells {
        assert_eq!(cell.row_spans.len(), 1);
        assert_eq!(cell.row_spans[0].height(), 1);
    }
}

#[test]
fn growing_into_a_longer_block_breaks_it_up_first() {
    let t = eight_slot_day();
    let mut ed = editor(&t);
    ed.change_duration(4, 3).expect("block at 4 covers 4,5,7");
    assert_eq!(ed.sequence().start_slots(), vec![1, 2, 3, 4, 6, 8]);

    ed.change_duration(1, 4).expect("grow slot 1 over it");
    assert_eq!(ed.sequence().start_slots(), vec![1, 3, 6, 7, 8]);
    assert_eq!(
        ed.sequence().get(7).map(|p| p.number_of_slots()),
        Some(1)
    );
    check_tiling(ed.sequence(), &t).expect("no slot claimed twice");
}

#[test]
fn break_cells_refuse_resizing() {
    let t = eight_slot_day();
    let mut seq = PeriodSequence::from_template(&t);
    let before = seq.clone();
    let err = change_duration(&mut seq, &t, 3, 2).expect_err("break");
    assert!(matches!(err, TimetableError::InvalidOperation { .. }));
    assert_eq!(seq, before);
}

#[test]
fn overlong_duration_is_refused() {
    let t = eight_slot_day();
    let mut ed = editor(&t);
    let before = ed.sequence().clone();
    let err = ed.change_duration(5, 4).expect_err("only 5, 7, 8 remain");
    assert_eq!(
        err,
        TimetableError::InvalidDuration {
            requested: 4,
            max: 3
        }
    );
    assert_eq!(ed.sequence(), &before);
    assert_eq!(ed.column().cells.len(), 8);
}

#[test]
fn grow_and_shrink_are_inverse_for_an_isolated_block() {
    let t = eight_slot_day();
    for (start, n) in [(2, 3), (4, 2), (5, 3), (1, 5)] {
        let mut ed = editor(&t);
        let cells_before = ed.column().cells.clone();
        let starts_before = ed.sequence().start_slots();
        ed.change_duration(start, n).expect("grow");
        ed.change_duration(start, 1).expect("shrink");
        assert_eq!(ed.column().cells, cells_before);
        assert_eq!(ed.sequence().start_slots(), starts_before);
    }
}

#[test]
fn span_count_follows_breaks_crossed() {
    let t = eight_slot_day();
    let cfg = GridConfig::default();
    assert_eq!(block_row_spans(4, 1, &t, &cfg).expect("none").len(), 1);
    assert_eq!(block_row_spans(4, 2, &t, &cfg).expect("none").len(), 1);
    assert_eq!(block_row_spans(5, 2, &t, &cfg).expect("one").len(), 2);
    assert_eq!(block_row_spans(2, 4, &t, &cfg).expect("two").len(), 3);
}

#[test]
fn shrinking_an_nit_block_returns_lessons() {
    let t = eight_slot_day();
    let mut seq = PeriodSequence::from_periods(
        vec![
            Period::NonInstructional {
                start_slot: 1,
                number_of_slots: 3,
            },
            Period::Break {
                duty_label: Some("Gate".into()),
                start_slot: 3,
            },
            Period::empty_lesson(5),
            Period::Break {
                duty_label: None,
                start_slot: 6,
            },
            Period::empty_lesson(7),
            Period::empty_lesson(8),
        ],
        &t,
    )
    .expect("valid day");
    change_duration(&mut seq, &t, 1, 1).expect("shrink nit");
    assert_eq!(seq.get(2), Some(&Period::empty_lesson(2)));
    assert_eq!(seq.get(4), Some(&Period::empty_lesson(4)));
    assert_eq!(seq.get(3).map(|p| p.label()), Some("Gate"));
    check_tiling(&seq, &t).expect("tiled");
}

#[test]
fn header_offsets_move_rows_and_columns() {
    let t = eight_slot_day();
    let cfg = GridConfig {
        header_rows: 0,
        header_columns: 0,
    };
    let mut ed = DayEditor::new(&t, cfg, Weekday::Thu, true, PeriodSequence::from_template(&t))
        .expect("editor");
    ed.change_duration(1, 2).expect("grow");
    let cell = ed.column().cell_at(1).expect("cell");
    assert_eq!(cell.row_spans, spans(&[(1, 3)]));
    assert_eq!(cell.column, 4);
    assert_eq!(
        cell.end_time.map(|t| t.format("%H:%M").to_string()),
        Some("10:00".to_string())
    );
}

#[test]
fn mixed_day_with_leading_and_adjacent_breaks() {
    let t = mixed_day();
    let cfg = GridConfig::default();
    assert_eq!(
        block_row_spans(2, 3, &t, &cfg).expect("spans"),
        spans(&[(4, 6), (8, 9)])
    );

    let fresh = PeriodSequence::from_template(&t);
    assert_eq!(
        fresh.get(3),
        Some(&Period::NonInstructional {
            start_slot: 3,
            number_of_slots: 1
        })
    );

    let mut ed = editor(&t);
    ed.change_duration(2, 2).expect("lesson takes the nit slot");
    assert_eq!(ed.sequence().start_slots(), vec![1, 2, 4, 5, 6]);
    assert_eq!(
        ed.column().cell_at(2).map(|c| c.row_spans.clone()),
        Some(spans(&[(4, 6)]))
    );
    ed.change_duration(2, 1).expect("give it back");
    assert_eq!(ed.column().cells.len(), 6);
    assert_eq!(ed.sequence().get(3), Some(&Period::empty_lesson(3)));
    check_tiling(ed.sequence(), &t).expect("tiled");

    let err = ed.change_duration(6, 2).expect_err("last slot");
    assert_eq!(
        err,
        TimetableError::InvalidDuration {
            requested: 2,
            max: 1
        }
    );
}
