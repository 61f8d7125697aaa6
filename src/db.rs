use anyhow::{anyhow, Context};
use chrono::Weekday;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::timetable::slot::hhmm;
use crate::timetable::{Period, PeriodSequence, SlotDefinition, SlotKind, SlotTemplate, WEEK};

pub const DB_FILE: &str = "timetable.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS slot_template(
            position INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            name TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS day_templates(
            id TEXT PRIMARY KEY,
            weekday INTEGER NOT NULL UNIQUE,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS day_periods(
            id TEXT PRIMARY KEY,
            day_template_id TEXT NOT NULL,
            start_slot INTEGER NOT NULL,
            kind TEXT NOT NULL,
            number_of_slots INTEGER NOT NULL,
            subject TEXT,
            duty_label TEXT,
            FOREIGN KEY(day_template_id) REFERENCES day_templates(id),
            UNIQUE(day_template_id, start_slot)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_day_periods_template ON day_periods(day_template_id)",
        [],
    )?;

    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("settings {} is not JSON", key))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

pub fn slot_template_load(conn: &Connection) -> anyhow::Result<Option<SlotTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT position, kind, start_time, end_time, name FROM slot_template ORDER BY position",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut defs = Vec::with_capacity(rows.len());
    for (position, kind, start, end, name) in rows {
        let kind = SlotKind::parse(&kind)
            .ok_or_else(|| anyhow!("slot {} has unknown kind {}", position, kind))?;
        let start_time =
            hhmm::parse(&start).ok_or_else(|| anyhow!("slot {} has bad start {}", position, start))?;
        let end_time =
            hhmm::parse(&end).ok_or_else(|| anyhow!("slot {} has bad end {}", position, end))?;
        let position = u32::try_from(position)
            .with_context(|| format!("slot position {} out of range", position))?;
        defs.push(SlotDefinition {
            kind,
            position,
            start_time,
            end_time,
            name,
        });
    }
    Ok(Some(SlotTemplate::new(defs)?))
}

/// Replaces the stored template and drops every day built on the old one.
/// Each of `fresh_days` is recreated with one period per slot in the same
/// transaction.
pub fn slot_template_save(
    conn: &Connection,
    template: &SlotTemplate,
    fresh_days: &[Weekday],
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM day_periods", [])?;
    tx.execute("DELETE FROM day_templates", [])?;
    tx.execute("DELETE FROM slot_template", [])?;
    for s in template.slots() {
        tx.execute(
            "INSERT INTO slot_template(position, kind, start_time, end_time, name)
             VALUES(?, ?, ?, ?, ?)",
            (
                s.position as i64,
                s.kind.as_str(),
                s.start_time.format("%H:%M").to_string(),
                s.end_time.format("%H:%M").to_string(),
                s.name.as_deref(),
            ),
        )?;
    }
    let fresh = PeriodSequence::from_template(template);
    for &day in fresh_days {
        write_day(&tx, day, &fresh)?;
    }
    tx.commit()?;
    Ok(())
}

fn weekday_code(day: Weekday) -> i64 {
    day.num_days_from_monday() as i64
}

fn day_template_id(conn: &Connection, day: Weekday) -> anyhow::Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT id FROM day_templates WHERE weekday = ?",
            [weekday_code(day)],
            |r| r.get(0),
        )
        .optional()?)
}

pub fn day_sequence_load(
    conn: &Connection,
    day: Weekday,
    template: &SlotTemplate,
) -> anyhow::Result<Option<PeriodSequence>> {
    let Some(id) = day_template_id(conn, day)? else {
        return Ok(None);
    };
    let mut stmt = conn.prepare(
        "SELECT start_slot, kind, number_of_slots, subject, duty_label
         FROM day_periods WHERE day_template_id = ? ORDER BY start_slot",
    )?;
    let rows = stmt
        .query_map([&id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut periods = Vec::with_capacity(rows.len());
    for (start, kind, n, subject, duty_label) in rows {
        let start_slot = u32::try_from(start)
            .with_context(|| format!("period start {} out of range", start))?;
        let number_of_slots = u32::try_from(n)
            .with_context(|| format!("period at slot {} has bad length {}", start, n))?;
        let period = match kind.as_str() {
            "lesson" => Period::Lesson {
                subject_name: subject.unwrap_or_default(),
                start_slot,
                number_of_slots,
            },
            "break" => Period::Break {
                duty_label,
                start_slot,
            },
            "nit" => Period::NonInstructional {
                start_slot,
                number_of_slots,
            },
            other => return Err(anyhow!("period at slot {} has unknown kind {}", start, other)),
        };
        periods.push(period);
    }
    let seq = PeriodSequence::from_periods(periods, template)
        .with_context(|| format!("stored {} periods do not fit the slot template", day))?;
    Ok(Some(seq))
}

pub fn day_sequence_save(
    conn: &Connection,
    day: Weekday,
    sequence: &PeriodSequence,
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    write_day(&tx, day, sequence)?;
    tx.commit()?;
    Ok(())
}

fn write_day(tx: &Connection, day: Weekday, sequence: &PeriodSequence) -> anyhow::Result<()> {
    let id = match day_template_id(tx, day)? {
        Some(id) => id,
        None => {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO day_templates(id, weekday) VALUES(?, ?)",
                (&id, weekday_code(day)),
            )?;
            id
        }
    };
    tx.execute(
        "UPDATE day_templates SET updated_at = ? WHERE id = ?",
        (now_ts(), &id),
    )?;
    tx.execute("DELETE FROM day_periods WHERE day_template_id = ?", [&id])?;
    for p in sequence.iter() {
        let (subject, duty_label) = match p {
            Period::Lesson { subject_name, .. } => (Some(subject_name.as_str()), None),
            Period::Break { duty_label, .. } => (None, duty_label.as_deref()),
            Period::NonInstructional { .. } => (None, None),
        };
        tx.execute(
            "INSERT INTO day_periods(id, day_template_id, start_slot, kind, number_of_slots, subject, duty_label)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &id,
                p.start_slot() as i64,
                p.kind_str(),
                p.number_of_slots() as i64,
                subject,
                duty_label,
            ),
        )?;
    }
    Ok(())
}

/// Loads every stored day; days never saved are left out.
pub fn week_sequences_load(
    conn: &Connection,
    template: &SlotTemplate,
) -> anyhow::Result<Vec<(Weekday, PeriodSequence)>> {
    let mut out = Vec::new();
    for day in WEEK {
        if let Some(seq) = day_sequence_load(conn, day, template)? {
            out.push((day, seq));
        }
    }
    Ok(out)
}

fn now_ts() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
