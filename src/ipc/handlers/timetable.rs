use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup::{load_timetable_setup, weekday_code, TimetableSetup};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{
    project, DayEditor, PeriodSequence, SlotDefinition, SlotTemplate, TimetableError, WEEK,
};
use chrono::Weekday;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

pub(crate) struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn db(code: &'static str, e: anyhow::Error) -> Self {
        Self {
            code,
            message: format!("{e:#}"),
            details: None,
        }
    }
}

impl From<TimetableError> for HandlerErr {
    fn from(e: TimetableError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: e.details(),
        }
    }
}

pub(crate) fn db_conn<'a>(state: &'a AppState) -> Result<&'a Connection, HandlerErr> {
    state.db.as_ref().ok_or_else(|| HandlerErr {
        code: "no_workspace",
        message: "select a workspace first".to_string(),
        details: None,
    })
}

pub(crate) fn load_context(conn: &Connection) -> Result<(SlotTemplate, TimetableSetup), HandlerErr> {
    let template = db::slot_template_load(conn)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .ok_or_else(|| HandlerErr {
            code: "no_slot_template",
            message: "set up the day's slots first".to_string(),
            details: None,
        })?;
    let setup = load_timetable_setup(conn).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    Ok((template, setup))
}

/// The stored day, or a fresh one-period-per-slot day if none was saved yet.
pub(crate) fn load_day(
    conn: &Connection,
    template: &SlotTemplate,
    day: Weekday,
) -> Result<PeriodSequence, HandlerErr> {
    Ok(db::day_sequence_load(conn, day, template)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .unwrap_or_else(|| PeriodSequence::from_template(template)))
}

fn save_day(conn: &Connection, day: Weekday, seq: &PeriodSequence) -> Result<(), HandlerErr> {
    db::day_sequence_save(conn, day, seq).map_err(|e| HandlerErr::db("db_update_failed", e))
}

fn parse_day(req: &Request) -> Result<Weekday, HandlerErr> {
    let raw = req
        .params
        .get("day")
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params("missing day"))?;
    raw.trim().parse::<Weekday>().map_err(|_| HandlerErr {
        code: "bad_params",
        message: "day must be one of mon..sun".to_string(),
        details: Some(json!({ "day": raw })),
    })
}

fn parse_u32(req: &Request, key: &str) -> Result<u32, HandlerErr> {
    let v = req
        .params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("{} must be a non-negative integer", key),
            details: Some(json!({ key: v })),
        })
}

fn day_payload(editor: &DayEditor<'_>) -> serde_json::Value {
    json!({
        "periods": editor.sequence().to_vec(),
        "grid": editor.column(),
    })
}

fn open_editor<'a>(
    conn: &Connection,
    template: &'a SlotTemplate,
    setup: &TimetableSetup,
    day: Weekday,
) -> Result<DayEditor<'a>, HandlerErr> {
    let seq = load_day(conn, template, day)?;
    Ok(DayEditor::new(
        template,
        setup.grid,
        day,
        setup.is_working_day(day),
        seq,
    )?)
}

fn slots_set(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let raw = req
        .params
        .get("slots")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing slots"))?;
    let defs: Vec<SlotDefinition> = serde_json::from_value(raw).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("slots: {}", e),
        details: None,
    })?;
    let template = SlotTemplate::new(defs)?;
    let setup = load_timetable_setup(conn).map_err(|e| HandlerErr::db("db_query_failed", e))?;

    db::slot_template_save(conn, &template, &setup.working_days)
        .map_err(|e| HandlerErr::db("db_update_failed", e))?;
    info!(slots = template.len(), days = setup.working_days.len(), "slot template replaced");

    Ok(json!({
        "slotCount": template.len(),
        "days": setup.working_days.iter().map(|d| weekday_code(*d)).collect::<Vec<_>>(),
    }))
}

fn slots_get(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let template =
        db::slot_template_load(conn).map_err(|e| HandlerErr::db("db_query_failed", e))?;
    let slots = template
        .map(|t| t.slots().to_vec())
        .unwrap_or_default();
    Ok(json!({ "slots": slots }))
}

fn days_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let (template, setup) = load_context(conn)?;
    let mut days = Vec::with_capacity(WEEK.len());
    for day in WEEK {
        let working = setup.is_working_day(day);
        let periods = if working {
            load_day(conn, &template, day)?.to_vec()
        } else {
            Vec::new()
        };
        days.push(json!({
            "day": weekday_code(day),
            "isWorkingDay": working,
            "periods": periods,
        }));
    }
    Ok(json!({ "days": days }))
}

fn days_grid(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let day = parse_day(req)?;
    let (template, setup) = load_context(conn)?;
    let seq = load_day(conn, &template, day)?;
    let grid = project(&seq, &template, day, setup.is_working_day(day), &setup.grid)?;
    Ok(json!({ "grid": grid }))
}

fn days_change_duration(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let day = parse_day(req)?;
    let start_slot = parse_u32(req, "startSlot")?;
    let duration = parse_u32(req, "duration")?;
    let (template, setup) = load_context(conn)?;

    let mut editor = open_editor(conn, &template, &setup, day)?;
    editor.change_duration(start_slot, duration)?;
    save_day(conn, day, editor.sequence())?;
    info!(%day, start_slot, duration, "duration changed");
    Ok(day_payload(&editor))
}

fn days_duration_options(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let day = parse_day(req)?;
    let start_slot = parse_u32(req, "startSlot")?;
    let (template, setup) = load_context(conn)?;

    let editor = open_editor(conn, &template, &setup, day)?;
    let options = editor.duration_options(start_slot)?;
    Ok(json!({
        "max": options.last().copied().unwrap_or(0),
        "options": options,
    }))
}

fn days_update_period(
    state: &mut AppState,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let day = parse_day(req)?;
    let start_slot = parse_u32(req, "startSlot")?;
    let subject = req.params.get("subject");
    let duty_label = req.params.get("dutyLabel");
    if subject.is_none() && duty_label.is_none() {
        return Err(HandlerErr::bad_params("nothing to update"));
    }
    let (template, setup) = load_context(conn)?;

    let mut editor = open_editor(conn, &template, &setup, day)?;
    if let Some(v) = subject {
        let s = v
            .as_str()
            .ok_or_else(|| HandlerErr::bad_params("subject must be string"))?;
        editor.set_subject(start_slot, s)?;
    }
    if let Some(v) = duty_label {
        if !v.is_null() && !v.is_string() {
            return Err(HandlerErr::bad_params("dutyLabel must be string or null"));
        }
        editor.set_duty_label(start_slot, v.as_str())?;
    }
    save_day(conn, day, editor.sequence())?;
    Ok(day_payload(&editor))
}

fn days_reset(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let day = parse_day(req)?;
    let (template, setup) = load_context(conn)?;

    let mut editor = open_editor(conn, &template, &setup, day)?;
    editor.reset()?;
    save_day(conn, day, editor.sequence())?;
    Ok(day_payload(&editor))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "timetable.slots.set" => slots_set(state, req),
        "timetable.slots.get" => slots_get(state, req),
        "timetable.days.list" => days_list(state, req),
        "timetable.days.grid" => days_grid(state, req),
        "timetable.days.changeDuration" => days_change_duration(state, req),
        "timetable.days.durationOptions" => days_duration_options(state, req),
        "timetable.days.updatePeriod" => days_update_period(state, req),
        "timetable.days.reset" => days_reset(state, req),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
