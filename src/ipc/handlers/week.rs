use crate::db;
use crate::ipc::error::ok;
use crate::ipc::handlers::timetable::{db_conn, load_context, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{project_week, ScheduledLesson};
use serde_json::json;
use std::collections::HashMap;

fn week_grid(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let scheduled: Vec<ScheduledLesson> = match req.params.get("scheduled") {
        None => Vec::new(),
        Some(v) if v.is_null() => Vec::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| HandlerErr {
            code: "bad_params",
            message: format!("scheduled: {}", e),
            details: None,
        })?,
    };
    let (template, setup) = load_context(conn)?;
    let stored: HashMap<_, _> = db::week_sequences_load(conn, &template)
        .map_err(|e| HandlerErr::db("db_query_failed", e))?
        .into_iter()
        .collect();

    let columns = project_week(
        &template,
        &stored,
        &setup.working_days,
        &scheduled,
        &setup.grid,
    )?;
    Ok(json!({ "columns": columns }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "timetable.week.grid" => Some(match week_grid(state, req) {
            Ok(v) => ok(&req.id, v),
            Err(e) => e.response(&req.id),
        }),
        _ => None,
    }
}
