use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::timetable::{GridConfig, WEEK};
use chrono::Weekday;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Timetable,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "timetable" => Some(Self::Timetable),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Timetable => "setup.timetable",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Timetable => json!({
            "headerRows": 2,
            "headerColumns": 1,
            "workingDays": ["mon", "tue", "wed", "thu", "fri"]
        }),
    }
}

/// What the grid handlers need out of `setup.timetable`.
#[derive(Debug, Clone)]
pub(crate) struct TimetableSetup {
    pub grid: GridConfig,
    pub working_days: Vec<Weekday>,
}

impl TimetableSetup {
    pub fn is_working_day(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }
}

pub(crate) fn load_timetable_setup(conn: &rusqlite::Connection) -> anyhow::Result<TimetableSetup> {
    let section = load_section(conn, SetupSection::Timetable)?;
    let header_rows = section
        .get("headerRows")
        .and_then(|v| v.as_u64())
        .unwrap_or(2) as u32;
    let header_columns = section
        .get("headerColumns")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;
    let working_days = section
        .get("workingDays")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|d| d.as_str())
                .filter_map(|d| d.parse::<Weekday>().ok())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Ok(TimetableSetup {
        grid: GridConfig {
            header_rows,
            header_columns,
        },
        working_days,
    })
}

pub(crate) fn weekday_code(day: Weekday) -> String {
    day.to_string().to_ascii_lowercase()
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_working_days(v: &Value, key: &str) -> Result<Value, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be array of weekday codes", key))?;
    let mut picked = [false; 7];
    for item in arr {
        let day = item
            .as_str()
            .and_then(|s| s.trim().parse::<Weekday>().ok())
            .ok_or_else(|| format!("{} must contain only mon..sun", key))?;
        picked[day.num_days_from_monday() as usize] = true;
    }
    let days: Vec<Value> = WEEK
        .iter()
        .filter(|d| picked[d.num_days_from_monday() as usize])
        .map(|d| Value::String(weekday_code(*d)))
        .collect();
    if days.is_empty() {
        return Err(format!("{} must contain at least one day", key));
    }
    Ok(Value::Array(days))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Timetable => match k.as_str() {
                "headerRows" | "headerColumns" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 10)?));
                }
                "workingDays" => {
                    obj.insert(k.clone(), parse_working_days(v, k)?);
                }
                _ => return Err(format!("unknown timetable field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Saved values that no longer validate fall back to defaults.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let timetable = match load_section(conn, SetupSection::Timetable) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "timetable": timetable }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
