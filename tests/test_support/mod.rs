#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_timetabled");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn timetabled");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Returns the error code.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Lessons on 1, 2, 4, 5, 7, 8; breaks on 3 and 6.
pub fn sample_slots() -> serde_json::Value {
    json!([
        { "kind": "lesson", "position": 1, "startTime": "08:30", "endTime": "09:15" },
        { "kind": "lesson", "position": 2, "startTime": "09:15", "endTime": "10:00" },
        { "kind": "break", "position": 3, "startTime": "10:00", "endTime": "10:20", "name": "Recess" },
        { "kind": "lesson", "position": 4, "startTime": "10:20", "endTime": "11:05" },
        { "kind": "lesson", "position": 5, "startTime": "11:05", "endTime": "11:50" },
        { "kind": "break", "position": 6, "startTime": "11:50", "endTime": "12:30", "name": "Lunch" },
        { "kind": "lesson", "position": 7, "startTime": "12:30", "endTime": "13:15" },
        { "kind": "lesson", "position": 8, "startTime": "13:15", "endTime": "14:00" }
    ])
}

/// Break on 1, lesson on 2, NIT on 3, breaks on 4 and 5, lesson on 6.
pub fn mixed_slots() -> serde_json::Value {
    json!([
        { "kind": "break", "position": 1, "startTime": "08:00", "endTime": "08:15", "name": "Roll call" },
        { "kind": "lesson", "position": 2, "startTime": "08:15", "endTime": "09:00" },
        { "kind": "nit", "position": 3, "startTime": "09:00", "endTime": "09:45" },
        { "kind": "break", "position": 4, "startTime": "09:45", "endTime": "10:00" },
        { "kind": "break", "position": 5, "startTime": "10:00", "endTime": "10:20" },
        { "kind": "lesson", "position": 6, "startTime": "10:20", "endTime": "11:05" }
    ])
}

pub fn start_slots(periods: &serde_json::Value) -> Vec<u64> {
    periods
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|p| p.get("startSlot").and_then(|v| v.as_u64()))
        .collect()
}

pub fn row_spans(cell: &serde_json::Value) -> Vec<(u64, u64)> {
    cell.get("rowSpans")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|s| {
            (
                s.get("startRow").and_then(|v| v.as_u64()).unwrap_or(0),
                s.get("endRow").and_then(|v| v.as_u64()).unwrap_or(0),
            )
        })
        .collect()
}
