//! Timetable grid layout and period resequencing for the lesson planner.
//!
//! [`timetable`] is the engine and performs no I/O. [`db`] and [`ipc`] host it
//! as a JSON-lines sidecar for the desktop UI.

pub mod db;
pub mod ipc;
pub mod timetable;
