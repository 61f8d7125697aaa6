use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::error::{Result, TimetableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotKind {
    #[serde(rename = "lesson")]
    LessonCapable,
    #[serde(rename = "break")]
    Break,
    #[serde(rename = "nit")]
    NonInstructional,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LessonCapable => "lesson",
            Self::Break => "break",
            Self::NonInstructional => "nit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lesson" => Some(Self::LessonCapable),
            "break" => Some(Self::Break),
            "nit" => Some(Self::NonInstructional),
            _ => None,
        }
    }
}

/// One row of the school's timing setup, as handed over by the setup wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDefinition {
    pub kind: SlotKind,
    pub position: u32,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The fixed ruler for one day: slot `p` lives at index `p - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotTemplate {
    slots: Vec<SlotDefinition>,
}

impl SlotTemplate {
    pub fn new(mut slots: Vec<SlotDefinition>) -> Result<Self> {
        if slots.is_empty() {
            return Err(TimetableError::invalid_template("no slots defined"));
        }
        slots.sort_by_key(|s| s.position);

        for (idx, slot) in slots.iter().enumerate() {
            let expected = idx as u32 + 1;
            if slot.position != expected {
                return Err(TimetableError::invalid_template(format!(
                    "slot positions must be 1..={} without gaps (expected {}, found {})",
                    slots.len(),
                    expected,
                    slot.position
                )));
            }
            if slot.start_time >= slot.end_time {
                return Err(TimetableError::invalid_template(format!(
                    "slot {} ends before it starts",
                    slot.position
                )));
            }
        }
        for pair in slots.windows(2) {
            if pair[1].start_time < pair[0].end_time {
                return Err(TimetableError::invalid_template(format!(
                    "slot {} overlaps slot {}",
                    pair[1].position, pair[0].position
                )));
            }
        }

        Ok(Self { slots })
    }

    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn slot(&self, position: u32) -> Option<&SlotDefinition> {
        position
            .checked_sub(1)
            .and_then(|idx| self.slots.get(idx as usize))
    }

    pub fn kind(&self, position: u32) -> Option<SlotKind> {
        self.slot(position).map(|s| s.kind)
    }

    pub fn is_break(&self, position: u32) -> bool {
        self.kind(position) == Some(SlotKind::Break)
    }

    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().map(|s| s.position)
    }

    /// Non-break positions at or after `from`, in order.
    pub fn non_break_positions_from(&self, from: u32) -> impl Iterator<Item = u32> + '_ {
        self.slots
            .iter()
            .filter(move |s| s.position >= from && s.kind != SlotKind::Break)
            .map(|s| s.position)
    }

    pub fn non_break_count_from(&self, from: u32) -> u32 {
        self.non_break_positions_from(from).count() as u32
    }

    /// The `count` non-break positions a block starting at `start` occupies,
    /// or `None` when the day runs out first.
    pub fn expand(&self, start: u32, count: u32) -> Option<Vec<u32>> {
        let covered: Vec<u32> = self
            .non_break_positions_from(start)
            .take(count as usize)
            .collect();
        if covered.len() as u32 == count {
            Some(covered)
        } else {
            None
        }
    }

    pub fn time_range(&self, first: u32, last: u32) -> Option<(NaiveTime, NaiveTime)> {
        let start = self.slot(first)?.start_time;
        let end = self.slot(last)?.end_time;
        Some((start, end))
    }
}

/// `HH:MM` on the wire; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid time: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }
}
