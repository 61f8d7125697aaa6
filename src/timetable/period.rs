use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{Result, TimetableError};
use super::slot::{SlotKind, SlotTemplate};
use super::validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Period {
    #[serde(rename = "lesson", rename_all = "camelCase")]
    Lesson {
        #[serde(default)]
        subject_name: String,
        start_slot: u32,
        number_of_slots: u32,
    },
    #[serde(rename = "break", rename_all = "camelCase")]
    Break {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duty_label: Option<String>,
        start_slot: u32,
    },
    #[serde(rename = "nit", rename_all = "camelCase")]
    NonInstructional { start_slot: u32, number_of_slots: u32 },
}

impl Period {
    pub fn empty_lesson(start_slot: u32) -> Self {
        Self::Lesson {
            subject_name: String::new(),
            start_slot,
            number_of_slots: 1,
        }
    }

    /// The one-slot period a freshly created day puts on a slot of `kind`.
    pub fn for_slot(kind: SlotKind, position: u32) -> Self {
        match kind {
            SlotKind::LessonCapable => Self::empty_lesson(position),
            SlotKind::Break => Self::Break {
                duty_label: None,
                start_slot: position,
            },
            SlotKind::NonInstructional => Self::NonInstructional {
                start_slot: position,
                number_of_slots: 1,
            },
        }
    }

    pub fn start_slot(&self) -> u32 {
        match self {
            Self::Lesson { start_slot, .. }
            | Self::Break { start_slot, .. }
            | Self::NonInstructional { start_slot, .. } => *start_slot,
        }
    }

    pub fn number_of_slots(&self) -> u32 {
        match self {
            Self::Lesson {
                number_of_slots, ..
            }
            | Self::NonInstructional {
                number_of_slots, ..
            } => *number_of_slots,
            Self::Break { .. } => 1,
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::Break { .. })
    }

    pub fn is_resizable(&self) -> bool {
        !self.is_break()
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::Lesson { .. } => "lesson",
            Self::Break { .. } => "break",
            Self::NonInstructional { .. } => "nit",
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Lesson { subject_name, .. } => subject_name,
            Self::Break { duty_label, .. } => duty_label.as_deref().unwrap_or("Break"),
            Self::NonInstructional { .. } => "NIT",
        }
    }

    pub(crate) fn set_number_of_slots(&mut self, n: u32) -> Result<()> {
        match self {
            Self::Lesson {
                number_of_slots, ..
            }
            | Self::NonInstructional {
                number_of_slots, ..
            } => {
                *number_of_slots = n;
                Ok(())
            }
            Self::Break { start_slot, .. } => Err(TimetableError::invalid_operation(format!(
                "break at slot {} cannot be resized",
                start_slot
            ))),
        }
    }

    /// Slots this period occupies, breaks skipped for multi-slot blocks.
    pub fn covered_slots(&self, template: &SlotTemplate) -> Option<Vec<u32>> {
        match self {
            Self::Break { start_slot, .. } => Some(vec![*start_slot]),
            _ => template.expand(self.start_slot(), self.number_of_slots()),
        }
    }
}

/// A day's periods, keyed by start slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PeriodSequence {
    periods: BTreeMap<u32, Period>,
}

impl PeriodSequence {
    pub fn from_template(template: &SlotTemplate) -> Self {
        let periods = template
            .slots()
            .iter()
            .map(|s| (s.position, Period::for_slot(s.kind, s.position)))
            .collect();
        Self { periods }
    }

    /// Rebuilds a persisted sequence, rejecting anything that does not tile
    /// `template`.
    pub fn from_periods(periods: Vec<Period>, template: &SlotTemplate) -> Result<Self> {
        let mut out = Self::default();
        for p in periods {
            let start = p.start_slot();
            if out.periods.insert(start, p).is_some() {
                return Err(TimetableError::inconsistent(format!(
                    "two periods start at slot {}",
                    start
                )));
            }
        }
        validate::check_tiling(&out, template)?;
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    pub fn to_vec(&self) -> Vec<Period> {
        self.periods.values().cloned().collect()
    }

    pub fn start_slots(&self) -> Vec<u32> {
        self.periods.keys().copied().collect()
    }

    pub fn get(&self, start_slot: u32) -> Option<&Period> {
        self.periods.get(&start_slot)
    }

    pub(crate) fn get_mut(&mut self, start_slot: u32) -> Option<&mut Period> {
        self.periods.get_mut(&start_slot)
    }

    /// Periods starting strictly after `start_slot`, in order.
    pub fn after(&self, start_slot: u32) -> impl Iterator<Item = &Period> {
        self.periods
            .range(start_slot.saturating_add(1)..)
            .map(|(_, p)| p)
    }

    /// The period whose footprint contains `slot`.
    pub fn covering(&self, slot: u32, template: &SlotTemplate) -> Option<&Period> {
        self.periods
            .range(..=slot)
            .rev()
            .map(|(_, p)| p)
            .find(|p| {
                p.covered_slots(template)
                    .map(|covered| covered.contains(&slot))
                    .unwrap_or(false)
            })
    }

    pub(crate) fn insert(&mut self, period: Period) -> Option<Period> {
        self.periods.insert(period.start_slot(), period)
    }

    pub(crate) fn remove(&mut self, start_slot: u32) -> Option<Period> {
        self.periods.remove(&start_slot)
    }

    pub fn set_subject(&mut self, start_slot: u32, subject: &str) -> Result<()> {
        match self.periods.get_mut(&start_slot) {
            Some(Period::Lesson { subject_name, .. }) => {
                *subject_name = subject.trim().to_string();
                Ok(())
            }
            Some(other) => Err(TimetableError::invalid_operation(format!(
                "{} at slot {} has no subject",
                other.kind_str(),
                start_slot
            ))),
            None => Err(TimetableError::NotFound { slot: start_slot }),
        }
    }

    pub fn set_duty_label(&mut self, start_slot: u32, label: Option<&str>) -> Result<()> {
        match self.periods.get_mut(&start_slot) {
            Some(Period::Break { duty_label, .. }) => {
                *duty_label = label
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                Ok(())
            }
            Some(other) => Err(TimetableError::invalid_operation(format!(
                "{} at slot {} has no duty label",
                other.kind_str(),
                start_slot
            ))),
            None => Err(TimetableError::NotFound { slot: start_slot }),
        }
    }
}
