use serde_json::json;

pub type Result<T> = std::result::Result<T, TimetableError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimetableError {
    /// The slot template handed over by the setup wizard is unusable.
    #[error("invalid slot template: {message}")]
    InvalidTemplate { message: String },

    /// Resizing a Break, or labelling a period that cannot carry the label.
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("duration {requested} outside 1..={max}")]
    InvalidDuration { requested: u32, max: u32 },

    #[error("no period starts at slot {slot}")]
    NotFound { slot: u32 },

    /// A post-condition failed. This is a logic error, never a user error.
    #[error("inconsistent state: {message}")]
    InconsistentState { message: String },
}

impl TimetableError {
    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            message: message.into(),
        }
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentState {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTemplate { .. } => "invalid_template",
            Self::InvalidOperation { .. } => "invalid_operation",
            Self::InvalidDuration { .. } => "invalid_duration",
            Self::NotFound { .. } => "not_found",
            Self::InconsistentState { .. } => "inconsistent_state",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidDuration { requested, max } => Some(json!({
                "requested": requested,
                "max": max,
            })),
            Self::NotFound { slot } => Some(json!({ "startSlot": slot })),
            _ => None,
        }
    }
}
