//! Unified error handling for the quest-direction library.
//!
//! Every failure in the core is scoped to a single quest screen. None of them
//! is fatal: the host shows a loading state or degrades the feature instead.

use std::fmt;

/// Unified error type for quest-direction operations.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestError {
    /// No quest matches the requested identifier
    NotFound { quest_id: String },
    /// Transport failure or non-success status from the content backend
    Network {
        message: String,
        status_code: Option<u16>,
    },
    /// The content backend returned a body we could not decode
    Parse { message: String },
    /// Foreground location access was refused
    PermissionDenied,
    /// The quest record breaks a structural invariant (e.g. no waypoints)
    InvalidQuest { quest_id: String, message: String },
    /// A user action is not available in the current state
    InvalidTransition { from: String, action: String },
    /// A tap or list selection referenced a waypoint the quest doesn't have
    UnknownWaypoint { waypoint_id: String },
    /// Configuration error
    Config { message: String },
    /// Generic internal error
    Internal { message: String },
}

impl fmt::Display for QuestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestError::NotFound { quest_id } => {
                write!(f, "Quest '{}' not found", quest_id)
            }
            QuestError::Network {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "Network error ({}): {}", code, message)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            QuestError::Parse { message } => {
                write!(f, "Parse error: {}", message)
            }
            QuestError::PermissionDenied => {
                write!(f, "Foreground location permission denied")
            }
            QuestError::InvalidQuest { quest_id, message } => {
                write!(f, "Quest '{}' is invalid: {}", quest_id, message)
            }
            QuestError::InvalidTransition { from, action } => {
                write!(f, "Action '{}' is not allowed in state '{}'", action, from)
            }
            QuestError::UnknownWaypoint { waypoint_id } => {
                write!(f, "Waypoint '{}' is not part of this quest", waypoint_id)
            }
            QuestError::Config { message } => {
                write!(f, "Configuration error: {}", message)
            }
            QuestError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for QuestError {}

impl From<serde_json::Error> for QuestError {
    fn from(e: serde_json::Error) -> Self {
        QuestError::Parse {
            message: e.to_string(),
        }
    }
}

/// Result type alias for quest-direction operations.
pub type Result<T> = std::result::Result<T, QuestError>;

/// Extension trait for converting Option to QuestError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a not-found error for the given quest.
    fn ok_or_not_found(self, quest_id: &str) -> Result<T>;

    /// Convert Option to Result with an unknown-waypoint error.
    fn ok_or_unknown_waypoint(self, waypoint_id: &str) -> Result<T>;

    /// Convert Option to Result with generic internal error.
    fn ok_or_internal(self, message: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, quest_id: &str) -> Result<T> {
        self.ok_or_else(|| QuestError::NotFound {
            quest_id: quest_id.to_string(),
        })
    }

    fn ok_or_unknown_waypoint(self, waypoint_id: &str) -> Result<T> {
        self.ok_or_else(|| QuestError::UnknownWaypoint {
            waypoint_id: waypoint_id.to_string(),
        })
    }

    fn ok_or_internal(self, message: &str) -> Result<T> {
        self.ok_or_else(|| QuestError::Internal {
            message: message.to_string(),
        })
    }
}
