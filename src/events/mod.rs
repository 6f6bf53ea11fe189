//! Events pushed to subscribed clients
//!
//! Every state change and every user-facing message leaves the daemon as
//! one of these.

use serde::{Deserialize, Serialize};

use crate::state::DeviceAttribute;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Events emitted by the dashboard as its state changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Store delivered a new value for an attribute
    AttributeChanged {
        attribute: DeviceAttribute,
        value: String,
    },

    /// Live transcript replaced or cleared
    TranscriptChanged { transcript: String },

    /// Microphone session opened or closed
    ListeningChanged { listening: bool },

    /// Message the client should show the user
    Notice { level: NoticeLevel, message: String },
}

impl DashboardEvent {
    pub fn notice(level: NoticeLevel, message: impl Into<String>) -> Self {
        DashboardEvent::Notice {
            level,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DashboardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DashboardEvent::AttributeChanged { attribute, value } => {
                write!(f, "ATTRIBUTE_CHANGED ({}={})", attribute, value)
            }
            DashboardEvent::TranscriptChanged { transcript } => {
                write!(f, "TRANSCRIPT_CHANGED ({} chars)", transcript.len())
            }
            DashboardEvent::ListeningChanged { listening } => {
                write!(f, "LISTENING_CHANGED ({})", listening)
            }
            DashboardEvent::Notice { level, message } => {
                write!(f, "NOTICE ({:?}: {})", level, message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DashboardEvent::AttributeChanged {
            attribute: DeviceAttribute::MovieNight,
            value: "on".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("attribute_changed"));
        assert!(json.contains("movie_night"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"notice","level":"warning","message":"No intent detected."}"#;
        let event: DashboardEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            DashboardEvent::notice(NoticeLevel::Warning, "No intent detected.")
        );
    }
}
