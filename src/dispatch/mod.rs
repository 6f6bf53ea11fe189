//! Turning user actions into store writes
//!
//! Two paths reach the store: a toggle flips the cached value of one
//! attribute, and a voice dispatch classifies the transcript and writes the
//! value the classifier extracted.

mod dispatcher;
mod intent;
mod toggle;

use crate::events::{DashboardEvent, NoticeLevel};
use crate::state::DeviceAttribute;

pub use dispatcher::Dispatcher;
pub use intent::Intent;
pub use toggle::toggle;

/// Result of one dispatch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Transcript was blank; the classifier was not called
    EmptyTranscript,
    /// Classifier found no confident intent
    NoIntent,
    /// Classifier matched an intent the dashboard does not handle
    UnknownCommand(String),
    /// Recognized intent without a usable `state` parameter
    MissingState(Intent),
    /// Classifier could not be reached or failed
    ClassifierUnavailable(String),
    /// Store rejected the write
    WriteFailed {
        attribute: DeviceAttribute,
        reason: String,
    },
    /// Value written to the store
    Applied {
        attribute: DeviceAttribute,
        value: String,
    },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Applied { .. })
    }

    /// Whether the attempt got as far as the classifier.
    ///
    /// Every such attempt spends the transcript.
    pub fn reached_classifier(&self) -> bool {
        !matches!(self, DispatchOutcome::EmptyTranscript)
    }

    /// Message shown to the user
    pub fn notice(&self) -> DashboardEvent {
        let level = match self {
            DispatchOutcome::Applied { .. } => NoticeLevel::Success,
            DispatchOutcome::EmptyTranscript
            | DispatchOutcome::NoIntent
            | DispatchOutcome::UnknownCommand(_)
            | DispatchOutcome::MissingState(_) => NoticeLevel::Warning,
            DispatchOutcome::ClassifierUnavailable(_) | DispatchOutcome::WriteFailed { .. } => {
                NoticeLevel::Error
            }
        };
        DashboardEvent::notice(level, self.to_string())
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOutcome::EmptyTranscript => {
                write!(f, "Say something before sending the command.")
            }
            DispatchOutcome::NoIntent => write!(f, "No intent detected."),
            DispatchOutcome::UnknownCommand(name) => write!(f, "Unknown command: {}", name),
            DispatchOutcome::MissingState(intent) => write!(f, "Missing state for {}.", intent),
            DispatchOutcome::ClassifierUnavailable(reason) => {
                write!(f, "Classifier unavailable: {}", reason)
            }
            DispatchOutcome::WriteFailed { attribute, reason } => {
                write!(f, "Failed to update {}: {}", attribute.label(), reason)
            }
            DispatchOutcome::Applied { attribute, .. } => match attribute {
                DeviceAttribute::Alarm => write!(f, "Alarm updated via voice!"),
                DeviceAttribute::Override => write!(f, "Override updated via voice!"),
                DeviceAttribute::MovieNight => write!(f, "Movie Night mode set via voice!"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_command_message() {
        let outcome = DispatchOutcome::UnknownCommand("lights_toggle".into());
        assert_eq!(outcome.to_string(), "Unknown command: lights_toggle");
        assert_eq!(
            outcome.notice(),
            DashboardEvent::notice(NoticeLevel::Warning, "Unknown command: lights_toggle")
        );
    }

    #[test]
    fn test_only_empty_transcript_keeps_transcript() {
        assert!(!DispatchOutcome::EmptyTranscript.reached_classifier());
        assert!(DispatchOutcome::NoIntent.reached_classifier());
        assert!(DispatchOutcome::ClassifierUnavailable("timeout".into()).reached_classifier());
    }

    #[test]
    fn test_success_notice() {
        let outcome = DispatchOutcome::Applied {
            attribute: DeviceAttribute::MovieNight,
            value: "on".into(),
        };
        assert!(outcome.is_success());
        assert_eq!(
            outcome.notice(),
            DashboardEvent::notice(NoticeLevel::Success, "Movie Night mode set via voice!")
        );
    }
}
