//! Voice capture session state machine
//!
//! Speech recognition itself runs in the client. The client reports the
//! session lifecycle (start, result, error, end) and this machine decides
//! which transcript, if any, becomes live.

use serde::{Deserialize, Serialize};

/// Phase of the current capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// No session running
    #[default]
    Idle,
    /// Microphone session in progress
    Listening,
    /// Session produced a transcript
    Completed,
    /// Session ended with a capture error
    Failed,
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureState::Idle => write!(f, "Idle"),
            CaptureState::Listening => write!(f, "Listening"),
            CaptureState::Completed => write!(f, "Completed"),
            CaptureState::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle signal reported by the capture client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSignal {
    Started,
    /// Recognition result, best alternative first
    Result { alternatives: Vec<String> },
    Error { reason: String },
    Ended,
}

/// Signals the machine refuses to apply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("a capture session is already listening")]
    AlreadyListening,

    #[error("no capture session is listening")]
    NotListening,

    #[error("recognition result carried no alternatives")]
    EmptyResult,
}

/// What a transition does to the live transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptChange {
    Keep,
    Clear,
    Replace(String),
}

/// Outcome of applying one signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTransition {
    pub next: CaptureState,
    pub transcript: TranscriptChange,
}

impl CaptureTransition {
    fn to(next: CaptureState, transcript: TranscriptChange) -> Self {
        Self { next, transcript }
    }
}

impl CaptureState {
    /// Whether the microphone session is open
    pub fn is_listening(self) -> bool {
        self == CaptureState::Listening
    }

    /// Compute the transition for a lifecycle signal.
    ///
    /// Starting while already listening is rejected; the running session
    /// keeps its microphone and its eventual transcript.
    pub fn on_signal(self, signal: &CaptureSignal) -> Result<CaptureTransition, CaptureError> {
        match (self, signal) {
            (CaptureState::Listening, CaptureSignal::Started) => Err(CaptureError::AlreadyListening),
            (_, CaptureSignal::Started) => Ok(CaptureTransition::to(
                CaptureState::Listening,
                TranscriptChange::Clear,
            )),

            (CaptureState::Listening, CaptureSignal::Result { alternatives }) => {
                // Only the first-best alternative is ever used
                let best = alternatives.first().ok_or(CaptureError::EmptyResult)?;
                Ok(CaptureTransition::to(
                    CaptureState::Completed,
                    TranscriptChange::Replace(best.clone()),
                ))
            }
            (_, CaptureSignal::Result { .. }) => Err(CaptureError::NotListening),

            // Recognized transcript survives a late error
            (CaptureState::Completed, CaptureSignal::Error { .. }) => Ok(CaptureTransition::to(
                CaptureState::Completed,
                TranscriptChange::Keep,
            )),
            // Also covers errors raised before a session could start,
            // e.g. no speech capability on the client
            (_, CaptureSignal::Error { .. }) => Ok(CaptureTransition::to(
                CaptureState::Failed,
                TranscriptChange::Clear,
            )),

            (CaptureState::Listening, CaptureSignal::Ended) => Ok(CaptureTransition::to(
                CaptureState::Idle,
                TranscriptChange::Keep,
            )),
            (state, CaptureSignal::Ended) => Ok(CaptureTransition::to(state, TranscriptChange::Keep)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(texts: &[&str]) -> CaptureSignal {
        CaptureSignal::Result {
            alternatives: texts.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_start_from_idle_clears_transcript() {
        let t = CaptureState::Idle.on_signal(&CaptureSignal::Started).unwrap();
        assert_eq!(t.next, CaptureState::Listening);
        assert_eq!(t.transcript, TranscriptChange::Clear);
    }

    #[test]
    fn test_result_takes_first_alternative() {
        let t = CaptureState::Listening
            .on_signal(&result(&["turn the alarm on", "turn the alarm off"]))
            .unwrap();
        assert_eq!(t.next, CaptureState::Completed);
        assert_eq!(t.transcript, TranscriptChange::Replace("turn the alarm on".into()));
    }

    #[test]
    fn test_start_while_listening_is_rejected() {
        let err = CaptureState::Listening.on_signal(&CaptureSignal::Started).unwrap_err();
        assert_eq!(err, CaptureError::AlreadyListening);
    }

    #[test]
    fn test_restart_after_completion() {
        let t = CaptureState::Completed.on_signal(&CaptureSignal::Started).unwrap();
        assert_eq!(t.next, CaptureState::Listening);
        assert_eq!(t.transcript, TranscriptChange::Clear);
    }

    #[test]
    fn test_error_fails_session() {
        let signal = CaptureSignal::Error { reason: "no-speech".into() };
        let t = CaptureState::Listening.on_signal(&signal).unwrap();
        assert_eq!(t.next, CaptureState::Failed);
        assert_eq!(t.transcript, TranscriptChange::Clear);

        // Unsupported browser reports an error without ever starting
        let t = CaptureState::Idle.on_signal(&signal).unwrap();
        assert_eq!(t.next, CaptureState::Failed);
    }

    #[test]
    fn test_error_after_result_keeps_transcript() {
        let signal = CaptureSignal::Error { reason: "network".into() };
        let t = CaptureState::Completed.on_signal(&signal).unwrap();
        assert_eq!(t.next, CaptureState::Completed);
        assert_eq!(t.transcript, TranscriptChange::Keep);
    }

    #[test]
    fn test_end_without_result_returns_to_idle() {
        let t = CaptureState::Listening.on_signal(&CaptureSignal::Ended).unwrap();
        assert_eq!(t.next, CaptureState::Idle);
    }

    #[test]
    fn test_end_after_result_keeps_completed() {
        let t = CaptureState::Completed.on_signal(&CaptureSignal::Ended).unwrap();
        assert_eq!(t.next, CaptureState::Completed);
        assert_eq!(t.transcript, TranscriptChange::Keep);
    }

    #[test]
    fn test_result_outside_session_is_rejected() {
        assert_eq!(
            CaptureState::Idle.on_signal(&result(&["hello"])).unwrap_err(),
            CaptureError::NotListening
        );
        assert_eq!(
            CaptureState::Listening.on_signal(&result(&[])).unwrap_err(),
            CaptureError::EmptyResult
        );
    }
}
