//! Dashboard state record and its single update function
//!
//! Every change goes through [`DashboardState::apply`], which returns a new
//! record and leaves the old one untouched. The cached attribute values are
//! only ever replaced by store deliveries, never by local writes.

use serde::{Deserialize, Serialize};

use crate::events::DashboardEvent;

use super::attribute::{AttributeValues, DeviceAttribute};
use super::capture::{CaptureError, CaptureSignal, CaptureState, TranscriptChange};

/// Snapshot of everything a client displays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardState {
    /// Cached copy of the store values
    #[serde(flatten)]
    pub values: AttributeValues,
    /// Live transcript, empty when none
    pub transcript: String,
    /// Voice capture session phase
    pub capture: CaptureState,
    /// Number of capture sessions started so far; the live transcript
    /// belongs to this session
    #[serde(default)]
    pub session: u64,
}

/// Inputs to the update function
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Store subscription delivered a value; `None` when the key has no value
    Delivered {
        attribute: DeviceAttribute,
        value: Option<String>,
    },
    /// Voice capture lifecycle signal
    Capture(CaptureSignal),
    /// A dispatch of the transcript from `session` reached the classifier,
    /// so that transcript is spent
    TranscriptConsumed { session: u64 },
}

impl DashboardState {
    pub fn listening(&self) -> bool {
        self.capture.is_listening()
    }

    /// Trimmed transcript, `None` when there is nothing to send
    pub fn pending_transcript(&self) -> Option<&str> {
        let trimmed = self.transcript.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Produce the next state for an update
    pub fn apply(&self, update: &Update) -> Result<DashboardState, CaptureError> {
        let mut next = self.clone();

        match update {
            Update::Delivered { attribute, value } => {
                // Missing keys keep whatever we already had
                if let Some(value) = value {
                    next.values.set(*attribute, value.clone());
                }
            }
            Update::Capture(signal) => {
                let transition = self.capture.on_signal(signal)?;
                if matches!(signal, CaptureSignal::Started) {
                    next.session = self.session.wrapping_add(1);
                }
                next.capture = transition.next;
                match transition.transcript {
                    TranscriptChange::Keep => {}
                    TranscriptChange::Clear => next.transcript.clear(),
                    TranscriptChange::Replace(text) => next.transcript = text,
                }
            }
            Update::TranscriptConsumed { session } => {
                // Left alone once a newer session owns the transcript
                if *session == self.session {
                    next.transcript.clear();
                    if next.capture == CaptureState::Completed {
                        next.capture = CaptureState::Idle;
                    }
                }
            }
        }

        Ok(next)
    }

    /// Events describing what changed between `previous` and `self`
    pub fn changes_from(&self, previous: &DashboardState) -> Vec<DashboardEvent> {
        let mut events = Vec::new();

        for attribute in DeviceAttribute::ALL {
            let value = self.values.get(attribute);
            if value != previous.values.get(attribute) {
                events.push(DashboardEvent::AttributeChanged {
                    attribute,
                    value: value.to_string(),
                });
            }
        }

        if self.transcript != previous.transcript {
            events.push(DashboardEvent::TranscriptChanged {
                transcript: self.transcript.clone(),
            });
        }

        if self.listening() != previous.listening() {
            events.push(DashboardEvent::ListeningChanged {
                listening: self.listening(),
            });
        }

        events
    }
}
