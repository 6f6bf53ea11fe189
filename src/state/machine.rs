//! Dashboard event loop
//!
//! Every input, whether a store delivery, a client request, a capture
//! signal, or the completion of a write, arrives on one channel and is
//! applied in order. Slow work (classifier calls, store writes) runs in
//! spawned tasks that report back through the same channel, so a pending
//! classification never blocks a toggle.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::dispatch::{toggle, DispatchOutcome, Dispatcher};
use crate::events::{DashboardEvent, NoticeLevel};
use crate::store::RemoteStore;

use super::attribute::DeviceAttribute;
use super::capture::{CaptureError, CaptureSignal};
use super::dashboard::{DashboardState, Update};

/// Inputs processed by the dashboard loop
#[derive(Debug)]
pub enum Input {
    /// Store subscription delivered a value
    Delivered {
        attribute: DeviceAttribute,
        value: Option<String>,
    },
    /// Store subscription could not be opened or was revoked
    SyncLost {
        attribute: DeviceAttribute,
        reason: String,
    },
    /// Capture lifecycle signal from the client
    Capture(CaptureSignal),
    /// User asked to flip an attribute
    Toggle(DeviceAttribute),
    /// User asked to send the live transcript
    SendTranscript,
    /// A toggle write finished
    ToggleSettled {
        attribute: DeviceAttribute,
        result: Result<String, String>,
    },
    /// A dispatch attempt finished for the transcript of capture `session`
    DispatchSettled {
        session: u64,
        outcome: DispatchOutcome,
    },
}

/// Owns the dashboard state and applies inputs to it
pub struct DashboardMachine {
    state: DashboardState,
    store: Arc<dyn RemoteStore>,
    dispatcher: Arc<Dispatcher>,
    /// Loop-back for spawned work
    input_tx: mpsc::Sender<Input>,
    event_tx: broadcast::Sender<DashboardEvent>,
    snapshot_tx: watch::Sender<DashboardState>,
}

impl DashboardMachine {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        dispatcher: Arc<Dispatcher>,
        input_tx: mpsc::Sender<Input>,
        event_tx: broadcast::Sender<DashboardEvent>,
        snapshot_tx: watch::Sender<DashboardState>,
    ) -> Self {
        Self {
            state: DashboardState::default(),
            store,
            dispatcher,
            input_tx,
            event_tx,
            snapshot_tx,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Process inputs until every sender is gone
    pub async fn run(&mut self, mut input_rx: mpsc::Receiver<Input>) {
        info!("dashboard loop started");

        while let Some(input) = input_rx.recv().await {
            self.handle(input);
        }

        info!("dashboard loop stopped");
    }

    /// Apply one input
    pub fn handle(&mut self, input: Input) {
        match input {
            Input::Delivered { attribute, value } => {
                if let Err(e) = self.update(Update::Delivered { attribute, value }) {
                    warn!(?e, "store delivery rejected");
                }
            }
            Input::SyncLost { attribute, reason } => {
                self.notify(
                    NoticeLevel::Error,
                    format!("Lost sync for {}: {}", attribute.label(), reason),
                );
            }
            Input::Capture(signal) => self.handle_capture(signal),
            Input::Toggle(attribute) => self.start_toggle(attribute),
            Input::SendTranscript => self.start_dispatch(),
            Input::ToggleSettled { attribute, result } => match result {
                // Projection changes once the store pushes the value back
                Ok(value) => debug!(%attribute, %value, "toggle written"),
                Err(reason) => self.notify(
                    NoticeLevel::Error,
                    format!("Failed to update {}: {}", attribute.label(), reason),
                ),
            },
            Input::DispatchSettled { session, outcome } => {
                info!(session, success = outcome.is_success(), reason = %outcome, "dispatch settled");
                if outcome.reached_classifier() {
                    if let Err(e) = self.update(Update::TranscriptConsumed { session }) {
                        warn!(?e, "failed to clear transcript");
                    }
                }
                self.emit(outcome.notice());
            }
        }
    }

    fn handle_capture(&mut self, signal: CaptureSignal) {
        let reason = match &signal {
            CaptureSignal::Error { reason } => Some(reason.clone()),
            _ => None,
        };

        match self.update(Update::Capture(signal)) {
            Ok(()) => {
                if let Some(reason) = reason {
                    self.notify(NoticeLevel::Error, format!("Capture error: {}", reason));
                }
            }
            Err(CaptureError::AlreadyListening) => {
                self.notify(NoticeLevel::Warning, "Already listening.");
            }
            Err(e) => {
                debug!(?e, capture = %self.state.capture, "capture signal ignored");
            }
        }
    }

    fn start_toggle(&self, attribute: DeviceAttribute) {
        let cached = self.state.values.get(attribute).to_string();
        let store = Arc::clone(&self.store);
        let input_tx = self.input_tx.clone();

        tokio::spawn(async move {
            let result = toggle(store.as_ref(), attribute, &cached)
                .await
                .map(str::to_string)
                .map_err(|e| {
                    warn!(%attribute, ?e, "toggle write failed");
                    e.to_string()
                });
            let _ = input_tx.send(Input::ToggleSettled { attribute, result }).await;
        });
    }

    fn start_dispatch(&self) {
        let Some(transcript) = self.state.pending_transcript() else {
            self.emit(DispatchOutcome::EmptyTranscript.notice());
            return;
        };

        let transcript = transcript.to_string();
        let session = self.state.session;
        let dispatcher = Arc::clone(&self.dispatcher);
        let input_tx = self.input_tx.clone();

        tokio::spawn(async move {
            let outcome = dispatcher.dispatch(&transcript).await;
            let _ = input_tx
                .send(Input::DispatchSettled { session, outcome })
                .await;
        });
    }

    /// Run an update through the state record and publish what changed
    fn update(&mut self, update: Update) -> Result<(), CaptureError> {
        let next = self.state.apply(&update)?;
        let events = next.changes_from(&self.state);

        if next.capture != self.state.capture {
            info!(from = %self.state.capture, to = %next.capture, "capture transition");
        }

        self.state = next;
        self.snapshot_tx.send_replace(self.state.clone());

        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.emit(DashboardEvent::notice(level, message));
    }

    fn emit(&self, event: DashboardEvent) {
        debug!(%event, "emitting event");
        let _ = self.event_tx.send(event);
    }
}
