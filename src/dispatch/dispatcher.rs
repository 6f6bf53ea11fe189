//! Voice command dispatcher

use std::sync::Arc;

use tracing::{info, warn};

use crate::classifier::IntentClassifier;
use crate::store::RemoteStore;

use super::intent::{resolve, Resolution};
use super::DispatchOutcome;

/// Sends transcripts to the classifier and applies the resulting intent
pub struct Dispatcher {
    classifier: Arc<dyn IntentClassifier>,
    store: Arc<dyn RemoteStore>,
}

impl Dispatcher {
    pub fn new(classifier: Arc<dyn IntentClassifier>, store: Arc<dyn RemoteStore>) -> Self {
        Self { classifier, store }
    }

    /// Classify `transcript` and perform at most one store write
    pub async fn dispatch(&self, transcript: &str) -> DispatchOutcome {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return DispatchOutcome::EmptyTranscript;
        }

        let result = match self.classifier.classify(transcript).await {
            Ok(result) => result,
            Err(e) => {
                warn!(?e, "classifier call failed");
                return DispatchOutcome::ClassifierUnavailable(e.to_string());
            }
        };
        info!(intent = ?result.intent, "transcript classified");

        match resolve(&result) {
            Resolution::Refuse(outcome) => outcome,
            Resolution::Write {
                intent,
                attribute,
                value,
            } => match self.store.write(attribute.key(), &value).await {
                Ok(()) => {
                    info!(%intent, %attribute, %value, "voice command applied");
                    DispatchOutcome::Applied { attribute, value }
                }
                Err(e) => {
                    warn!(%attribute, ?e, "voice command write failed");
                    DispatchOutcome::WriteFailed {
                        attribute,
                        reason: e.to_string(),
                    }
                }
            },
        }
    }
}
