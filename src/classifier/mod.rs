//! Intent classifier clients
//!
//! A classifier turns a transcript into an optional intent name plus the
//! named parameters it extracted from the text.

mod dialogflow;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use dialogflow::DialogflowClassifier;

/// Best guess for one transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// `None` when the classifier found no confident match
    pub intent: Option<String>,
    pub parameters: HashMap<String, String>,
}

impl ClassificationResult {
    #[cfg(test)]
    pub fn new(intent: Option<&str>) -> Self {
        Self {
            intent: intent.map(str::to_string),
            parameters: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.insert(name.to_string(), value.to_string());
        self
    }

    /// Non-empty parameter value
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Errors reaching or using the classifier
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Response(String),

    #[error("classifier not configured")]
    NotConfigured,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, transcript: &str) -> Result<ClassificationResult, ClassifierError>;
}

/// Stand-in used when no classifier credentials are configured
pub struct Unconfigured;

#[async_trait]
impl IntentClassifier for Unconfigured {
    async fn classify(&self, _transcript: &str) -> Result<ClassificationResult, ClassifierError> {
        Err(ClassifierError::NotConfigured)
    }
}

/// Classifier fakes shared by unit tests
#[cfg(test)]
pub mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Replays one canned answer and records every transcript it saw
    #[derive(Clone)]
    pub struct ScriptedClassifier {
        answer: Arc<dyn Fn() -> Result<ClassificationResult, ClassifierError> + Send + Sync>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedClassifier {
        pub fn answering(result: ClassificationResult) -> Self {
            Self {
                answer: Arc::new(move || Ok(result.clone())),
                seen: Arc::default(),
            }
        }

        pub fn failing(status: u16) -> Self {
            Self {
                answer: Arc::new(move || {
                    Err(ClassifierError::Service {
                        status,
                        message: "backend unavailable".into(),
                    })
                }),
                seen: Arc::default(),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IntentClassifier for ScriptedClassifier {
        async fn classify(&self, transcript: &str) -> Result<ClassificationResult, ClassifierError> {
            self.seen.lock().unwrap().push(transcript.to_string());
            (self.answer)()
        }
    }
}
