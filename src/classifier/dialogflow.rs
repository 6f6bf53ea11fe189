//! Dialogflow ES `detectIntent` adapter

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{ClassificationResult, ClassifierError, IntentClassifier};

const API_BASE: &str = "https://dialogflow.googleapis.com/v2";

/// Classifier backed by a Dialogflow agent
pub struct DialogflowClassifier {
    project_id: String,
    session_id: String,
    access_token: String,
    language_code: String,
    client: reqwest::Client,
}

impl DialogflowClassifier {
    pub fn new(project_id: &str, access_token: &str, language_code: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
            access_token: access_token.to_string(),
            language_code: language_code.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/projects/{}/agent/sessions/{}:detectIntent",
            API_BASE, self.project_id, self.session_id
        )
    }

    fn body(&self, transcript: &str) -> Value {
        json!({
            "queryInput": {
                "text": {
                    "text": transcript,
                    "languageCode": self.language_code,
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    parameters: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Intent {
    #[serde(default)]
    display_name: Option<String>,
}

/// Map a detectIntent response body to a classification
fn parse_response(body: Value) -> Result<ClassificationResult, ClassifierError> {
    let response: DetectIntentResponse =
        serde_json::from_value(body).map_err(|e| ClassifierError::Response(e.to_string()))?;

    let Some(query) = response.query_result else {
        return Ok(ClassificationResult::default());
    };

    let intent = query
        .intent
        .and_then(|i| i.display_name)
        .filter(|name| !name.is_empty());

    let parameters = query
        .parameters
        .into_iter()
        .filter_map(|(name, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!value.is_empty()).then_some((name, value))
        })
        .collect();

    Ok(ClassificationResult { intent, parameters })
}

#[async_trait]
impl IntentClassifier for DialogflowClassifier {
    async fn classify(&self, transcript: &str) -> Result<ClassificationResult, ClassifierError> {
        debug!(chars = transcript.len(), "sending transcript to Dialogflow");

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.access_token)
            .json(&self.body(transcript))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Service { status, message });
        }

        let body: Value = resp.json().await?;
        let result = parse_response(body)?;
        debug!(intent = ?result.intent, "Dialogflow classified transcript");
        Ok(result)
    }
}
