//! Server-sent event decoding for realtime database streams
//!
//! A streaming GET on a key answers with `text/event-stream` frames:
//!
//! ```text
//! event: put
//! data: {"path":"/","data":"on"}
//! ```

use serde::Deserialize;
use serde_json::Value;

/// One decoded server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental decoder fed with raw body chunks
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: String,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.finish_event() {
                    events.push(event);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        events
    }

    fn finish_event(&mut self) -> Option<SseEvent> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = std::mem::take(&mut self.event);
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent {
            event: if event.is_empty() { "message".to_string() } else { event },
            data,
        })
    }
}

/// Meaning of one stream event for a single-key subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamUpdate {
    /// Key now holds this value, `None` when deleted or never set
    Value(Option<String>),
    /// Nothing for the subscriber
    Ignore,
    /// Event could not be read; the stream should be reopened
    Malformed(String),
    /// Server ended the subscription
    Closed(String),
}

#[derive(Deserialize)]
struct PutPayload {
    path: String,
    data: Value,
}

/// Interpret a decoded event for a subscription on a leaf key
pub fn interpret(event: &SseEvent) -> StreamUpdate {
    match event.event.as_str() {
        "put" => match serde_json::from_str::<PutPayload>(&event.data) {
            Ok(payload) if payload.path == "/" => StreamUpdate::Value(leaf_value(payload.data)),
            Ok(_) => StreamUpdate::Ignore,
            Err(e) => StreamUpdate::Malformed(format!("malformed put event: {e}")),
        },
        "cancel" => StreamUpdate::Closed(format!("subscription cancelled: {}", event.data)),
        "auth_revoked" => StreamUpdate::Closed("credential revoked".to_string()),
        // keep-alive, patch on a leaf, unknown events
        _ => StreamUpdate::Ignore,
    }
}

/// Stored value as a string; strings verbatim, other scalars stringified
pub fn leaf_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
