//! In-process store used in local mode and in tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::{Delivery, RemoteStore, StoreError, Subscription};

/// Store keeping every key in a `watch` channel
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    keys: HashMap<String, watch::Sender<Option<String>>>,
    writes: Vec<(String, String)>,
    fail_writes: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, oldest first
    #[cfg(test)]
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    /// Current value of a key
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().keys.get(key).and_then(|tx| tx.borrow().clone())
    }

    /// Make every subsequent write fail with `reason`
    #[cfg(test)]
    pub fn fail_writes(&self, reason: impl Into<String>) {
        self.lock().fail_writes = Some(reason.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Inner {
    fn key(&mut self, key: &str) -> &watch::Sender<Option<String>> {
        self.keys
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(None).0)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(reason) = &inner.fail_writes {
            return Err(StoreError::Rejected {
                status: 503,
                message: reason.clone(),
            });
        }

        debug!(key, value, "memory store write");
        inner.writes.push((key.to_string(), value.to_string()));
        inner.key(key).send_replace(Some(value.to_string()));
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> Result<Subscription, StoreError> {
        let mut watch_rx = self.lock().key(key).subscribe();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            loop {
                let current = watch_rx.borrow_and_update().clone();
                if tx.send(Delivery::Value(current)).await.is_err() {
                    return;
                }
                if watch_rx.changed().await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_subscribe_delivers_current_then_changes() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("alarm").await.unwrap();
        assert_eq!(sub.recv().await, Some(Delivery::Value(None)));

        assert_ok!(store.write("alarm", "on").await);
        assert_eq!(sub.recv().await, Some(Delivery::Value(Some("on".to_string()))));

        // Late subscriber sees the current value straight away
        let mut late = store.subscribe("alarm").await.unwrap();
        assert_eq!(late.recv().await, Some(Delivery::Value(Some("on".to_string()))));
    }

    #[tokio::test]
    async fn test_writes_are_recorded_in_order() {
        let store = MemoryStore::new();
        store.write("alarm", "on").await.unwrap();
        store.write("movie_night", "off").await.unwrap();

        assert_eq!(
            store.writes(),
            vec![
                ("alarm".to_string(), "on".to_string()),
                ("movie_night".to_string(), "off".to_string()),
            ]
        );
        assert_eq!(store.get("alarm").as_deref(), Some("on"));
        assert_eq!(store.get("override"), None);
    }

    #[tokio::test]
    async fn test_failing_writes_leave_value() {
        let store = MemoryStore::new();
        store.write("override", "off").await.unwrap();
        store.fail_writes("permission denied");

        assert_err!(store.write("override", "on").await);
        assert_eq!(store.get("override").as_deref(), Some("off"));
        assert_eq!(store.writes().len(), 1);
    }
}
