//! Remote state store clients
//!
//! The store owns the three device attributes. Clients write single keys
//! and subscribe to keys; a subscription yields the current value first and
//! then every change. A subscription channel closing without a
//! [`Delivery::Revoked`] means the transport dropped and the key can be
//! subscribed again.

mod firebase;
mod memory;
mod sse;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use firebase::RealtimeDbStore;
pub use memory::MemoryStore;

/// Item delivered by a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Current value of the key; `None` when the key holds nothing
    Value(Option<String>),
    /// Store ended the subscription for good
    Revoked(String),
}

pub type Subscription = mpsc::Receiver<Delivery>;

/// Errors from the remote store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid store url: {0}")]
    InvalidUrl(String),
}

impl StoreError {
    /// Whether trying again cannot help
    pub fn is_permanent(&self) -> bool {
        match self {
            StoreError::Request(_) => false,
            StoreError::Rejected { status, .. } => matches!(status, 400 | 401 | 403),
            StoreError::InvalidUrl(_) => true,
        }
    }
}

/// Key-value store with push subscriptions
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Overwrite one key
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Subscribe to one key
    ///
    /// May be called again for the same key after a subscription drops.
    async fn subscribe(&self, key: &str) -> Result<Subscription, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_permanent() {
        let rejected = |status| StoreError::Rejected {
            status,
            message: String::new(),
        };
        assert!(rejected(401).is_permanent());
        assert!(rejected(403).is_permanent());
        assert!(!rejected(503).is_permanent());
        assert!(StoreError::InvalidUrl("ftp://x".into()).is_permanent());
    }
}
