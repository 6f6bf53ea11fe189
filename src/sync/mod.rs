//! Store subscriptions feeding the dashboard event queue
//!
//! One task per attribute. Each forwards its deliveries to the machine's
//! input channel, so merging happens on the single event loop. A dropped
//! subscription is reopened with exponential backoff; the store delivers the
//! current value again on every new subscription, so the cache catches up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{DeviceAttribute, Input};
use crate::store::{Delivery, RemoteStore};

/// Delay between resubscribe attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    fn after(&self, delay: Duration) -> Duration {
        (delay * 2).min(self.max)
    }
}

/// Start following every attribute
pub fn spawn_subscriptions(
    store: Arc<dyn RemoteStore>,
    input_tx: mpsc::Sender<Input>,
    backoff: Backoff,
) -> Vec<JoinHandle<()>> {
    DeviceAttribute::ALL
        .into_iter()
        .map(|attribute| {
            tokio::spawn(follow(
                Arc::clone(&store),
                attribute,
                input_tx.clone(),
                backoff,
            ))
        })
        .collect()
}

async fn follow(
    store: Arc<dyn RemoteStore>,
    attribute: DeviceAttribute,
    input_tx: mpsc::Sender<Input>,
    backoff: Backoff,
) {
    let mut delay = backoff.initial;
    // One notice per outage
    let mut reported = false;

    loop {
        match store.subscribe(attribute.key()).await {
            Ok(mut subscription) => {
                info!(%attribute, "subscribed to store");

                while let Some(delivery) = subscription.recv().await {
                    match delivery {
                        Delivery::Value(value) => {
                            delay = backoff.initial;
                            reported = false;
                            debug!(%attribute, ?value, "store delivery");
                            if input_tx.send(Input::Delivered { attribute, value }).await.is_err() {
                                // Dashboard loop is gone
                                return;
                            }
                        }
                        Delivery::Revoked(reason) => {
                            warn!(%attribute, %reason, "store ended subscription");
                            let _ = input_tx.send(Input::SyncLost { attribute, reason }).await;
                            return;
                        }
                    }
                }

                warn!(%attribute, ?delay, "store subscription dropped, resubscribing");
            }
            Err(e) if e.is_permanent() => {
                warn!(%attribute, ?e, "store refused subscription");
                let _ = input_tx
                    .send(Input::SyncLost {
                        attribute,
                        reason: e.to_string(),
                    })
                    .await;
                return;
            }
            Err(e) => {
                warn!(%attribute, ?e, ?delay, "failed to subscribe, retrying");
                if !reported {
                    reported = true;
                    let lost = Input::SyncLost {
                        attribute,
                        reason: e.to_string(),
                    };
                    if input_tx.send(lost).await.is_err() {
                        return;
                    }
                }
            }
        }

        if input_tx.is_closed() {
            return;
        }
        tokio::time::sleep(delay).await;
        delay = backoff.after(delay);
    }
}
