//! Realtime database client over the REST streaming API
//!
//! Writes are `PUT {base}/{key}.json`. Subscriptions hold a streaming GET
//! open with `Accept: text/event-stream` and forward each `put` on the key.
//! Transport errors and end of body just close the subscription channel;
//! only `cancel` and `auth_revoked` are delivered as a revocation.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::sse::{interpret, SseDecoder, StreamUpdate};
use super::{Delivery, RemoteStore, StoreError, Subscription};

/// Client for a realtime database instance
pub struct RealtimeDbStore {
    base_url: String,
    auth: Option<String>,
    client: reqwest::Client,
}

impl RealtimeDbStore {
    pub fn new(base_url: &str, auth: Option<String>) -> Result<Self, StoreError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(StoreError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: base_url.to_string(),
            auth,
            client: reqwest::Client::new(),
        })
    }

    /// REST location of a key
    fn key_url(&self, key: &str) -> String {
        format!("{}/{}.json", self.base_url, key)
    }

    fn request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.key_url(key));
        match &self.auth {
            Some(auth) => builder.query(&[("auth", auth)]),
            None => builder,
        }
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let message = resp.text().await.unwrap_or_default();
    Err(StoreError::Rejected { status, message })
}

#[async_trait]
impl RemoteStore for RealtimeDbStore {
    async fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        debug!(key, value, "writing to realtime database");
        let resp = self
            .request(reqwest::Method::PUT, key)
            .json(&value)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn subscribe(&self, key: &str) -> Result<Subscription, StoreError> {
        let resp = self
            .request(reqwest::Method::GET, key)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check(resp).await?;

        info!(key, "realtime database stream opened");

        let (tx, rx) = mpsc::channel(16);
        let key = key.to_string();

        tokio::spawn(async move {
            let mut body = resp.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(key = %key, ?e, "realtime database stream failed");
                        return;
                    }
                };

                for event in decoder.push(&chunk) {
                    match interpret(&event) {
                        StreamUpdate::Value(value) => {
                            if tx.send(Delivery::Value(value)).await.is_err() {
                                return;
                            }
                        }
                        StreamUpdate::Ignore => {}
                        StreamUpdate::Malformed(reason) => {
                            warn!(key = %key, %reason, "dropping realtime database stream");
                            return;
                        }
                        StreamUpdate::Closed(reason) => {
                            warn!(key = %key, %reason, "realtime database revoked stream");
                            let _ = tx.send(Delivery::Revoked(reason)).await;
                            return;
                        }
                    }
                }
            }

            debug!(key = %key, "realtime database stream ended");
        });

        Ok(rx)
    }
}
