//! Direct toggle of one attribute
//!
//! The new value comes from the locally cached copy, not from a fresh read.
//! Two clients toggling at nearly the same time can both write the same
//! value; the store keeps the last write and every projection converges on
//! it through its subscription.

use tracing::info;

use crate::state::{toggled, DeviceAttribute};
use crate::store::{RemoteStore, StoreError};

/// Write the opposite of `cached` and return the value written
pub async fn toggle(
    store: &dyn RemoteStore,
    attribute: DeviceAttribute,
    cached: &str,
) -> Result<&'static str, StoreError> {
    let value = toggled(cached);
    store.write(attribute.key(), value).await?;
    info!(%attribute, from = cached, to = value, "attribute toggled");
    Ok(value)
}
