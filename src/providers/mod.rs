//! Provider lookups, one per external data source.
//!
//! Each provider module owns its endpoint's wire shapes and the mapping from
//! them into normalized fragments or connection edges.

pub mod context;
pub mod foundation;
pub mod rarible;
pub mod superrare;

pub use context::ContextLookup;
pub use foundation::FoundationLookup;
pub use rarible::RaribleLookup;
pub use superrare::SuperrareLookup;

use crate::error::{LookupFailure, StageExt};
use crate::models::Address;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// Substitute the address into an endpoint template.
pub(crate) fn render_url(template: &str, address: &Address) -> String {
    template.replace("{address}", address.as_str())
}

/// Decode a response body, labelling failures with the lookup's stage.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8], stage: &str) -> Result<T, LookupFailure> {
    serde_json::from_slice(body).stage(stage)
}

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
