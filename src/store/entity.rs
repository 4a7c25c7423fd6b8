//! Entity contract and the persisted record envelope.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A persisted domain type.
///
/// Each kind names its own storage directory, the fields its identifier is
/// derived from, and the projection kept in the collection index.
pub trait Entity: Serialize + DeserializeOwned {
    /// Entity type, used in storage paths (`collections/{KIND}.json`).
    const KIND: &'static str;

    /// Fields the identifier slug is derived from, most significant first.
    fn seed_fields(&self) -> Vec<String>;

    /// Summary fields stored in the collection index.
    fn summary(&self) -> Map<String, Value>;
}

/// A stored entity with its identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord<E> {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: E,
}

impl<E: Entity> EntityRecord<E> {
    pub(crate) fn new(identifier: String, payload: E, now: DateTime<Utc>) -> Self {
        Self {
            entity_type: E::KIND.to_string(),
            identifier,
            created_at: now,
            updated_at: now,
            payload,
        }
    }
}
