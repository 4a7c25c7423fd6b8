//! Per-type collection index.
//!
//! `collections/{entity_type}.json` maps identifier to summary fields, in
//! insertion order. It is a derived cache: entity files are the source of truth.

use super::entity::{Entity, EntityRecord};
use super::write_atomic;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One listed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub identifier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// On-disk shape of an entry; the identifier is the map key.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl IndexEntry {
    /// Project a record into its index entry.
    pub fn from_record<E: Entity>(record: &EntityRecord<E>) -> Self {
        let mut fields = record.payload.summary();
        fields.retain(|k, _| k != "created_at" && k != "updated_at" && k != "identifier");
        Self {
            identifier: record.identifier.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            fields,
        }
    }
}

/// Handle on one collection index file.
#[derive(Debug, Clone)]
pub struct CollectionIndex {
    path: PathBuf,
}

impl CollectionIndex {
    pub fn new(root: &Path, entity_type: &str) -> Self {
        Self {
            path: root.join("collections").join(format!("{}.json", entity_type)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries. A missing index file is an empty index.
    pub fn load(&self) -> StoreResult<Vec<IndexEntry>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let raw: Map<String, Value> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::serialization(&self.path, e))?;

        raw.into_iter()
            .map(|(identifier, value)| {
                let stored: StoredEntry = serde_json::from_value(value)
                    .map_err(|e| StoreError::serialization(&self.path, e))?;
                Ok(IndexEntry {
                    identifier,
                    created_at: stored.created_at,
                    updated_at: stored.updated_at,
                    fields: stored.fields,
                })
            })
            .collect()
    }

    /// Replace the index file with `entries`, preserving their order.
    pub fn save(&self, entries: &[IndexEntry]) -> StoreResult<()> {
        let mut raw = Map::new();
        for entry in entries {
            let stored = StoredEntry {
                created_at: entry.created_at,
                updated_at: entry.updated_at,
                fields: entry.fields.clone(),
            };
            let value = serde_json::to_value(stored)
                .map_err(|e| StoreError::serialization(&self.path, e))?;
            raw.insert(entry.identifier.clone(), value);
        }
        let bytes = serde_json::to_vec_pretty(&Value::Object(raw))
            .map_err(|e| StoreError::serialization(&self.path, e))?;
        write_atomic(&self.path, &bytes)
    }

    /// Insert or refresh an entry. An existing entry keeps its position.
    pub fn upsert(&self, entry: IndexEntry) -> StoreResult<()> {
        let mut entries = self.load()?;
        upsert_entry(&mut entries, entry);
        self.save(&entries)
    }

    /// Remove an entry. Returns whether it was present.
    pub fn remove(&self, identifier: &str) -> StoreResult<bool> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.identifier != identifier);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }
}

pub(crate) fn upsert_entry(entries: &mut Vec<IndexEntry>, entry: IndexEntry) {
    match entries.iter_mut().find(|e| e.identifier == entry.identifier) {
        Some(slot) => *slot = entry,
        None => entries.push(entry),
    }
}
