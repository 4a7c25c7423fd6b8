//! Identifier-addressed CRUD over one entity kind.
//!
//! Mutations always write the entity file first and the index second, so an
//! interruption leaves at worst an orphan file, which the next read repairs.

use super::entity::{Entity, EntityRecord};
use super::ident::{IdentifierGenerator, is_valid_identifier};
use super::index::{CollectionIndex, IndexEntry, upsert_entry};
use super::write_atomic;
use crate::error::{StoreError, StoreResult};
use chrono::Utc;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An index/file divergence found (and repaired) on a read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// Index entry with no backing file; the entry was dropped.
    DanglingEntry { identifier: String },
    /// Entity file with no index entry; an entry was rebuilt from the file.
    OrphanFile { identifier: String },
    /// Entity file that could not be decoded; left out of the index.
    UnreadableFile { identifier: String, reason: String },
    /// Index file that could not be decoded; rebuilt from entity files.
    UnreadableIndex { reason: String },
}

impl IntegrityIssue {
    fn identifier(&self) -> &str {
        match self {
            IntegrityIssue::DanglingEntry { identifier }
            | IntegrityIssue::OrphanFile { identifier }
            | IntegrityIssue::UnreadableFile { identifier, .. } => identifier,
            IntegrityIssue::UnreadableIndex { .. } => "*",
        }
    }
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DanglingEntry { identifier } => {
                write!(f, "dropped index entry '{}' with no entity file", identifier)
            }
            IntegrityIssue::OrphanFile { identifier } => {
                write!(f, "rebuilt index entry for unindexed entity '{}'", identifier)
            }
            IntegrityIssue::UnreadableFile { identifier, reason } => {
                write!(f, "skipped unreadable entity '{}': {}", identifier, reason)
            }
            IntegrityIssue::UnreadableIndex { reason } => {
                write!(f, "rebuilt unreadable index: {}", reason)
            }
        }
    }
}

/// Result of reading one entity file.
enum ReadOutcome<E> {
    Found(EntityRecord<E>),
    Missing,
    Unreadable(String),
}

/// CRUD repository for entities of kind `E`.
#[derive(Debug, Clone)]
pub struct EntityRepository<E: Entity> {
    root: PathBuf,
    index: CollectionIndex,
    ids: IdentifierGenerator,
    _kind: PhantomData<fn() -> E>,
}

impl<E: Entity> EntityRepository<E> {
    pub fn new(root: PathBuf, ids: IdentifierGenerator) -> Self {
        let index = CollectionIndex::new(&root, E::KIND);
        Self {
            root,
            index,
            ids,
            _kind: PhantomData,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        E::KIND
    }

    pub fn index(&self) -> &CollectionIndex {
        &self.index
    }

    fn entity_dir(&self, identifier: &str) -> PathBuf {
        self.root.join(E::KIND).join(identifier)
    }

    /// Location of the entity file for `identifier`.
    pub fn entity_path(&self, identifier: &str) -> PathBuf {
        self.entity_dir(identifier).join(format!("{}.json", E::KIND))
    }

    /// Whether an entity file exists for `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        is_valid_identifier(identifier) && self.entity_path(identifier).is_file()
    }

    /// Store a new entity under a freshly generated identifier.
    pub fn create(&self, payload: E) -> StoreResult<EntityRecord<E>> {
        let mut entries = self.load_index_lenient()?;
        let indexed: HashSet<String> = entries.iter().map(|e| e.identifier.clone()).collect();

        let identifier = self.ids.generate(&payload.seed_fields(), |candidate| {
            indexed.contains(candidate) || self.entity_dir(candidate).exists()
        })?;

        let record = EntityRecord::new(identifier, payload, Utc::now());
        self.write_record(&record)?;

        upsert_entry(&mut entries, IndexEntry::from_record(&record));
        self.index.save(&entries)?;

        info!(entity_type = E::KIND, identifier = %record.identifier, "Created entity");
        Ok(record)
    }

    /// Read an entity from its file.
    pub fn get(&self, identifier: &str) -> StoreResult<EntityRecord<E>> {
        if !is_valid_identifier(identifier) {
            return Err(StoreError::not_found(E::KIND, identifier));
        }

        match self.read_record(identifier)? {
            ReadOutcome::Found(record) => {
                self.ensure_indexed(&record)?;
                Ok(record)
            }
            ReadOutcome::Missing => {
                self.drop_dangling(identifier)?;
                Err(StoreError::not_found(E::KIND, identifier))
            }
            ReadOutcome::Unreadable(reason) => {
                self.drop_unreadable(identifier, reason)?;
                Err(StoreError::not_found(E::KIND, identifier))
            }
        }
    }

    /// List index entries in insertion order, repairing divergence first.
    ///
    /// Indexed files are only checked for existence; `repair` also decodes them.
    pub fn list(&self) -> StoreResult<Vec<IndexEntry>> {
        let (entries, _) = self.reconcile(false)?;
        Ok(entries)
    }

    /// Replace an entity's payload and refresh its `updated_at`.
    ///
    /// Fails with `PartialUpdate` when the file was rewritten but the index
    /// entry could not be.
    pub fn update(&self, identifier: &str, payload: E) -> StoreResult<EntityRecord<E>> {
        if !is_valid_identifier(identifier) {
            return Err(StoreError::not_found(E::KIND, identifier));
        }

        let existing = match self.read_record(identifier)? {
            ReadOutcome::Found(record) => record,
            ReadOutcome::Missing => {
                self.drop_dangling(identifier)?;
                return Err(StoreError::not_found(E::KIND, identifier));
            }
            ReadOutcome::Unreadable(reason) => {
                self.drop_unreadable(identifier, reason)?;
                return Err(StoreError::not_found(E::KIND, identifier));
            }
        };

        // Index problems surface here, before the entity file is touched.
        let mut entries = self.load_index_lenient()?;

        let record = EntityRecord {
            payload,
            updated_at: Utc::now().max(existing.created_at),
            ..existing
        };
        self.write_record(&record)?;

        upsert_entry(&mut entries, IndexEntry::from_record(&record));
        self.index
            .save(&entries)
            .map_err(|source| StoreError::PartialUpdate {
                entity_type: E::KIND.to_string(),
                identifier: identifier.to_string(),
                source: Box::new(source),
            })?;

        info!(entity_type = E::KIND, identifier, "Updated entity");
        Ok(record)
    }

    /// Remove an entity file and its index entry.
    ///
    /// Fails with `PartialDelete` when the file is gone but the index entry
    /// could not be removed.
    pub fn delete(&self, identifier: &str) -> StoreResult<()> {
        if !is_valid_identifier(identifier) {
            return Err(StoreError::not_found(E::KIND, identifier));
        }

        let path = self.entity_path(identifier);
        if !path.is_file() {
            self.drop_dangling(identifier)?;
            return Err(StoreError::not_found(E::KIND, identifier));
        }

        std::fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        let dir = self.entity_dir(identifier);
        if let Err(e) = std::fs::remove_dir(&dir) {
            debug!(dir = %dir.display(), error = %e, "Entity directory kept");
        }

        if let Err(source) = self.index.remove(identifier) {
            return Err(StoreError::PartialDelete {
                entity_type: E::KIND.to_string(),
                identifier: identifier.to_string(),
                file_removed: true,
                index_removed: false,
                source: Box::new(source),
            });
        }

        info!(entity_type = E::KIND, identifier, "Deleted entity");
        Ok(())
    }

    /// Reconcile the index with the entity files and report what was repaired.
    ///
    /// Unlike `list`, every indexed file is decoded, so entries whose file
    /// exists but cannot be read are dropped too.
    pub fn repair(&self) -> StoreResult<Vec<IntegrityIssue>> {
        let (_, issues) = self.reconcile(true)?;
        Ok(issues)
    }

    fn reconcile(&self, decode_indexed: bool) -> StoreResult<(Vec<IndexEntry>, Vec<IntegrityIssue>)> {
        let mut issues = Vec::new();
        let mut index_changed = false;

        let loaded = match self.index.load() {
            Ok(entries) => entries,
            Err(StoreError::Serialization { source, .. }) => {
                issues.push(IntegrityIssue::UnreadableIndex {
                    reason: source.to_string(),
                });
                index_changed = true;
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        // Identifiers with a file on disk that the index already accounted for.
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries = Vec::with_capacity(loaded.len());
        for entry in loaded {
            if !self.entity_path(&entry.identifier).is_file() {
                issues.push(IntegrityIssue::DanglingEntry {
                    identifier: entry.identifier,
                });
                index_changed = true;
                continue;
            }
            seen.insert(entry.identifier.clone());

            if decode_indexed
                && let ReadOutcome::Unreadable(reason) = self.read_record(&entry.identifier)?
            {
                issues.push(IntegrityIssue::UnreadableFile {
                    identifier: entry.identifier,
                    reason,
                });
                index_changed = true;
                continue;
            }
            entries.push(entry);
        }

        let mut orphans = Vec::new();
        for identifier in self.stored_identifiers()? {
            if seen.contains(&identifier) {
                continue;
            }
            match self.read_record(&identifier)? {
                ReadOutcome::Found(record) => {
                    issues.push(IntegrityIssue::OrphanFile {
                        identifier: identifier.clone(),
                    });
                    orphans.push(IndexEntry::from_record(&record));
                    index_changed = true;
                }
                ReadOutcome::Unreadable(reason) => {
                    issues.push(IntegrityIssue::UnreadableFile { identifier, reason });
                }
                ReadOutcome::Missing => {}
            }
        }
        orphans.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.identifier.cmp(&b.identifier))
        });
        entries.extend(orphans);

        for issue in &issues {
            warn!(entity_type = E::KIND, "Index integrity: {}", issue);
        }

        if index_changed {
            self.index.save(&entries).map_err(|source| StoreError::RepairFailed {
                entity_type: E::KIND.to_string(),
                identifier: issues
                    .first()
                    .map(|i| i.identifier().to_string())
                    .unwrap_or_default(),
                source: Box::new(source),
            })?;
        }

        Ok((entries, issues))
    }

    /// Identifiers with an entity file on disk, sorted.
    fn stored_identifiers(&self) -> StoreResult<Vec<String>> {
        let kind_dir = self.root.join(E::KIND);
        let dir = match std::fs::read_dir(&kind_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&kind_dir, e)),
        };

        let mut identifiers = Vec::new();
        for item in dir {
            let item = item.map_err(|e| StoreError::io(&kind_dir, e))?;
            let Some(name) = item.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_valid_identifier(&name) && self.entity_path(&name).is_file() {
                identifiers.push(name);
            }
        }
        identifiers.sort();
        Ok(identifiers)
    }

    fn ensure_indexed(&self, record: &EntityRecord<E>) -> StoreResult<()> {
        let mut entries = self.load_index_lenient()?;
        if entries.iter().any(|e| e.identifier == record.identifier) {
            return Ok(());
        }

        let issue = IntegrityIssue::OrphanFile {
            identifier: record.identifier.clone(),
        };
        warn!(entity_type = E::KIND, "Index integrity: {}", issue);
        entries.push(IndexEntry::from_record(record));
        self.save_repaired(&record.identifier, &entries)
    }

    fn drop_dangling(&self, identifier: &str) -> StoreResult<()> {
        self.drop_entry(IntegrityIssue::DanglingEntry {
            identifier: identifier.to_string(),
        })
    }

    fn drop_unreadable(&self, identifier: &str, reason: String) -> StoreResult<()> {
        warn!(entity_type = E::KIND, identifier, reason = %reason, "Entity file is unreadable");
        self.drop_entry(IntegrityIssue::UnreadableFile {
            identifier: identifier.to_string(),
            reason,
        })
    }

    /// Remove the entry named by `issue` from the index, if present.
    fn drop_entry(&self, issue: IntegrityIssue) -> StoreResult<()> {
        let identifier = issue.identifier();
        let mut entries = self.load_index_lenient()?;
        let before = entries.len();
        entries.retain(|e| e.identifier != identifier);
        if entries.len() == before {
            return Ok(());
        }

        warn!(entity_type = E::KIND, "Index integrity: {}", issue);
        self.save_repaired(identifier, &entries)
    }

    fn save_repaired(&self, identifier: &str, entries: &[IndexEntry]) -> StoreResult<()> {
        self.index
            .save(entries)
            .map_err(|source| StoreError::RepairFailed {
                entity_type: E::KIND.to_string(),
                identifier: identifier.to_string(),
                source: Box::new(source),
            })
    }

    /// Load the index; an undecodable index is rebuilt from the entity files.
    fn load_index_lenient(&self) -> StoreResult<Vec<IndexEntry>> {
        match self.index.load() {
            Err(StoreError::Serialization { .. }) => Ok(self.reconcile(false)?.0),
            other => other,
        }
    }

    fn read_record(&self, identifier: &str) -> StoreResult<ReadOutcome<E>> {
        let path = self.entity_path(identifier);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ReadOutcome::Missing),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let record: EntityRecord<E> = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => return Ok(ReadOutcome::Unreadable(e.to_string())),
        };
        if record.identifier != identifier || record.entity_type != E::KIND {
            return Ok(ReadOutcome::Unreadable(format!(
                "file describes {} '{}'",
                record.entity_type, record.identifier
            )));
        }
        Ok(ReadOutcome::Found(record))
    }

    fn write_record(&self, record: &EntityRecord<E>) -> StoreResult<()> {
        let path = self.entity_path(&record.identifier);
        let bytes = serde_json::to_vec_pretty(record).map_err(|e| StoreError::serialization(&path, e))?;
        write_atomic(&path, &bytes)
    }

    /// Storage root this repository writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
