//! Filesystem-backed entity storage.
//!
//! Layout under the storage root:
//! - `collections/{entity_type}.json` - collection index
//! - `{entity_type}/{identifier}/{entity_type}.json` - entity record

pub mod entity;
pub mod ident;
pub mod index;
pub mod repository;

pub use entity::{Entity, EntityRecord};
pub use ident::{IdentifierGenerator, slugify};
pub use index::{CollectionIndex, IndexEntry};
pub use repository::{EntityRepository, IntegrityIssue};

use crate::config::RepositorySettings;
use crate::error::{StoreError, StoreResult};
use crate::models::{CurriculumVitae, JobPosting};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage root handle; hands out typed repositories.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    ids: IdentifierGenerator,
}

impl Store {
    /// Open or create the storage root described by `settings`.
    pub fn open(settings: &RepositorySettings) -> StoreResult<Self> {
        let root = settings.data_dir.clone();
        let collections = root.join("collections");
        std::fs::create_dir_all(&collections).map_err(|e| StoreError::io(&collections, e))?;
        debug!(root = %root.display(), "Opened store");

        Ok(Self {
            root,
            ids: IdentifierGenerator::from_settings(settings),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository for any entity kind.
    pub fn repository<E: Entity>(&self) -> EntityRepository<E> {
        EntityRepository::new(self.root.clone(), self.ids.clone())
    }

    pub fn job_postings(&self) -> EntityRepository<JobPosting> {
        self.repository()
    }

    pub fn cvs(&self) -> EntityRepository<CurriculumVitae> {
        self.repository()
    }
}

/// Write `bytes` to `path` through a flushed sibling temp file and a rename,
/// so readers never observe a truncated file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })()
    .and_then(|()| std::fs::rename(&tmp, path));

    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_collections_dir() {
        let temp = TempDir::new().unwrap();
        let settings = RepositorySettings::new(temp.path().join("data"));
        let store = Store::open(&settings).unwrap();
        assert!(store.root().join("collections").is_dir());
    }

    #[test]
    fn test_write_atomic_replaces_and_cleans_up() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("file.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
