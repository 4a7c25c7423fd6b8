//! Structured error types for configuration and storage.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Configuration errors (fatal at startup)
    ConfigParse,
    ConfigNotAMapping,
    ConfigInvalid,
    ConfigIo,
    ConfigAlreadyInitialized,

    // Storage errors
    NotFound,
    GenerationExhausted,
    PartialDelete,
    PartialUpdate,
    RepairFailed,
    StorageIo,
    Serialization,
}

/// Errors raised while loading, merging or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source document could not be parsed.
    #[error("failed to parse config layer '{layer}': {message}")]
    Parse { layer: String, message: String },

    /// A source document parsed, but its root is not a mapping.
    #[error("config layer '{layer}' must be a mapping at the top level, found {found}")]
    NotAMapping { layer: String, found: &'static str },

    /// A value exists at `path` but does not have the expected shape.
    #[error("invalid config value at '{path}': {message}")]
    Invalid { path: String, message: String },

    /// A source file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process-wide configuration was already set.
    #[error("configuration is already initialized")]
    AlreadyInitialized,
}

impl ConfigError {
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Parse { .. } => ErrorCode::ConfigParse,
            ConfigError::NotAMapping { .. } => ErrorCode::ConfigNotAMapping,
            ConfigError::Invalid { .. } => ErrorCode::ConfigInvalid,
            ConfigError::Io { .. } => ErrorCode::ConfigIo,
            ConfigError::AlreadyInitialized => ErrorCode::ConfigAlreadyInitialized,
        }
    }
}

/// Errors raised by the entity repository.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No readable entity file exists for the identifier.
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Every identifier candidate was already taken.
    #[error("could not allocate an identifier for '{base}' after {attempts} attempts")]
    GenerationExhausted { base: String, attempts: usize },

    /// Only one of the two artifacts (entity file, index entry) was removed.
    #[error(
        "partial delete of {entity_type} '{identifier}': file removed={file_removed}, index entry removed={index_removed}"
    )]
    PartialDelete {
        entity_type: String,
        identifier: String,
        file_removed: bool,
        index_removed: bool,
        #[source]
        source: Box<StoreError>,
    },

    /// The entity file was rewritten but its index entry was not.
    #[error("{entity_type} '{identifier}' was updated on disk but its index entry was not: {source}")]
    PartialUpdate {
        entity_type: String,
        identifier: String,
        #[source]
        source: Box<StoreError>,
    },

    /// An index/file divergence was detected but could not be repaired.
    #[error("failed to repair {entity_type} index entry '{identifier}': {source}")]
    RepairFailed {
        entity_type: String,
        identifier: String,
        #[source]
        source: Box<StoreError>,
    },

    /// Any other filesystem failure.
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be encoded or decoded.
    #[error("failed to (de)serialize {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn not_found(entity_type: &str, identifier: &str) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_string(),
            identifier: identifier.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialization {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound { .. } => ErrorCode::NotFound,
            StoreError::GenerationExhausted { .. } => ErrorCode::GenerationExhausted,
            StoreError::PartialDelete { .. } => ErrorCode::PartialDelete,
            StoreError::PartialUpdate { .. } => ErrorCode::PartialUpdate,
            StoreError::RepairFailed { .. } => ErrorCode::RepairFailed,
            StoreError::Io { .. } => ErrorCode::StorageIo,
            StoreError::Serialization { .. } => ErrorCode::Serialization,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for repository operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
