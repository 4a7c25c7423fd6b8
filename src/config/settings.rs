//! Typed configuration sections, validated where they are read.

use super::view::ConfigView;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chat model settings (`chat`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// LLM model name.
    pub model: String,
    /// Sampling temperature (0.0-2.0).
    pub temperature: f64,
}

impl ChatSettings {
    pub const PATH: &'static str = "chat";

    pub fn from_view(view: &ConfigView) -> ConfigResult<Self> {
        let settings: Self = view
            .get_as(Self::PATH)?
            .ok_or_else(|| ConfigError::invalid(Self::PATH, "section is missing"))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::invalid("chat.model", "must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::invalid(
                "chat.temperature",
                format!("must be between 0.0 and 2.0, got {}", self.temperature),
            ));
        }
        Ok(())
    }
}

/// Filesystem repository settings (`repositories.filesystem`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    /// Storage root. Already expanded to an absolute path.
    pub data_dir: PathBuf,

    /// Numbered candidates tried before falling back to random suffixes.
    #[serde(default = "default_max_identifier_attempts")]
    pub max_identifier_attempts: usize,

    /// Maximum slug length, before any disambiguating suffix.
    #[serde(default = "default_max_identifier_len")]
    pub max_identifier_len: usize,
}

fn default_max_identifier_attempts() -> usize {
    100
}

fn default_max_identifier_len() -> usize {
    64
}

impl RepositorySettings {
    pub const PATH: &'static str = "repositories.filesystem";

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_identifier_attempts: default_max_identifier_attempts(),
            max_identifier_len: default_max_identifier_len(),
        }
    }

    pub fn from_view(view: &ConfigView) -> ConfigResult<Self> {
        let settings: Self = view
            .get_as(Self::PATH)?
            .ok_or_else(|| ConfigError::invalid(Self::PATH, "section is missing"))?;
        if settings.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid(
                "repositories.filesystem.data_dir",
                "must not be empty",
            ));
        }
        if settings.max_identifier_attempts == 0 || settings.max_identifier_len == 0 {
            return Err(ConfigError::invalid(
                Self::PATH,
                "identifier limits must be greater than zero",
            ));
        }
        Ok(settings)
    }
}
