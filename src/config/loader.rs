//! Configuration loader with layer-based merging.
//!
//! Loads every source in precedence order, merges them, expands path-like
//! values once over the merged tree and freezes the result into a `ConfigView`.

use super::layer::{ConfigLayer, LayerKind};
use super::merge::merge_layers;
use super::paths::PathResolver;
use super::view::ConfigView;
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the user settings file location.
pub const USER_CONFIG_ENV: &str = "JOBCRAFT_USER_CONFIG";
/// Environment variable overriding the local override file location.
pub const LOCAL_CONFIG_ENV: &str = "JOBCRAFT_LOCAL_CONFIG";

/// Locations of the file-backed layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User-level settings file
    pub user_file: Option<PathBuf>,
    /// Machine-local override file
    pub local_file: Option<PathBuf>,
    /// Explicit file from the command line; must exist when set
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover file locations from environment and defaults.
    pub fn discover() -> Self {
        // User file: JOBCRAFT_USER_CONFIG or ~/.jobcraft/settings.yaml
        let user_file = std::env::var(USER_CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".jobcraft").join("settings.yaml")));

        // Local file: JOBCRAFT_LOCAL_CONFIG or $CWD/settings.local.yaml
        let local_file = std::env::var(LOCAL_CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from("settings.local.yaml")));

        Self {
            user_file,
            local_file,
            explicit_file: None,
        }
    }

    /// Create paths with explicit files.
    pub fn with_files(user_file: Option<PathBuf>, local_file: Option<PathBuf>) -> Self {
        Self {
            user_file,
            local_file,
            explicit_file: None,
        }
    }

    /// Add a command-line config file on top of the other layers.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_file = Some(path.into());
        self
    }
}

/// Merge layers and expand paths into a frozen view.
pub fn resolve(layers: &[ConfigLayer], resolver: &PathResolver) -> ConfigView {
    let mut merged = merge_layers(layers);
    resolver.expand_tree(&mut merged);
    ConfigView::new(merged)
}

/// Configuration loader holding the loaded layers and the resolved view.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Paths for each file-backed layer
    pub paths: ConfigPaths,
    /// Layers in precedence order, lowest first
    layers: Vec<ConfigLayer>,
    /// Resolved configuration
    view: ConfigView,
}

impl ConfigLoader {
    /// Load configuration from all sources with proper merging.
    pub fn load() -> ConfigResult<Self> {
        Self::load_with(ConfigPaths::discover(), &PathResolver::discover())
    }

    /// Load configuration with explicit paths and resolver.
    pub fn load_with(paths: ConfigPaths, resolver: &PathResolver) -> ConfigResult<Self> {
        let mut layers = vec![ConfigLayer::defaults()?];

        if let Some(ref user_file) = paths.user_file {
            layers.push(ConfigLayer::load_file(LayerKind::User, user_file)?);
        }

        if let Some(ref local_file) = paths.local_file {
            layers.push(ConfigLayer::load_file(LayerKind::Local, local_file)?);
        }

        if let Some(ref explicit_file) = paths.explicit_file {
            let layer = ConfigLayer::load_file(LayerKind::Explicit, explicit_file)?;
            if !layer.is_present() {
                return Err(ConfigError::Io {
                    path: explicit_file.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "explicit config file does not exist",
                    ),
                });
            }
            layers.push(layer);
        }

        for layer in &layers {
            debug!(
                layer = %layer.kind(),
                rank = layer.rank(),
                present = layer.is_present(),
                origin = ?layer.origin(),
                "Config layer"
            );
        }

        let view = resolve(&layers, resolver);
        info!(
            layers = layers.iter().filter(|l| l.is_present()).count(),
            "Configuration resolved"
        );

        Ok(Self {
            paths,
            layers,
            view,
        })
    }

    /// Get the resolved configuration.
    pub fn view(&self) -> &ConfigView {
        &self.view
    }

    /// Consume the loader and return the configuration.
    pub fn into_view(self) -> ConfigView {
        self.view
    }

    /// Layers in precedence order, lowest first.
    pub fn layers(&self) -> &[ConfigLayer] {
        &self.layers
    }

    /// Files that existed and contributed to the merge.
    pub fn present_files(&self) -> Vec<&Path> {
        self.layers
            .iter()
            .filter(|l| l.is_present())
            .filter_map(|l| l.origin())
            .collect()
    }
}
