//! Configuration layers and their loading from disk.

use crate::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Built-in defaults, embedded at build time.
const DEFAULTS_YAML: &str = include_str!("../../config/defaults.yaml");

/// Layer priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerKind {
    /// Embedded defaults (lowest priority)
    Defaults = 0,
    /// User-level settings (~/.jobcraft/settings.yaml)
    User = 1,
    /// Machine-local override (./settings.local.yaml)
    Local = 2,
    /// File passed explicitly on the command line (highest priority)
    Explicit = 3,
}

impl LayerKind {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Defaults => write!(f, "defaults"),
            LayerKind::User => write!(f, "user"),
            LayerKind::Local => write!(f, "local"),
            LayerKind::Explicit => write!(f, "explicit"),
        }
    }
}

/// One configuration source: a raw nested mapping with a precedence rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    kind: LayerKind,
    origin: Option<PathBuf>,
    present: bool,
    values: Map<String, Value>,
}

impl ConfigLayer {
    /// Build a layer from an already-parsed value. The root must be a mapping;
    /// `null` counts as an empty mapping.
    pub fn new(kind: LayerKind, value: Value) -> ConfigResult<Self> {
        let values = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ConfigError::NotAMapping {
                    layer: kind.to_string(),
                    found: kind_name(&other),
                });
            }
        };
        Ok(Self {
            kind,
            origin: None,
            present: true,
            values,
        })
    }

    /// An empty layer, used when a source file does not exist.
    pub fn empty(kind: LayerKind) -> Self {
        Self {
            kind,
            origin: None,
            present: false,
            values: Map::new(),
        }
    }

    /// Parse a YAML document into a layer.
    pub fn from_yaml_str(kind: LayerKind, content: &str) -> ConfigResult<Self> {
        if is_blank_document(content) {
            return Self::new(kind, Value::Null);
        }
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            layer: kind.to_string(),
            message: e.to_string(),
        })?;
        Self::new(kind, value)
    }

    /// The embedded defaults layer.
    pub fn defaults() -> ConfigResult<Self> {
        Self::from_yaml_str(LayerKind::Defaults, DEFAULTS_YAML)
    }

    /// Load a layer from a file. A missing file yields an empty layer.
    pub fn load_file(kind: LayerKind, path: &Path) -> ConfigResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(layer = %kind, path = %path.display(), "Config file not found, using empty layer");
                let mut layer = Self::empty(kind);
                layer.origin = Some(path.to_path_buf());
                return Ok(layer);
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut layer = Self::from_yaml_str(kind, &content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                layer: format!("{} ({})", kind, path.display()),
                message,
            },
            other => other,
        })?;
        layer.origin = Some(path.to_path_buf());
        debug!(layer = %kind, path = %path.display(), keys = layer.values.len(), "Loaded config layer");
        Ok(layer)
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn rank(&self) -> u8 {
        self.kind.rank()
    }

    /// File the layer was read from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Whether the source existed (false for a missing file).
    pub fn is_present(&self) -> bool {
        self.present
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }
}

/// Human-readable name of a value's shape, for error messages.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn is_blank_document(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_layer() {
        let temp = TempDir::new().unwrap();
        let layer = ConfigLayer::load_file(LayerKind::User, &temp.path().join("nope.yaml")).unwrap();
        assert!(!layer.is_present());
        assert!(layer.values().is_empty());
        assert_eq!(layer.rank(), 1);
    }

    #[test]
    fn test_blank_and_comment_only_files_are_empty() {
        for content in ["", "\n\n", "# only a comment\n", "---\n"] {
            let layer = ConfigLayer::from_yaml_str(LayerKind::Local, content).unwrap();
            assert!(layer.values().is_empty(), "content {:?}", content);
        }
    }

    #[test]
    fn test_sequence_root_is_rejected() {
        let err = ConfigLayer::from_yaml_str(LayerKind::Local, "- a\n- b\n").unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { found: "sequence", .. }));
    }

    #[test]
    fn test_scalar_root_is_rejected() {
        let err = ConfigLayer::new(LayerKind::User, json!("text")).unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { found: "string", .. }));
    }

    #[test]
    fn test_malformed_yaml_names_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.yaml");
        std::fs::write(&path, "chat: [unclosed\n").unwrap();
        let err = ConfigLayer::load_file(LayerKind::User, &path).unwrap_err();
        match err {
            ConfigError::Parse { layer, .. } => assert!(layer.contains("settings.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_yaml_null_values_are_kept_in_layer() {
        let layer = ConfigLayer::from_yaml_str(LayerKind::Local, "mcpServers:\n  x: null\n").unwrap();
        assert_eq!(layer.values()["mcpServers"], json!({"x": null}));
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let layer = ConfigLayer::defaults().unwrap();
        assert_eq!(layer.kind(), LayerKind::Defaults);
        assert!(layer.values().contains_key("chat"));
        assert!(layer.values().contains_key("repositories"));
    }
}
