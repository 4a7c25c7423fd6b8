//! Immutable, resolved configuration snapshot.

use crate::error::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<ConfigView> = OnceLock::new();

/// Read-only view over the merged, path-expanded configuration tree.
///
/// Cloning is cheap; all clones share the same tree. There is no mutation API.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigView {
    root: Arc<Value>,
}

impl ConfigView {
    pub fn new(tree: Map<String, Value>) -> Self {
        Self {
            root: Arc::new(Value::Object(tree)),
        }
    }

    /// Look up a dotted path such as `chat.model`. Numeric segments index into
    /// sequences. An empty path returns the root.
    pub fn get_value(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }
        path.split('.').try_fold(self.root.as_ref(), |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Value at `path`, or `default` when any segment is absent.
    pub fn get(&self, path: &str, default: impl Into<Value>) -> Value {
        self.get_value(path)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    /// String at `path`, if present and a string.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get_value(path).and_then(Value::as_str)
    }

    /// Typed read. Absent paths give `Ok(None)`; present values that do not
    /// deserialize as `T` are a configuration error naming the path.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> ConfigResult<Option<T>> {
        match self.get_value(path) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::invalid(path, e.to_string())),
        }
    }

    /// Sub-view rooted at `path`, if it is a mapping.
    pub fn section(&self, path: &str) -> Option<ConfigView> {
        match self.get_value(path)? {
            Value::Object(map) => Some(ConfigView::new(map.clone())),
            _ => None,
        }
    }

    /// The entire resolved tree.
    pub fn dump(&self) -> &Value {
        &self.root
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self.root.as_ref()).map_err(|e| ConfigError::invalid("", e.to_string()))
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        serde_json::to_string_pretty(self.root.as_ref())
            .map_err(|e| ConfigError::invalid("", e.to_string()))
    }
}

/// Install the process-wide configuration. Succeeds exactly once.
pub fn init_global(view: ConfigView) -> ConfigResult<&'static ConfigView> {
    GLOBAL.set(view).map_err(|_| ConfigError::AlreadyInitialized)?;
    GLOBAL.get().ok_or(ConfigError::AlreadyInitialized)
}

/// The process-wide configuration, if `init_global` has run.
pub fn global() -> Option<&'static ConfigView> {
    GLOBAL.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn view(value: Value) -> ConfigView {
        match value {
            Value::Object(map) => ConfigView::new(map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_get_nested_and_default() {
        let v = view(json!({"chat": {"model": "gpt-4o", "temperature": 0.7}}));
        assert_eq!(v.get("chat.model", "fallback"), json!("gpt-4o"));
        assert_eq!(v.get("chat.missing", "fallback"), json!("fallback"));
        assert_eq!(v.get("chat.model.deeper", 3), json!(3));
        assert_eq!(v.get_str("chat.model"), Some("gpt-4o"));
    }

    #[test]
    fn test_get_indexes_sequences() {
        let v = view(json!({"mcpServers": {"fetch": {"args": ["a", "b"]}}}));
        assert_eq!(v.get_str("mcpServers.fetch.args.1"), Some("b"));
        assert!(v.get_value("mcpServers.fetch.args.5").is_none());
    }

    #[test]
    fn test_get_as_typed() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Chat {
            model: String,
        }
        let v = view(json!({"chat": {"model": "gpt-4o"}, "n": "not-a-number"}));
        assert_eq!(
            v.get_as::<Chat>("chat").unwrap(),
            Some(Chat {
                model: "gpt-4o".into()
            })
        );
        assert_eq!(v.get_as::<u32>("absent").unwrap(), None);
        let err = v.get_as::<u32>("n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref path, .. } if path == "n"));
    }

    #[test]
    fn test_section() {
        let v = view(json!({"crews": {"cv_analysis": {"agents": {"a": {"model": "m"}}}}}));
        let section = v.section("crews.cv_analysis").unwrap();
        assert_eq!(section.get_str("agents.a.model"), Some("m"));
        assert!(v.section("crews.cv_analysis.agents.a.model").is_none());
    }

    #[test]
    fn test_dump_returns_whole_tree() {
        let tree = json!({"a": {"b": [1, 2]}});
        let v = view(tree.clone());
        assert_eq!(v.dump(), &tree);
        assert_eq!(v.get_value(""), Some(&tree));
        assert!(v.to_yaml().unwrap().contains("b:"));
    }
}
