//! Expansion of path-like configuration values.
//!
//! Runs once over the fully merged tree. Only values at declared keys are
//! touched; everything else passes through unchanged.
//! - `~` and `~/...` become the user's home directory
//! - relative directory values become absolute against the base directory
//! - command values keep bare names (`npx`) so `PATH` lookup still works

use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// How a path-like value is expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Home shorthand and relative paths are made absolute.
    Directory,
    /// Only home shorthand is expanded.
    Command,
}

/// A declared path-like key. `*` in the pattern matches exactly one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathKey {
    pub pattern: String,
    pub kind: PathKind,
}

impl PathKey {
    pub fn new(pattern: impl Into<String>, kind: PathKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
        }
    }

    fn matches(&self, path: &[String]) -> bool {
        let mut segments = self.pattern.split('.');
        for actual in path {
            match segments.next() {
                Some("*") => {}
                Some(expected) if expected == actual => {}
                _ => return false,
            }
        }
        segments.next().is_none()
    }
}

/// Keys holding filesystem paths in the application config.
pub fn default_path_keys() -> Vec<PathKey> {
    vec![
        PathKey::new("repositories.filesystem.data_dir", PathKind::Directory),
        PathKey::new("markdown_writer.output_dir", PathKind::Directory),
        PathKey::new("renderer.output_dir", PathKind::Directory),
        PathKey::new("renderer.templates_dir", PathKind::Directory),
        PathKey::new("knowledge_base.path", PathKind::Directory),
        PathKey::new("mcpServers.*.command", PathKind::Command),
        PathKey::new("mcpServers.*.args", PathKind::Command),
    ]
}

/// Expands home shorthand and relative paths at declared keys.
#[derive(Debug, Clone)]
pub struct PathResolver {
    home: Option<PathBuf>,
    base_dir: PathBuf,
    keys: Vec<PathKey>,
}

impl PathResolver {
    /// Create a resolver with an explicit home and base directory.
    pub fn new(home: Option<PathBuf>, base_dir: PathBuf) -> Self {
        Self {
            home,
            base_dir,
            keys: default_path_keys(),
        }
    }

    /// Resolver for the running process: real home, current working directory.
    pub fn discover() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(dirs::home_dir(), base_dir)
    }

    /// Replace the declared key set.
    pub fn with_keys(mut self, keys: Vec<PathKey>) -> Self {
        self.keys = keys;
        self
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    /// Expand every declared key in the tree, in place.
    pub fn expand_tree(&self, tree: &mut Map<String, Value>) {
        let mut path = Vec::new();
        for (key, value) in tree.iter_mut() {
            path.push(key.clone());
            self.visit(value, &mut path);
            path.pop();
        }
    }

    fn visit(&self, value: &mut Value, path: &mut Vec<String>) {
        if let Some(key) = self.keys.iter().find(|k| k.matches(path.as_slice())) {
            self.expand_value(value, key.kind, path);
            return;
        }
        if let Value::Object(map) = value {
            for (key, child) in map.iter_mut() {
                path.push(key.clone());
                self.visit(child, path);
                path.pop();
            }
        }
    }

    fn expand_value(&self, value: &mut Value, kind: PathKind, path: &[String]) {
        match value {
            Value::String(s) => {
                if let Some(expanded) = self.expand_str(s, kind) {
                    *s = expanded;
                } else if needs_home(s) {
                    warn!(key = %path.join("."), "No home directory available, leaving path unexpanded");
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    if let Value::String(s) = item
                        && let Some(expanded) = self.expand_str(s, PathKind::Command)
                    {
                        *s = expanded;
                    }
                }
            }
            _ => {}
        }
    }

    /// Expand a single value. Returns `None` when the value is left unchanged.
    pub fn expand_str(&self, value: &str, kind: PathKind) -> Option<String> {
        if value.is_empty() {
            return None;
        }

        let expanded = match self.expand_home(value) {
            Some(path) => path,
            None if needs_home(value) => return None,
            None => match kind {
                PathKind::Command => return None,
                PathKind::Directory => {
                    let path = Path::new(value);
                    if path.is_absolute() {
                        path.to_path_buf()
                    } else {
                        self.base_dir.join(path)
                    }
                }
            },
        };

        let normalized = normalize_path_components(&expanded)
            .to_string_lossy()
            .into_owned();
        (normalized != value).then_some(normalized)
    }

    fn expand_home(&self, value: &str) -> Option<PathBuf> {
        let home = self.home.as_ref()?;
        if value == "~" {
            return Some(home.clone());
        }
        value
            .strip_prefix("~/")
            .or_else(|| value.strip_prefix("~\\"))
            .map(|rest| home.join(rest))
    }
}

fn needs_home(value: &str) -> bool {
    value == "~" || value.starts_with("~/") || value.starts_with("~\\")
}

/// Normalize path components without requiring the file to exist.
/// Handles `.` and `..` components.
fn normalize_path_components(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => components.push(Component::Prefix(p)),
            Component::RootDir => components.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                } else {
                    components.push(Component::ParentDir);
                }
            }
            Component::Normal(name) => components.push(Component::Normal(name)),
        }
    }

    components.iter().collect()
}
