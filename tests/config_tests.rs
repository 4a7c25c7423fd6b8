//! Integration tests for configuration resolution.
//!
//! Layers are written to temporary files and loaded through the public loader,
//! so precedence, deletion and path expansion are checked end to end.

use jobcraft::config::{
    ConfigLayer, ConfigLoader, ConfigPaths, ConfigView, LayerKind, PathResolver, RepositorySettings,
    deep_merge_all, global, init_global, merge_layers, resolve,
};
use jobcraft::error::ConfigError;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn layer(kind: LayerKind, value: Value) -> ConfigLayer {
    ConfigLayer::new(kind, value).expect("layer must be a mapping")
}

fn resolver_in(dir: &Path) -> PathResolver {
    PathResolver::new(Some(dir.join("home")), dir.to_path_buf())
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write config file");
    path
}

mod precedence_tests {
    use super::*;

    #[test]
    fn user_layer_overrides_default_model() {
        let layers = [
            layer(LayerKind::Defaults, json!({"chat": {"model": "gpt-4o-mini"}})),
            layer(LayerKind::User, json!({"chat": {"model": "gpt-4o"}})),
        ];
        let merged = Value::Object(merge_layers(&layers));
        assert_eq!(merged["chat"]["model"], "gpt-4o");
    }

    #[test]
    fn local_null_removes_default_server() {
        let layers = [
            layer(
                LayerKind::Defaults,
                json!({"mcp": {"x": {"command": "npx", "args": ["-y", "srv"]}, "y": {"command": "uvx"}}}),
            ),
            layer(LayerKind::User, json!({"chat": {"model": "gpt-4o"}})),
            layer(LayerKind::Local, json!({"mcp": {"x": null}})),
        ];
        let merged = Value::Object(merge_layers(&layers));
        assert!(merged["mcp"].get("x").is_none());
        assert_eq!(merged["mcp"]["y"]["command"], "uvx");
    }

    #[test]
    fn null_wins_over_every_lower_layer() {
        let layers = [
            layer(LayerKind::Defaults, json!({"feature": {"enabled": true}})),
            layer(LayerKind::User, json!({"feature": {"enabled": true, "level": 3}})),
            layer(LayerKind::Local, json!({"feature": null})),
        ];
        let merged = merge_layers(&layers);
        assert!(!merged.contains_key("feature"));
    }

    #[test]
    fn scalars_and_lists_replace_mappings_merge() {
        let layers = [
            layer(
                LayerKind::Defaults,
                json!({"args": ["a", "b", "c"], "n": 1, "nested": {"keep": 1, "swap": 2}}),
            ),
            layer(LayerKind::User, json!({"args": ["z"], "n": 2, "nested": {"swap": 3}})),
        ];
        let merged = Value::Object(merge_layers(&layers));
        assert_eq!(merged["args"], json!(["z"]));
        assert_eq!(merged["n"], 2);
        assert_eq!(merged["nested"], json!({"keep": 1, "swap": 3}));
    }

    #[test]
    fn merge_is_deterministic_across_runs() {
        let make = || {
            vec![
                json!({"b": {"y": 1, "x": [1, 2]}, "a": "first"}),
                json!({"b": {"z": null, "y": 2}, "c": true}),
                json!({"a": null}),
            ]
        };
        let first = serde_json::to_vec(&deep_merge_all(make()).unwrap()).unwrap();
        let second = serde_json::to_vec(&deep_merge_all(make()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_mapping_layer_is_config_error() {
        let err = ConfigLayer::new(LayerKind::User, json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { .. }));
    }
}

mod loader_tests {
    use super::*;

    #[test]
    fn files_merge_in_precedence_order() {
        let temp = TempDir::new().unwrap();
        let user = write(
            temp.path(),
            "settings.yaml",
            "chat:\n  model: gpt-4o\nmcpServers:\n  search:\n    command: npx\n",
        );
        let local = write(
            temp.path(),
            "settings.local.yaml",
            "chat:\n  temperature: 0.1\nmcpServers:\n  fetch: null\n",
        );

        let loader = ConfigLoader::load_with(
            ConfigPaths::with_files(Some(user), Some(local)),
            &resolver_in(temp.path()),
        )
        .unwrap();
        let view = loader.view();

        assert_eq!(view.get_str("chat.model"), Some("gpt-4o"));
        assert_eq!(view.get("chat.temperature", 0.0), json!(0.1));
        assert!(view.get_value("mcpServers.fetch").is_none());
        assert_eq!(view.get_str("mcpServers.search.command"), Some("npx"));
    }

    #[test]
    fn explicit_file_is_highest_layer() {
        let temp = TempDir::new().unwrap();
        let local = write(temp.path(), "local.yaml", "chat:\n  model: local-model\n");
        let explicit = write(temp.path(), "explicit.yaml", "chat:\n  model: cli-model\n");

        let paths = ConfigPaths::with_files(None, Some(local)).with_explicit(explicit);
        let loader = ConfigLoader::load_with(paths, &resolver_in(temp.path())).unwrap();

        assert_eq!(loader.view().get_str("chat.model"), Some("cli-model"));
        let kinds: Vec<_> = loader.layers().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, vec![LayerKind::Defaults, LayerKind::Local, LayerKind::Explicit]);
    }

    #[test]
    fn malformed_user_file_fails_startup() {
        let temp = TempDir::new().unwrap();
        let user = write(temp.path(), "settings.yaml", "- just\n- a list\n");

        let err = ConfigLoader::load_with(
            ConfigPaths::with_files(Some(user), None),
            &resolver_in(temp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotAMapping { found: "sequence", .. }));
    }

    #[test]
    fn path_composed_across_layers_expands_once() {
        let temp = TempDir::new().unwrap();
        let user = write(
            temp.path(),
            "settings.yaml",
            "repositories:\n  filesystem:\n    data_dir: relative/store\n",
        );

        let loader = ConfigLoader::load_with(
            ConfigPaths::with_files(Some(user), None),
            &resolver_in(temp.path()),
        )
        .unwrap();
        let settings = RepositorySettings::from_view(loader.view()).unwrap();

        assert_eq!(settings.data_dir, temp.path().join("relative").join("store"));
        assert_eq!(settings.max_identifier_attempts, 100);
    }

    #[test]
    fn default_paths_expand_to_home() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::load_with(
            ConfigPaths::with_files(None, None),
            &resolver_in(temp.path()),
        )
        .unwrap();
        let home = temp.path().join("home");

        let data_dir = loader.view().get_str("repositories.filesystem.data_dir").unwrap();
        assert_eq!(Path::new(data_dir), home.join(".jobcraft").join("data"));
        assert_eq!(loader.view().get_str("mcpServers.fetch.command"), Some("uvx"));
    }
}

mod view_tests {
    use super::*;

    #[test]
    fn resolve_then_reexpand_is_stable() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(temp.path());
        let layers = [layer(
            LayerKind::User,
            json!({"markdown_writer": {"output_dir": "~/md"}}),
        )];

        let once = resolve(&layers, &resolver);
        let again = resolve(
            &[layer(LayerKind::User, once.dump().clone())],
            &resolver,
        );
        assert_eq!(once, again);
    }

    #[test]
    fn dump_round_trips_through_yaml() {
        let view = match json!({"chat": {"model": "gpt-4o"}, "list": [1, 2]}) {
            Value::Object(map) => ConfigView::new(map),
            _ => unreachable!(),
        };
        let yaml = view.to_yaml().unwrap();
        let parsed = ConfigLayer::from_yaml_str(LayerKind::Explicit, &yaml).unwrap();
        assert_eq!(&Value::Object(parsed.values().clone()), view.dump());
    }

    #[test]
    fn global_is_set_exactly_once() {
        let first = match json!({"chat": {"model": "a"}}) {
            Value::Object(map) => ConfigView::new(map),
            _ => unreachable!(),
        };
        let second = first.clone();

        let installed = init_global(first).unwrap();
        assert_eq!(installed.get_str("chat.model"), Some("a"));
        assert!(matches!(init_global(second), Err(ConfigError::AlreadyInitialized)));
        assert_eq!(global().and_then(|v| v.get_str("chat.model")), Some("a"));
    }
}
