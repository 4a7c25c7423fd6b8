//! Layered configuration.
//!
//! Consolidates configuration from ordered layers with field-by-field YAML merging:
//! 1. **Defaults** - Embedded at build time from `./config/defaults.yaml`
//! 2. **User** - `~/.jobcraft/settings.yaml`
//! 3. **Local** - `$CWD/settings.local.yaml`
//! 4. **Explicit** - `--config <file>` on the command line
//!
//! ## Merge Strategy
//! - Mappings merge key by key; everything else is replaced by the higher layer
//! - An explicit `null` removes the key, even if no later layer mentions it
//! - Path-like keys are expanded once, after the merge
//!
//! ## Environment Variables
//! - `JOBCRAFT_USER_CONFIG` - User settings file
//! - `JOBCRAFT_LOCAL_CONFIG` - Local override file

mod layer;
mod loader;
mod merge;
mod paths;
mod settings;
mod view;

pub use layer::{ConfigLayer, LayerKind};
pub use loader::{ConfigLoader, ConfigPaths, LOCAL_CONFIG_ENV, USER_CONFIG_ENV, resolve};
pub use merge::{deep_merge, deep_merge_all, merge_layers};
pub use paths::{PathKey, PathKind, PathResolver, default_path_keys};
pub use settings::{ChatSettings, RepositorySettings};
pub use view::{ConfigView, global, init_global};
