//! Configuration merge system
//!
//! Builds the run configuration from ordered layers:
//! 1. Built-in defaults
//! 2. Project settings (`<root>/build-settings.json`)
//! 3. Extra settings files given on the command line

mod defaults;
mod layers;
mod merge;
mod settings;

use std::path::PathBuf;

pub use defaults::BuiltinDefaults;
pub use layers::{absolute_from, load_json_file, ConfigSource, LayeredConfig, SETTINGS_FILE_NAME};
pub use merge::{merge, merge_layers};
pub use settings::{by_platform, host_platform, BuildSettings, ToolchainSpec, DEFAULT_PLATFORM_KEY};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}
