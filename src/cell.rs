//! Effective settings of a single build cell
//!
//! A target may ship its own `build-settings.json` next to its sources. The
//! file is narrowed by platform, then toolchain, then config (each lookup
//! alias-aware and applied to the result of the previous one) and merged
//! onto the cell defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::alias::AliasTable;
use crate::config::{load_json_file, merge, ConfigError, SETTINGS_FILE_NAME};
use crate::matrix::CellKey;

/// Cell-level errors
#[derive(Debug, thiserror::Error)]
pub enum CellError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{path}: override for '{key}' is not an object")]
    NotAnObject { path: PathBuf, key: String },

    #[error("{path}: invalid cell settings: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("target '{target}' requires shell=true")]
    ShellRequired { target: String },
}

/// Key reported when the whole override file is not an object
const ROOT_KEY: &str = "<root>";

/// Effective settings for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSettings {
    /// Skip this cell entirely
    pub disable: bool,

    /// Configure script, relative to the target source dir
    pub configure: String,

    /// Build script, relative to the target source dir
    pub build: String,

    /// Install script, relative to the target source dir
    pub install: String,

    /// Run scripts through the shell
    pub shell: bool,

    /// Target-specific keys passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CellSettings {
    fn default() -> Self {
        Self {
            disable: false,
            configure: "configure".to_string(),
            build: "build".to_string(),
            install: "install".to_string(),
            shell: true,
            extra: Map::new(),
        }
    }
}

impl CellSettings {
    fn default_value() -> Value {
        serde_json::json!({
            "disable": false,
            "configure": "configure",
            "build": "build",
            "install": "install",
            "shell": true
        })
    }
}

/// Contents of a target's own settings file
#[derive(Debug, Clone)]
pub struct TargetOverrides {
    path: PathBuf,
    tree: Value,
}

impl TargetOverrides {
    /// Load `<src_dir>/build-settings.json`; a missing file is an empty override set
    pub fn load(src_dir: &Path) -> Result<Self, CellError> {
        let path = src_dir.join(SETTINGS_FILE_NAME);
        let tree = load_json_file(&path)?
            .map(|(value, _)| value)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Self::from_value(path, tree)
    }

    pub fn from_value(path: impl Into<PathBuf>, tree: Value) -> Result<Self, CellError> {
        let path = path.into();
        if !tree.is_object() {
            return Err(CellError::NotAnObject {
                path,
                key: ROOT_KEY.to_string(),
            });
        }
        Ok(Self { path, tree })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings for `cell`: config beats toolchain beats platform beats defaults
    pub fn effective(&self, cell: &CellKey, aliases: &AliasTable) -> Result<CellSettings, CellError> {
        let mut current = &self.tree;
        let mut origin: &str = ROOT_KEY;
        for key in [&cell.platform, &cell.toolchain, &cell.config] {
            let map = self.object(current, origin)?;
            if let Some((found, value)) = aliases.lookup(map, key) {
                origin = found;
                current = value;
            }
        }
        self.object(current, origin)?;

        let mut merged = CellSettings::default_value();
        merge(&mut merged, current);

        serde_json::from_value(merged).map_err(|e| CellError::Invalid {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn object<'a>(&self, value: &'a Value, key: &str) -> Result<&'a Map<String, Value>, CellError> {
        value.as_object().ok_or_else(|| CellError::NotAnObject {
            path: self.path.clone(),
            key: key.to_string(),
        })
    }
}
