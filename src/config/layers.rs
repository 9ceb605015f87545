//! Layered loading of `build-settings.json` files with provenance
//!
//! Layer order: built-in defaults, `<root>/build-settings.json`, then every
//! extra settings file in the order given. Missing files are skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::defaults::BuiltinDefaults;
use super::merge::merge;
use super::ConfigError;

/// Settings file name, used both at the project root and inside each target
pub const SETTINGS_FILE_NAME: &str = "build-settings.json";

/// A settings file that contributed to the merged configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// File path
    pub path: String,

    /// SHA-256 digest of raw file bytes
    pub digest: String,
}

/// The merged configuration tree plus the files it came from
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged configuration object
    pub tree: Value,

    /// Contributing files in precedence order (built-in defaults not listed)
    pub sources: Vec<ConfigSource>,
}

impl LayeredConfig {
    /// Merge the built-in defaults, `<root>/build-settings.json` and `extra_files`.
    ///
    /// Relative extra files are resolved against `root`.
    pub fn load(root: &Path, extra_files: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut tree = BuiltinDefaults::default().to_value();
        let mut sources = Vec::new();

        let candidates = std::iter::once(root.join(SETTINGS_FILE_NAME))
            .chain(extra_files.iter().map(|file| absolute_from(root, file)));

        for path in candidates {
            match load_json_file(&path)? {
                Some((value, digest)) => {
                    debug!("merging {} (sha256 {})", path.display(), digest);
                    merge(&mut tree, &value);
                    sources.push(ConfigSource {
                        path: path.to_string_lossy().to_string(),
                        digest,
                    });
                }
                None => debug!("settings file {} not found, skipped", path.display()),
            }
        }

        Ok(Self { tree, sources })
    }
}

/// Read and parse a JSON file, returning the value and the digest of its bytes.
///
/// A missing file is `Ok(None)`; unreadable or malformed files are errors.
pub fn load_json_file(path: &Path) -> Result<Option<(Value, String)>, ConfigError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let value = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some((value, digest)))
}

/// `path` if absolute, otherwise `base/path`
pub fn absolute_from(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
