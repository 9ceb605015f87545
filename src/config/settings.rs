//! Typed view over the merged configuration tree

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::layers::absolute_from;
use super::ConfigError;

/// Key used when a per-platform map has no entry for the host
pub const DEFAULT_PLATFORM_KEY: &str = "default";

/// Settings of one toolchain as declared under `toolchains.<host>.<name>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainSpec {
    /// Requested toolset version prefix (e.g. "14.1"); any toolset if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolset: Option<String>,

    /// Target architecture per build platform (e.g. win64 -> x64)
    #[serde(default)]
    pub arch: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    src_dir: PathBuf,
    build_dir: PathBuf,
    dist_dir: PathBuf,
    #[serde(default)]
    mingw_dir: Option<PathBuf>,
    #[serde(default)]
    platforms: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    toolchains: BTreeMap<String, BTreeMap<String, ToolchainSpec>>,
    #[serde(default)]
    configs: Vec<String>,
    #[serde(default)]
    targets: Vec<String>,
}

/// Build settings for the current host
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub src_dir: PathBuf,
    pub build_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub mingw_dir: Option<PathBuf>,

    /// Platforms the host can build, in declaration order
    pub platforms: Vec<String>,

    /// Toolchains the host can build with
    pub toolchains: BTreeMap<String, ToolchainSpec>,

    pub configs: Vec<String>,
    pub targets: Vec<String>,
}

/// Host platform name used to pick entries of per-platform maps
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "windows" => "win32",
        "macos" => "darwin",
        other => other,
    }
}

/// Value for `host`, falling back to the `"default"` entry
pub fn by_platform<'a, T>(map: &'a BTreeMap<String, T>, host: &str) -> Option<&'a T> {
    map.get(host).or_else(|| map.get(DEFAULT_PLATFORM_KEY))
}

impl BuildSettings {
    /// Interpret a merged tree for `host`, resolving relative dirs against `root`
    pub fn from_tree(tree: &Value, host: &str, root: &Path) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_value(tree.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            src_dir: absolute_from(root, &raw.src_dir),
            build_dir: absolute_from(root, &raw.build_dir),
            dist_dir: absolute_from(root, &raw.dist_dir),
            mingw_dir: raw.mingw_dir,
            platforms: by_platform(&raw.platforms, host).cloned().unwrap_or_default(),
            toolchains: by_platform(&raw.toolchains, host).cloned().unwrap_or_default(),
            configs: raw.configs,
            targets: raw.targets,
        })
    }

    pub fn toolchain(&self, name: &str) -> Option<&ToolchainSpec> {
        self.toolchains.get(name)
    }

    pub fn toolchain_names(&self) -> Vec<String> {
        self.toolchains.keys().cloned().collect()
    }
}
