//! Built-in defaults (first configuration layer)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Source root, relative to the project root (default: "src")
    pub src_dir: String,

    /// Build root, relative to the project root (default: "build")
    pub build_dir: String,

    /// Distribution root, relative to the project root (default: "dist")
    pub dist_dir: String,

    /// MinGW install used to locate `sh.exe` on Windows (default: "C:\MinGW")
    pub mingw_dir: String,

    /// Platforms built by a Windows host (default: win32, win64)
    pub win32_platforms: Vec<String>,

    /// Toolchain available on Windows hosts (default: "msvc141")
    pub msvc_toolchain: String,

    /// Toolset prefix requested for that toolchain (default: "14.1")
    pub msvc_toolset: String,

    /// Build configurations (default: Debug, Release)
    pub configs: Vec<String>,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            src_dir: "src".to_string(),
            build_dir: "build".to_string(),
            dist_dir: "dist".to_string(),
            mingw_dir: "C:\\MinGW".to_string(),
            win32_platforms: vec!["win32".to_string(), "win64".to_string()],
            msvc_toolchain: "msvc141".to_string(),
            msvc_toolset: "14.1".to_string(),
            configs: vec!["Debug".to_string(), "Release".to_string()],
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        let mut toolchain = serde_json::Map::new();
        toolchain.insert(
            self.msvc_toolchain.clone(),
            serde_json::json!({
                "toolset": self.msvc_toolset,
                "arch": {
                    "win32": "x86",
                    "win64": "x64"
                }
            }),
        );

        serde_json::json!({
            "src_dir": self.src_dir,
            "build_dir": self.build_dir,
            "dist_dir": self.dist_dir,
            "mingw_dir": self.mingw_dir,
            "platforms": {
                "win32": self.win32_platforms
            },
            "toolchains": {
                "win32": toolchain
            },
            "configs": self.configs,
            "targets": []
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.src_dir, "src");
        assert_eq!(defaults.build_dir, "build");
        assert_eq!(defaults.dist_dir, "dist");
        assert_eq!(defaults.win32_platforms, vec!["win32", "win64"]);
        assert_eq!(defaults.configs, vec!["Debug", "Release"]);
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["build_dir"], "build");
        assert_eq!(value["platforms"]["win32"][1], "win64");
        assert_eq!(value["toolchains"]["win32"]["msvc141"]["toolset"], "14.1");
        assert_eq!(value["toolchains"]["win32"]["msvc141"]["arch"]["win64"], "x64");
        assert!(value["targets"].as_array().unwrap().is_empty());
    }
}
