//! Filesystem discovery of Visual Studio C++ toolsets.
//!
//! Layout probed for every (version, edition) pair:
//!
//! ```text
//! <root>/Microsoft Visual Studio/<version>/<edition>/VC
//!     Auxiliary/Build/vcvarsall.bat
//!     Tools/MSVC/<toolset>/
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::version::compare_versions;
use crate::MsvcError;

/// Visual Studio releases probed, in discovery order.
pub const VS_VERSIONS: &[&str] = &["2019", "2017"];

/// Visual Studio editions probed for each release, in discovery order.
pub const VS_EDITIONS: &[&str] = &["BuildTools", "Community"];

/// Toolset directory names: three or more numeric components, trailing dot tolerated.
const TOOLSET_DIR_PATTERN: &str = r"^\d+\.\d+\.\d+(\.\d+)*\.?$";

/// One discovered toolset inside one Visual Studio install
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsvcInstallation {
    /// Toolset version (directory name under `VC/Tools/MSVC`)
    pub toolset: String,

    /// Visual Studio release (e.g. "2019")
    pub vs_version: String,

    /// Visual Studio edition (e.g. "BuildTools")
    pub vs_edition: String,

    /// The install's `VC` directory
    pub install_dir: PathBuf,

    /// Environment setup script
    pub vcvarsall: PathBuf,

    /// Directory holding all toolsets of this install
    pub toolset_dir: PathBuf,
}

/// All toolsets found under an installation root, grouped by toolset version.
///
/// Built once per run and then only read.
#[derive(Debug, Clone, Default)]
pub struct MsvcRegistry {
    installations: BTreeMap<String, Vec<MsvcInstallation>>,
}

/// Check whether a directory name looks like a toolset version.
pub fn is_toolset_dir_name(name: &str) -> bool {
    toolset_pattern().is_match(name)
}

fn toolset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TOOLSET_DIR_PATTERN).expect("constant toolset pattern"))
}

impl MsvcRegistry {
    /// Discover toolsets under `root` (usually `%ProgramFiles(x86)%`)
    pub fn discover(root: &Path) -> Self {
        Self::discover_with(root, VS_VERSIONS, VS_EDITIONS)
    }

    /// Discover toolsets for an explicit set of releases and editions
    pub fn discover_with(root: &Path, versions: &[&str], editions: &[&str]) -> Self {
        let pattern = toolset_pattern();
        let mut registry = Self::default();

        for vs_version in versions {
            for vs_edition in editions {
                debug!("checking {}({}) ...", vs_version, vs_edition);
                let install_dir = root
                    .join("Microsoft Visual Studio")
                    .join(vs_version)
                    .join(vs_edition)
                    .join("VC");
                if !install_dir.is_dir() {
                    continue;
                }
                debug!("install found: {}", install_dir.display());

                let vcvarsall = install_dir
                    .join("Auxiliary")
                    .join("Build")
                    .join("vcvarsall.bat");
                if !vcvarsall.is_file() {
                    debug!("vcvarsall.bat not found: {}", vcvarsall.display());
                    continue;
                }

                let toolset_dir = install_dir.join("Tools").join("MSVC");
                let entries = WalkDir::new(&toolset_dir)
                    .min_depth(1)
                    .max_depth(1)
                    .sort_by_file_name();

                for entry in entries {
                    let entry = match entry {
                        Ok(entry) => entry,
                        Err(e) => {
                            debug!("cannot read {}: {}", toolset_dir.display(), e);
                            continue;
                        }
                    };
                    if !entry.file_type().is_dir() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy();
                    if !pattern.is_match(&name) {
                        debug!("{} is not a valid toolset dir", name);
                        continue;
                    }
                    debug!("found toolset: {}", name);

                    registry.insert(MsvcInstallation {
                        toolset: name.to_string(),
                        vs_version: vs_version.to_string(),
                        vs_edition: vs_edition.to_string(),
                        install_dir: install_dir.clone(),
                        vcvarsall: vcvarsall.clone(),
                        toolset_dir: toolset_dir.clone(),
                    });
                }
            }
        }

        registry
    }

    /// Build a registry from already known installations, keeping their order
    pub fn from_installations(installations: impl IntoIterator<Item = MsvcInstallation>) -> Self {
        let mut registry = Self::default();
        for installation in installations {
            registry.insert(installation);
        }
        registry
    }

    fn insert(&mut self, installation: MsvcInstallation) {
        self.installations
            .entry(installation.toolset.clone())
            .or_default()
            .push(installation);
    }

    /// Whether nothing was discovered
    pub fn is_empty(&self) -> bool {
        self.installations.is_empty()
    }

    /// All discovered toolset versions, highest first
    pub fn toolsets(&self) -> Vec<&str> {
        let mut toolsets: Vec<&str> = self.installations.keys().map(String::as_str).collect();
        toolsets.sort_by(|a, b| compare_versions(b, a));
        toolsets
    }

    /// Every installation providing exactly `toolset`, in discovery order
    pub fn installations(&self, toolset: &str) -> &[MsvcInstallation] {
        self.installations
            .get(toolset)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Select the highest toolset starting with `prefix` (any toolset if `None`).
    ///
    /// When several installs share the winning toolset, the first one
    /// discovered is returned.
    pub fn select(&self, prefix: Option<&str>) -> Result<&MsvcInstallation, MsvcError> {
        let prefix = prefix.unwrap_or("");
        self.installations
            .iter()
            .filter(|(toolset, _)| toolset.starts_with(prefix))
            .max_by(|(a, _), (b, _)| compare_versions(a, b))
            .and_then(|(_, installs)| installs.first())
            .ok_or_else(|| MsvcError::NotFound {
                requested: prefix.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fake_install(root: &Path, version: &str, edition: &str, toolsets: &[&str]) {
        let vc = root
            .join("Microsoft Visual Studio")
            .join(version)
            .join(edition)
            .join("VC");
        let build = vc.join("Auxiliary").join("Build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("vcvarsall.bat"), "@echo off\n").unwrap();
        for toolset in toolsets {
            fs::create_dir_all(vc.join("Tools").join("MSVC").join(toolset)).unwrap();
        }
    }

    fn installation(toolset: &str, vs_version: &str) -> MsvcInstallation {
        MsvcInstallation {
            toolset: toolset.to_string(),
            vs_version: vs_version.to_string(),
            vs_edition: "BuildTools".to_string(),
            install_dir: PathBuf::from("VC"),
            vcvarsall: PathBuf::from("VC/Auxiliary/Build/vcvarsall.bat"),
            toolset_dir: PathBuf::from("VC/Tools/MSVC"),
        }
    }

    #[test]
    fn test_toolset_dir_names() {
        assert!(is_toolset_dir_name("14.29.30037"));
        assert!(is_toolset_dir_name("14.16.27023.1"));
        assert!(is_toolset_dir_name("14.16.27023."));
        assert!(!is_toolset_dir_name("14.16"));
        assert!(!is_toolset_dir_name("v142"));
        assert!(!is_toolset_dir_name("14.16.x"));
        assert!(!is_toolset_dir_name(""));
    }

    #[test]
    fn test_discover_empty_root() {
        let dir = TempDir::new().unwrap();
        let registry = MsvcRegistry::discover(dir.path());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discover_skips_install_without_vcvarsall() {
        let dir = TempDir::new().unwrap();
        let vc = dir
            .path()
            .join("Microsoft Visual Studio/2019/Community/VC/Tools/MSVC/14.29.30037");
        fs::create_dir_all(vc).unwrap();

        let registry = MsvcRegistry::discover(dir.path());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discover_filters_toolset_dirs() {
        let dir = TempDir::new().unwrap();
        fake_install(dir.path(), "2019", "BuildTools", &["14.29.30037", "14.28.29910", "notes"]);
        let stray = dir
            .path()
            .join("Microsoft Visual Studio/2019/BuildTools/VC/Tools/MSVC/14.1.2");
        fs::write(stray, "not a directory").unwrap();

        let registry = MsvcRegistry::discover(dir.path());
        assert_eq!(registry.toolsets(), vec!["14.29.30037", "14.28.29910"]);

        let install = &registry.installations("14.29.30037")[0];
        assert_eq!(install.vs_version, "2019");
        assert_eq!(install.vs_edition, "BuildTools");
        assert!(install.vcvarsall.ends_with("Auxiliary/Build/vcvarsall.bat"));
    }

    #[test]
    fn test_shared_toolset_grouped_in_discovery_order() {
        let dir = TempDir::new().unwrap();
        fake_install(dir.path(), "2017", "Community", &["14.16.27023"]);
        fake_install(dir.path(), "2019", "Community", &["14.16.27023"]);
        fake_install(dir.path(), "2019", "BuildTools", &["14.16.27023"]);

        let registry = MsvcRegistry::discover(dir.path());
        let installs = registry.installations("14.16.27023");
        assert_eq!(installs.len(), 3);
        assert_eq!(installs[0].vs_version, "2019");
        assert_eq!(installs[0].vs_edition, "BuildTools");
        assert_eq!(installs[2].vs_version, "2017");

        let selected = registry.select(Some("14.16")).unwrap();
        assert_eq!(selected.vs_version, "2019");
        assert_eq!(selected.vs_edition, "BuildTools");
    }

    #[test]
    fn test_select_numeric_ordering() {
        let registry = MsvcRegistry::from_installations(vec![
            installation("14.9.5", "2017"),
            installation("14.16.2", "2017"),
            installation("14.2.1", "2019"),
        ]);

        assert_eq!(registry.select(Some("14")).unwrap().toolset, "14.16.2");
        assert_eq!(registry.select(None).unwrap().toolset, "14.16.2");
        assert_eq!(registry.select(Some("14.9")).unwrap().toolset, "14.9.5");
    }

    #[test]
    fn test_select_prefix_is_string_prefix() {
        let registry = MsvcRegistry::from_installations(vec![
            installation("14.16.27023", "2017"),
            installation("14.29.30037", "2019"),
        ]);

        // "14.1" also covers 14.16.x
        assert_eq!(registry.select(Some("14.1")).unwrap().toolset, "14.16.27023");
        assert_eq!(registry.select(Some("14.2")).unwrap().toolset, "14.29.30037");
    }

    #[test]
    fn test_select_not_found() {
        let registry = MsvcRegistry::from_installations(vec![installation("14.16.2", "2017")]);

        match registry.select(Some("15")) {
            Err(MsvcError::NotFound { requested }) => assert_eq!(requested, "15"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
        assert!(MsvcRegistry::default().select(None).is_err());
    }
}
