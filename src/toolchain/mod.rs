//! Toolchain resolution for build cells
//!
//! Maps a cell's toolchain name to a compiler family and binds an installed
//! toolset to the cell's target architecture:
//! - `msvc*` names resolve through the MSVC registry
//! - Any other name fails with `UnknownFamily`
//! - No installed toolset matching the requested prefix fails the run

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};

use nephos_msvc::{MsvcBinding, MsvcError, MsvcRegistry, SetupInvocation};
use tracing::debug;

use crate::config::ToolchainSpec;
use crate::matrix::CellKey;

/// Environment variable holding the 32-bit program files directory on Windows
pub const PROGRAM_FILES_X86_VAR: &str = "ProgramFiles(x86)";

/// Compiler families that can be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFamily {
    Msvc,
}

impl ToolchainFamily {
    /// Family of a toolchain name, if it is one we can resolve
    pub fn of(toolchain: &str) -> Option<Self> {
        if toolchain.starts_with("msvc") {
            Some(ToolchainFamily::Msvc)
        } else {
            None
        }
    }
}

/// Toolchain resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Toolchain name does not belong to a supported family
    #[error("unknown toolchain '{0}'")]
    UnknownFamily(String),

    /// Toolchain has no settings entry
    #[error("toolchain '{0}' is not configured")]
    NotConfigured(String),

    /// Toolchain declares no architecture for the platform
    #[error("toolchain '{toolchain}' has no arch for platform '{platform}'")]
    NoArch { toolchain: String, platform: String },

    /// No installed toolset matches
    #[error("toolchain '{toolchain}': {source}")]
    Msvc {
        toolchain: String,
        #[source]
        source: MsvcError,
    },
}

/// A resolved toolchain, ready to prepare a build shell
#[derive(Debug, Clone)]
pub enum ToolchainBinding {
    Msvc(MsvcBinding),
}

impl ToolchainBinding {
    pub fn family(&self) -> ToolchainFamily {
        match self {
            ToolchainBinding::Msvc(_) => ToolchainFamily::Msvc,
        }
    }

    /// Exact toolset version that was selected
    pub fn toolset(&self) -> &str {
        match self {
            ToolchainBinding::Msvc(binding) => binding.toolset(),
        }
    }

    /// Environment setup step run before every script of the cell
    pub fn setup_invocation(&self) -> SetupInvocation {
        match self {
            ToolchainBinding::Msvc(binding) => binding.setup_invocation(),
        }
    }
}

impl fmt::Display for ToolchainBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainBinding::Msvc(binding) => fmt::Display::fmt(binding, f),
        }
    }
}

/// Resolves toolchains for cells, discovering installations on first use.
///
/// Discovery runs at most once per resolver; later lookups reuse the result.
#[derive(Debug)]
pub struct ToolchainResolver {
    vs_root: PathBuf,
    msvc: OnceCell<MsvcRegistry>,
}

impl ToolchainResolver {
    /// Resolver that scans `vs_root` for Visual Studio installs when first needed
    pub fn new(vs_root: impl Into<PathBuf>) -> Self {
        Self {
            vs_root: vs_root.into(),
            msvc: OnceCell::new(),
        }
    }

    /// Resolver over an already discovered registry
    pub fn with_registry(registry: MsvcRegistry) -> Self {
        Self {
            vs_root: PathBuf::new(),
            msvc: OnceCell::from(registry),
        }
    }

    pub fn vs_root(&self) -> &Path {
        &self.vs_root
    }

    /// The MSVC registry, discovered on first access
    pub fn msvc_registry(&self) -> &MsvcRegistry {
        self.msvc.get_or_init(|| {
            debug!("discovering MSVC installations under {}", self.vs_root.display());
            let registry = MsvcRegistry::discover(&self.vs_root);
            debug!("discovered toolsets: {:?}", registry.toolsets());
            registry
        })
    }

    /// Resolve the toolchain of `cell` using its settings entry
    pub fn resolve(
        &self,
        cell: &CellKey,
        spec: Option<&ToolchainSpec>,
    ) -> Result<ToolchainBinding, ResolveError> {
        let family = ToolchainFamily::of(&cell.toolchain)
            .ok_or_else(|| ResolveError::UnknownFamily(cell.toolchain.clone()))?;
        let spec = spec.ok_or_else(|| ResolveError::NotConfigured(cell.toolchain.clone()))?;

        let arch = spec
            .arch
            .get(&cell.platform)
            .ok_or_else(|| ResolveError::NoArch {
                toolchain: cell.toolchain.clone(),
                platform: cell.platform.clone(),
            })?;

        match family {
            ToolchainFamily::Msvc => {
                let installation = self
                    .msvc_registry()
                    .select(spec.toolset.as_deref())
                    .map_err(|source| ResolveError::Msvc {
                        toolchain: cell.toolchain.clone(),
                        source,
                    })?;
                Ok(ToolchainBinding::Msvc(MsvcBinding::new(
                    installation.clone(),
                    arch.clone(),
                )))
            }
        }
    }
}

/// Default Visual Studio installation root for this host
pub fn default_vs_root() -> PathBuf {
    std::env::var_os(PROGRAM_FILES_X86_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("C:\\Program Files (x86)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nephos_msvc::MsvcInstallation;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn installation(toolset: &str) -> MsvcInstallation {
        MsvcInstallation {
            toolset: toolset.to_string(),
            vs_version: "2019".to_string(),
            vs_edition: "BuildTools".to_string(),
            install_dir: PathBuf::from("/vs/VC"),
            vcvarsall: PathBuf::from("/vs/VC/Auxiliary/Build/vcvarsall.bat"),
            toolset_dir: PathBuf::from("/vs/VC/Tools/MSVC"),
        }
    }

    fn msvc_spec(toolset: Option<&str>) -> ToolchainSpec {
        let mut arch = BTreeMap::new();
        arch.insert("win32".to_string(), "x86".to_string());
        arch.insert("win64".to_string(), "x64".to_string());
        ToolchainSpec {
            toolset: toolset.map(str::to_string),
            arch,
        }
    }

    fn sample_resolver() -> ToolchainResolver {
        ToolchainResolver::with_registry(MsvcRegistry::from_installations(vec![
            installation("14.16.27023"),
            installation("14.29.30037"),
            installation("14.9.1"),
        ]))
    }

    #[test]
    fn test_family_of() {
        assert_eq!(ToolchainFamily::of("msvc141"), Some(ToolchainFamily::Msvc));
        assert_eq!(ToolchainFamily::of("gcc"), None);
    }

    #[test]
    fn test_resolve_msvc() {
        let resolver = sample_resolver();
        let cell = CellKey::new("win64", "msvc141", "Debug", "zlib");

        let binding = resolver.resolve(&cell, Some(&msvc_spec(Some("14.1")))).unwrap();

        assert_eq!(binding.family(), ToolchainFamily::Msvc);
        assert_eq!(binding.toolset(), "14.16.27023");
        let setup = binding.setup_invocation();
        assert_eq!(setup.args, vec!["x64", "-vcvars_ver=14.16.27023"]);
    }

    #[test]
    fn test_resolve_any_toolset() {
        let resolver = sample_resolver();
        let cell = CellKey::new("win32", "msvc142", "Debug", "zlib");

        let binding = resolver.resolve(&cell, Some(&msvc_spec(None))).unwrap();
        assert_eq!(binding.toolset(), "14.29.30037");
        assert_eq!(binding.to_string(), "<MSVC toolset=14.29.30037;arch=x86>");
    }

    #[test]
    fn test_unknown_family() {
        let resolver = sample_resolver();
        let cell = CellKey::new("win64", "mingw", "Debug", "zlib");

        let result = resolver.resolve(&cell, Some(&msvc_spec(None)));
        assert!(matches!(result, Err(ResolveError::UnknownFamily(name)) if name == "mingw"));
    }

    #[test]
    fn test_missing_arch() {
        let resolver = sample_resolver();
        let cell = CellKey::new("arm64", "msvc141", "Debug", "zlib");

        let result = resolver.resolve(&cell, Some(&msvc_spec(None)));
        assert!(matches!(result, Err(ResolveError::NoArch { .. })));
    }

    #[test]
    fn test_toolset_not_found() {
        let resolver = sample_resolver();
        let cell = CellKey::new("win64", "msvc143", "Debug", "zlib");

        let err = resolver.resolve(&cell, Some(&msvc_spec(Some("14.3")))).unwrap_err();
        assert_eq!(err.to_string(), "toolchain 'msvc143': toolset '14.3' not found");
    }

    #[test]
    fn test_discovery_runs_once() {
        let dir = TempDir::new().unwrap();
        let vc = dir.path().join("Microsoft Visual Studio/2017/Community/VC");
        fs::create_dir_all(vc.join("Auxiliary/Build")).unwrap();
        fs::write(vc.join("Auxiliary/Build/vcvarsall.bat"), "").unwrap();
        fs::create_dir_all(vc.join("Tools/MSVC/14.16.27023")).unwrap();

        let resolver = ToolchainResolver::new(dir.path());
        assert_eq!(resolver.msvc_registry().toolsets(), vec!["14.16.27023"]);

        // Installed after the first lookup: not seen by this resolver
        fs::create_dir_all(vc.join("Tools/MSVC/14.16.27024")).unwrap();
        let cell = CellKey::new("win32", "msvc141", "Debug", "zlib");
        let binding = resolver.resolve(&cell, Some(&msvc_spec(Some("14.1")))).unwrap();
        assert_eq!(binding.toolset(), "14.16.27023");
    }
}
