//! Discovery and selection of installed MSVC toolsets.
//!
//! Visual Studio installs are found by probing a fixed set of
//! (version, edition) pairs under an installation root. Every toolset
//! directory below `VC/Tools/MSVC` becomes a selectable toolset, and a
//! selected installation is bound to a target architecture to produce the
//! `vcvarsall.bat` invocation that prepares a build shell.

mod binding;
mod discovery;
mod version;

pub use binding::{MsvcBinding, SetupInvocation};
pub use discovery::{
    is_toolset_dir_name, MsvcInstallation, MsvcRegistry, VS_EDITIONS, VS_VERSIONS,
};
pub use version::compare_versions;

/// Errors raised while selecting an MSVC toolset.
#[derive(Debug, thiserror::Error)]
pub enum MsvcError {
    /// No discovered toolset starts with the requested prefix
    #[error("toolset '{requested}' not found")]
    NotFound { requested: String },
}
