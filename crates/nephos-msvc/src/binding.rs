//! Binding a selected toolset to a target architecture.

use std::path::PathBuf;

use crate::discovery::MsvcInstallation;

/// A program plus arguments that prepares a shell for the compiler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// An installation paired with the architecture a build cell targets
#[derive(Debug, Clone)]
pub struct MsvcBinding {
    installation: MsvcInstallation,
    arch: String,
}

impl MsvcBinding {
    pub fn new(installation: MsvcInstallation, arch: impl Into<String>) -> Self {
        Self {
            installation,
            arch: arch.into(),
        }
    }

    pub fn installation(&self) -> &MsvcInstallation {
        &self.installation
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn toolset(&self) -> &str {
        &self.installation.toolset
    }

    /// `vcvarsall.bat <arch> -vcvars_ver=<toolset>`
    pub fn setup_invocation(&self) -> SetupInvocation {
        SetupInvocation {
            program: self.installation.vcvarsall.clone(),
            args: vec![
                self.arch.clone(),
                format!("-vcvars_ver={}", self.installation.toolset),
            ],
        }
    }

    /// The setup invocation as a shell prefix, script path quoted
    pub fn setup_command(&self) -> String {
        format!(
            "\"{}\" {} -vcvars_ver={}",
            self.installation.vcvarsall.display(),
            self.arch,
            self.installation.toolset
        )
    }
}

impl std::fmt::Display for MsvcBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<MSVC toolset={};arch={}>", self.installation.toolset, self.arch)
    }
}
