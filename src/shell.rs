//! Locating the POSIX shell exported to build scripts as `SH_PATH`

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Shell resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("sh not found ({0})")]
    NotFound(PathBuf),

    #[error("mingw dir not found ({0})")]
    MingwNotFound(PathBuf),
}

/// Inputs for shell resolution
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Explicit shell path (`--sh`)
    pub sh: Option<PathBuf>,

    /// MinGW root, used on Windows hosts
    pub mingw_dir: Option<PathBuf>,

    /// The MinGW root was given explicitly and must exist
    pub mingw_required: bool,
}

/// `sh.exe` inside a MinGW install
pub fn mingw_sh(mingw_dir: &Path) -> PathBuf {
    mingw_dir
        .join("msys")
        .join("1.0")
        .join("bin")
        .join("sh.exe")
}

/// Resolve the shell for `host`, probing `sh` on PATH as a last resort.
///
/// `Ok(None)` means no shell is available; scripts then see an empty `SH_PATH`.
pub fn resolve_sh_path(options: &ShellOptions, host: &str) -> Result<Option<PathBuf>, ShellError> {
    resolve_sh_path_with(options, host, sh_on_path)
}

/// Same as [`resolve_sh_path`] with an explicit PATH probe
pub fn resolve_sh_path_with(
    options: &ShellOptions,
    host: &str,
    probe: impl FnOnce() -> bool,
) -> Result<Option<PathBuf>, ShellError> {
    if let Some(sh) = &options.sh {
        if !sh.is_file() {
            return Err(ShellError::NotFound(sh.clone()));
        }
        debug!("sh_path={}", sh.display());
        return Ok(Some(sh.clone()));
    }

    if host == "win32" {
        if let Some(mingw_dir) = &options.mingw_dir {
            if mingw_dir.is_dir() {
                debug!("mingw_dir={}", mingw_dir.display());
                return Ok(Some(mingw_sh(mingw_dir)));
            }
            if options.mingw_required {
                return Err(ShellError::MingwNotFound(mingw_dir.clone()));
            }
            debug!("mingw dir {} not found, ignored", mingw_dir.display());
        }
    }

    if probe() {
        debug!("sh_path=sh");
        Ok(Some(PathBuf::from("sh")))
    } else {
        debug!("no sh available");
        Ok(None)
    }
}

fn sh_on_path() -> bool {
    Command::new("sh")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_sh_must_exist() {
        let options = ShellOptions {
            sh: Some(PathBuf::from("/definitely/not/here/sh")),
            ..Default::default()
        };
        let result = resolve_sh_path_with(&options, "linux", || true);
        assert!(matches!(result, Err(ShellError::NotFound(_))));
    }

    #[test]
    fn test_explicit_sh_wins() {
        let dir = TempDir::new().unwrap();
        let sh = dir.path().join("sh");
        fs::write(&sh, "").unwrap();
        let options = ShellOptions {
            sh: Some(sh.clone()),
            mingw_dir: Some(dir.path().to_path_buf()),
            mingw_required: true,
        };

        let resolved = resolve_sh_path_with(&options, "win32", || false).unwrap();
        assert_eq!(resolved, Some(sh));
    }

    #[test]
    fn test_mingw_layout_on_windows_host() {
        let dir = TempDir::new().unwrap();
        let options = ShellOptions {
            mingw_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let resolved = resolve_sh_path_with(&options, "win32", || false).unwrap();
        assert_eq!(resolved, Some(dir.path().join("msys/1.0/bin/sh.exe")));
    }

    #[test]
    fn test_mingw_ignored_on_other_hosts() {
        let dir = TempDir::new().unwrap();
        let options = ShellOptions {
            mingw_dir: Some(dir.path().to_path_buf()),
            mingw_required: true,
            ..Default::default()
        };

        let resolved = resolve_sh_path_with(&options, "linux", || true).unwrap();
        assert_eq!(resolved, Some(PathBuf::from("sh")));
    }

    #[test]
    fn test_missing_required_mingw() {
        let options = ShellOptions {
            mingw_dir: Some(PathBuf::from("/no/mingw/here")),
            mingw_required: true,
            ..Default::default()
        };
        let result = resolve_sh_path_with(&options, "win32", || true);
        assert!(matches!(result, Err(ShellError::MingwNotFound(_))));
    }

    #[test]
    fn test_missing_default_mingw_falls_back_to_probe() {
        let options = ShellOptions {
            mingw_dir: Some(PathBuf::from("/no/mingw/here")),
            ..Default::default()
        };
        assert_eq!(resolve_sh_path_with(&options, "win32", || false).unwrap(), None);
        assert_eq!(
            resolve_sh_path_with(&options, "win32", || true).unwrap(),
            Some(PathBuf::from("sh"))
        );
    }
}
