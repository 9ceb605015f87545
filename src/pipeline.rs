//! Pipeline orchestration
//!
//! Runs the build matrix strictly in order, one cell at a time:
//! - Expand and validate the requested matrix up front
//! - Load each target's override file and compute its effective settings
//! - Skip disabled cells, resolve the toolchain of the others
//! - Run configure, build and install for the cell before moving on
//!
//! Any error aborts the run; cells already built are left as they are.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::alias::AliasTable;
use crate::cell::{CellError, CellSettings, TargetOverrides};
use crate::config::{absolute_from, BuildSettings, ConfigError, ConfigSource};
use crate::invoke::{
    CellCommand, Invocation, InvokeError, Invoker, Step, ENV_BUILD_DIR, ENV_SH_PATH, ENV_SRC_DIR,
};
use crate::matrix::{BuildAxes, CellKey, MatrixError, Selection};
use crate::shell::ShellError;
use crate::summary::{CellReport, RunReport, REPORT_FILE_NAME};
use crate::toolchain::{ResolveError, ToolchainBinding, ToolchainResolver};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Matrix(#[from] MatrixError),

    #[error("{0}")]
    Cell(#[from] CellError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Shell(#[from] ShellError),

    #[error("{cell}: {source}")]
    Invoke {
        cell: CellKey,
        #[source]
        source: InvokeError,
    },

    #[error("cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read the working directory: {0}")]
    WorkingDir(#[source] io::Error),
}

impl RunError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) => 1,
            RunError::Cell(_) => 1,
            RunError::Shell(_) => 1,
            RunError::Matrix(_) => 2,
            RunError::Resolve(_) => 3,
            RunError::Invoke { source, .. } => match source {
                InvokeError::Failed {
                    code: Some(code), ..
                } if *code != 0 => *code,
                _ => 4,
            },
            RunError::Io { .. } => 5,
            RunError::WorkingDir(_) => 5,
        }
    }
}

/// Result type for pipeline operations
pub type RunResult<T> = Result<T, RunError>;

/// Which steps run for every cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Steps {
    pub configure: bool,
    pub build: bool,
    pub install: bool,
}

impl Default for Steps {
    fn default() -> Self {
        Self::from_flags(false, false, false)
    }
}

impl Steps {
    /// Steps from command-line switches; no switch at all enables every step
    pub fn from_flags(configure: bool, build: bool, install: bool) -> Self {
        if !configure && !build && !install {
            return Self {
                configure: true,
                build: true,
                install: true,
            };
        }
        Self {
            configure,
            build,
            install,
        }
    }

    /// Enabled steps in execution order
    pub fn enabled(&self) -> Vec<Step> {
        [
            (Step::Configure, self.configure),
            (Step::Build, self.build),
            (Step::Install, self.install),
        ]
        .into_iter()
        .filter_map(|(step, on)| on.then_some(step))
        .collect()
    }
}

/// Options for one run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Requested axis values
    pub selection: Selection,

    pub steps: Steps,

    /// Shell exported as `SH_PATH` (empty when none)
    pub sh_path: Option<PathBuf>,

    /// Do not create build dirs or write the report
    pub dry_run: bool,
}

/// Sequential build pipeline over the matrix
pub struct Pipeline<'a, I: Invoker> {
    settings: &'a BuildSettings,
    resolver: &'a ToolchainResolver,
    aliases: AliasTable,
    invoker: I,
    host: String,
    sources: Vec<ConfigSource>,
}

impl<'a, I: Invoker> Pipeline<'a, I> {
    pub fn new(settings: &'a BuildSettings, resolver: &'a ToolchainResolver, invoker: I) -> Self {
        Self {
            settings,
            resolver,
            aliases: AliasTable::default(),
            invoker,
            host: crate::config::host_platform().to_string(),
            sources: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasTable) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Settings files recorded in the run report
    pub fn with_sources(mut self, sources: Vec<ConfigSource>) -> Self {
        self.sources = sources;
        self
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn into_invoker(self) -> I {
        self.invoker
    }

    /// Validated matrix for `selection`, in execution order
    pub fn plan(&self, selection: &Selection) -> Result<Vec<CellKey>, MatrixError> {
        BuildAxes::from_settings(self.settings).expand(selection)
    }

    /// Source dir of a target
    pub fn src_dir(&self, target: &str) -> PathBuf {
        absolute_from(&self.settings.src_dir, Path::new(target))
    }

    /// Build dir of a cell: `<build_dir>/<platform>/<toolchain>/<config>/<target>`
    pub fn build_dir(&self, cell: &CellKey) -> PathBuf {
        self.settings
            .build_dir
            .join(&cell.platform)
            .join(&cell.toolchain)
            .join(&cell.config)
            .join(&cell.target)
    }

    /// Run every cell of the requested matrix
    pub fn run(&mut self, options: &RunOptions) -> RunResult<RunReport> {
        let cells = self.plan(&options.selection)?;
        let mut report = RunReport::new(self.host.clone(), self.sources.clone());

        let result = self.run_cells(&cells, options, &mut report);

        if !options.dry_run && !report.cells.is_empty() {
            let path = self.settings.build_dir.join(REPORT_FILE_NAME);
            let written = fs::create_dir_all(&self.settings.build_dir)
                .and_then(|_| report.write_to_file(&path));
            if let Err(e) = written {
                warn!("could not write {}: {}", path.display(), e);
            }
        }

        result.map(|_| report)
    }

    fn run_cells(
        &mut self,
        cells: &[CellKey],
        options: &RunOptions,
        report: &mut RunReport,
    ) -> RunResult<()> {
        for cell in cells {
            match self.run_cell(cell, options) {
                Ok(entry) => report.push(entry),
                Err(e) => {
                    report.push(CellReport::failed(cell.clone(), e.to_string()));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn run_cell(&mut self, cell: &CellKey, options: &RunOptions) -> RunResult<CellReport> {
        info!("{}", cell);

        let src_dir = self.src_dir(&cell.target);
        let overrides = TargetOverrides::load(&src_dir)?;
        let cell_settings = overrides.effective(cell, &self.aliases)?;

        if cell_settings.disable {
            info!(
                "target '{}' for {}/{}/{} disabled.",
                cell.target, cell.platform, cell.toolchain, cell.config
            );
            return Ok(CellReport::skipped(cell.clone()));
        }
        if !cell_settings.shell {
            return Err(CellError::ShellRequired {
                target: cell.target.clone(),
            }
            .into());
        }

        let binding = self
            .resolver
            .resolve(cell, self.settings.toolchain(&cell.toolchain))?;
        info!("{}", binding);

        let build_dir = self.build_dir(cell);
        if !options.dry_run {
            fs::create_dir_all(&build_dir).map_err(|source| RunError::Io {
                path: build_dir.clone(),
                source,
            })?;
        }

        let mut steps = Vec::new();
        for step in options.steps.enabled() {
            info!("{}", step.progress());
            let command = cell_command(
                step,
                cell,
                &cell_settings,
                &binding,
                &src_dir,
                &build_dir,
                options.sh_path.as_deref(),
            );
            self.invoker
                .invoke(&command)
                .map_err(|source| RunError::Invoke {
                    cell: cell.clone(),
                    source,
                })?;
            steps.push(step);
        }

        Ok(CellReport::built(cell.clone(), binding.toolset(), steps))
    }
}

/// The command for one step of one cell:
/// `<toolchain setup> && "<src_dir>/<script>" <platform> <toolchain> <config>`
pub fn cell_command(
    step: Step,
    cell: &CellKey,
    settings: &CellSettings,
    binding: &ToolchainBinding,
    src_dir: &Path,
    build_dir: &Path,
    sh_path: Option<&Path>,
) -> CellCommand {
    let script = Invocation::new(src_dir.join(step.script(settings)))
        .arg(&cell.platform)
        .arg(&cell.toolchain)
        .arg(&cell.config);
    let sh_path = sh_path
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();

    CellCommand::new(step, script, build_dir)
        .with_setup(binding.setup_invocation())
        .env(ENV_SH_PATH, sh_path)
        .env(ENV_SRC_DIR, src_dir.to_string_lossy())
        .env(ENV_BUILD_DIR, build_dir.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_default_to_all() {
        let steps = Steps::from_flags(false, false, false);
        assert_eq!(steps.enabled(), vec![Step::Configure, Step::Build, Step::Install]);
        assert_eq!(Steps::default(), steps);
    }

    #[test]
    fn test_steps_explicit() {
        assert_eq!(Steps::from_flags(false, true, false).enabled(), vec![Step::Build]);
        assert_eq!(
            Steps::from_flags(true, false, true).enabled(),
            vec![Step::Configure, Step::Install]
        );
    }

    #[test]
    fn test_exit_codes() {
        let cell = CellKey::new("win32", "msvc141", "Debug", "zlib");
        let failed = RunError::Invoke {
            cell: cell.clone(),
            source: InvokeError::Failed {
                step: Step::Build,
                code: Some(7),
            },
        };
        assert_eq!(failed.exit_code(), 7);

        let killed = RunError::Invoke {
            cell,
            source: InvokeError::Failed {
                step: Step::Build,
                code: None,
            },
        };
        assert_eq!(killed.exit_code(), 4);

        let unknown = RunError::Matrix(MatrixError::UnknownValue {
            axis: crate::matrix::Axis::Platform,
            value: "mac".to_string(),
        });
        assert_eq!(unknown.exit_code(), 2);
        assert_eq!(unknown.to_string(), "unknown platform 'mac'");

        let missing = RunError::Resolve(ResolveError::UnknownFamily("gcc".to_string()));
        assert_eq!(missing.exit_code(), 3);

        let cwd = RunError::WorkingDir(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(cwd.exit_code(), 5);
        assert_eq!(cwd.to_string(), "cannot read the working directory: gone");
    }
}
