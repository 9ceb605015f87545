//! Nephos Build CLI
//!
//! Entry point for the `nephos-build` command-line tool.

use clap::Parser;
use nephos_build::config::{absolute_from, host_platform, BuildSettings, LayeredConfig};
use nephos_build::matrix::{BuildAxes, Selection};
use nephos_build::pipeline::{Pipeline, RunError, RunOptions, Steps};
use nephos_build::shell::{resolve_sh_path, ShellOptions};
use nephos_build::summary::RunReport;
use nephos_build::toolchain::{default_vs_root, ToolchainResolver};
use nephos_build::{PrintInvoker, ProcessInvoker};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Forces debug logging when set to a non-zero integer
const DEBUG_ENV_VAR: &str = "NEPHOS_DEBUG";

#[derive(Parser)]
#[command(name = "nephos-build")]
#[command(about = "Build native targets for every platform, toolchain and config", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Project root holding build-settings.json (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Extra settings file merged after the project settings (repeatable)
    #[arg(long = "settings-file")]
    settings_files: Vec<PathBuf>,

    /// Source directory holding one directory per target
    #[arg(long, short = 's')]
    src_dir: Option<PathBuf>,

    /// Build root
    #[arg(long, short = 'b')]
    build_dir: Option<PathBuf>,

    /// Distribution root
    #[arg(long, short = 'd')]
    dist_dir: Option<PathBuf>,

    /// MinGW install directory (must exist)
    #[arg(long)]
    mingw_dir: Option<PathBuf>,

    /// Shell exported to build scripts as SH_PATH
    #[arg(long)]
    sh: Option<PathBuf>,

    /// Root of the Visual Studio installations (default: %ProgramFiles(x86)%)
    #[arg(long)]
    vs_root: Option<PathBuf>,

    /// Platform to build (repeatable; default: all)
    #[arg(long = "platform", short = 'p')]
    platforms: Vec<String>,

    /// Toolchain to build with (repeatable; default: all)
    #[arg(long = "toolchain")]
    toolchains: Vec<String>,

    /// Configuration to build (repeatable; default: all)
    #[arg(long = "config", short = 'c')]
    configs: Vec<String>,

    /// Target to build (repeatable; default: all)
    #[arg(long = "target", short = 't')]
    targets: Vec<String>,

    /// Run the configure step
    #[arg(long)]
    configure: bool,

    /// Run the build step
    #[arg(long)]
    build: bool,

    /// Run the install step
    #[arg(long)]
    install: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Print the expanded build matrix and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(Some(report)) => println!("{}", report.human_summary()),
        Ok(None) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: u8) {
    let forced_debug = std::env::var(DEBUG_ENV_VAR)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|v| v != 0)
        .unwrap_or(false);

    let level = match verbose {
        0 if forced_debug => "debug",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<Option<RunReport>, RunError> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().map_err(RunError::WorkingDir)?,
    };
    let host = host_platform();
    debug!("host={} root={}", host, root.display());

    let layered = LayeredConfig::load(&root, &cli.settings_files)?;
    let mut settings = BuildSettings::from_tree(&layered.tree, host, &root)?;
    apply_path_overrides(&mut settings, &root, &cli.src_dir, &cli.build_dir, &cli.dist_dir);

    let selection = Selection {
        platforms: cli.platforms,
        toolchains: cli.toolchains,
        configs: cli.configs,
        targets: cli.targets,
    };

    if cli.list {
        for cell in BuildAxes::from_settings(&settings).expand(&selection)? {
            println!("{}", cell);
        }
        return Ok(None);
    }

    let resolver = ToolchainResolver::new(cli.vs_root.unwrap_or_else(default_vs_root));

    let mingw_required = cli.mingw_dir.is_some();
    let shell_options = ShellOptions {
        sh: cli.sh,
        mingw_dir: cli.mingw_dir.or_else(|| settings.mingw_dir.clone()),
        mingw_required,
    };
    let sh_path = resolve_sh_path(&shell_options, host)?;

    let options = RunOptions {
        selection,
        steps: Steps::from_flags(cli.configure, cli.build, cli.install),
        sh_path,
        dry_run: cli.dry_run,
    };

    let report = if cli.dry_run {
        Pipeline::new(&settings, &resolver, PrintInvoker::new(io::stdout()))
            .with_sources(layered.sources)
            .run(&options)?
    } else {
        Pipeline::new(&settings, &resolver, ProcessInvoker)
            .with_sources(layered.sources)
            .run(&options)?
    };

    Ok(Some(report))
}

fn apply_path_overrides(
    settings: &mut BuildSettings,
    root: &Path,
    src_dir: &Option<PathBuf>,
    build_dir: &Option<PathBuf>,
    dist_dir: &Option<PathBuf>,
) {
    if let Some(dir) = src_dir {
        settings.src_dir = absolute_from(root, dir);
    }
    if let Some(dir) = build_dir {
        settings.build_dir = absolute_from(root, dir);
    }
    if let Some(dir) = dist_dir {
        settings.dist_dir = absolute_from(root, dir);
    }
}
