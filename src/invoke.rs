//! Commands handed to the external build scripts
//!
//! A `CellCommand` is a structured description (setup step, script, working
//! directory, environment overrides). Quoting happens only when it is
//! rendered into a shell line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use nephos_msvc::SetupInvocation;

use crate::cell::CellSettings;

/// Shell used to run scripts, exported to every script
pub const ENV_SH_PATH: &str = "SH_PATH";

/// Source directory of the target being built
pub const ENV_SRC_DIR: &str = "SRC_DIR";

/// Build directory of the cell being built
pub const ENV_BUILD_DIR: &str = "BUILD_DIR";

/// Per-cell script steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Configure,
    Build,
    Install,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Configure => "configure",
            Step::Build => "build",
            Step::Install => "install",
        }
    }

    /// Script configured for this step, relative to the target source dir
    pub fn script<'a>(&self, settings: &'a CellSettings) -> &'a str {
        match self {
            Step::Configure => &settings.configure,
            Step::Build => &settings.build,
            Step::Install => &settings.install,
        }
    }

    pub fn progress(&self) -> &'static str {
        match self {
            Step::Configure => "configuring...",
            Step::Build => "building...",
            Step::Install => "installing...",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Program always quoted, arguments only when they need it
    fn shell_words(&self) -> String {
        let mut words = vec![format!("\"{}\"", self.program.display())];
        words.extend(self.args.iter().map(|arg| quote_arg(arg)));
        words.join(" ")
    }
}

impl From<SetupInvocation> for Invocation {
    fn from(setup: SetupInvocation) -> Self {
        Self {
            program: setup.program,
            args: setup.args,
        }
    }
}

/// Quote `arg` when it is empty or holds whitespace.
///
/// Words never contain `"`: `CellCommand::check_words` rejects them, as
/// `cmd.exe` has no escape for a quote inside a quoted word.
fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// One script run for one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellCommand {
    pub step: Step,

    /// Environment setup run first in the same shell
    pub setup: Option<Invocation>,

    pub script: Invocation,

    /// Working directory (the cell build dir)
    pub cwd: PathBuf,

    /// Variables set on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl CellCommand {
    pub fn new(step: Step, script: Invocation, cwd: impl Into<PathBuf>) -> Self {
        Self {
            step,
            setup: None,
            script,
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn with_setup(mut self, setup: impl Into<Invocation>) -> Self {
        self.setup = Some(setup.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Reject words that cannot be quoted for the host shell
    pub fn check_words(&self) -> Result<(), InvokeError> {
        let words = self
            .setup
            .iter()
            .chain(std::iter::once(&self.script))
            .flat_map(|invocation| {
                std::iter::once(invocation.program.to_string_lossy().to_string())
                    .chain(invocation.args.iter().cloned())
            });
        for word in words {
            if word.contains('"') {
                return Err(InvokeError::EmbeddedQuote {
                    step: self.step,
                    word,
                });
            }
        }
        Ok(())
    }

    /// `<setup> && "<script>" <args...>`
    pub fn shell_line(&self) -> String {
        match &self.setup {
            Some(setup) => format!("{} && {}", setup.shell_words(), self.script.shell_words()),
            None => self.script.shell_words(),
        }
    }
}

/// Invocation errors
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("{step} could not be started: {source}")]
    Spawn {
        step: Step,
        #[source]
        source: io::Error,
    },

    #[error("{step}: cannot quote '{word}' (contains '\"')")]
    EmbeddedQuote { step: Step, word: String },

    #[error("{step} failed with exit code {}", describe_code(.code))]
    Failed { step: Step, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "none (terminated by signal)".to_string(),
    }
}

/// Runs cell commands; implemented by the process runner and by test doubles
pub trait Invoker {
    /// Run `command` to completion
    fn invoke(&mut self, command: &CellCommand) -> Result<(), InvokeError>;
}

/// Runs commands through the host shell, blocking until they exit
#[derive(Debug, Default)]
pub struct ProcessInvoker;

impl Invoker for ProcessInvoker {
    fn invoke(&mut self, command: &CellCommand) -> Result<(), InvokeError> {
        command.check_words()?;
        let mut process = host_shell(&command.shell_line());
        process.current_dir(&command.cwd);
        for (key, value) in &command.env {
            process.env(key, value);
        }

        let status = process.status().map_err(|source| InvokeError::Spawn {
            step: command.step,
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(InvokeError::Failed {
                step: command.step,
                code: status.code(),
            })
        }
    }
}

/// `cmd.exe` switches and the raw command argument for `line`.
///
/// With `/S` cmd strips exactly the outer pair of quotes and runs the rest
/// verbatim, whatever quotes, `&&` or parentheses the line holds.
#[cfg_attr(not(windows), allow(dead_code))]
fn cmd_arguments(line: &str) -> ([&'static str; 2], String) {
    (["/S", "/C"], format!("\"{}\"", line))
}

#[cfg(windows)]
fn host_shell(line: &str) -> Command {
    use std::os::windows::process::CommandExt;

    let (switches, raw) = cmd_arguments(line);
    let mut command = Command::new("cmd");
    command.args(switches).raw_arg(raw);
    command
}

#[cfg(not(windows))]
fn host_shell(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

/// Prints commands instead of running them
#[derive(Debug)]
pub struct PrintInvoker<W: Write> {
    out: W,
}

impl<W: Write> PrintInvoker<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Invoker for PrintInvoker<W> {
    fn invoke(&mut self, command: &CellCommand) -> Result<(), InvokeError> {
        command.check_words()?;
        writeln!(
            self.out,
            "[{}] (cd \"{}\") {}",
            command.step,
            command.cwd.display(),
            command.shell_line()
        )
        .map_err(|source| InvokeError::Spawn {
            step: command.step,
            source,
        })
    }
}
