//! Nephos Build - native build matrix driver
//!
//! This crate builds native third-party targets for every combination of
//! platform, toolchain and configuration the host supports. Settings come
//! from layered `build-settings.json` files; each target may narrow them in
//! its own settings file. Toolchains are bound to installed compiler
//! toolsets (MSVC through `nephos-msvc`) and every cell runs the target's
//! configure, build and install scripts in order.

pub mod alias;
pub mod cell;
pub mod config;
pub mod invoke;
pub mod matrix;
pub mod pipeline;
pub mod shell;
pub mod summary;
pub mod toolchain;

pub use alias::AliasTable;
pub use cell::{CellError, CellSettings, TargetOverrides};
pub use config::{merge, BuildSettings, ConfigError, LayeredConfig};
pub use invoke::{CellCommand, Invoker, PrintInvoker, ProcessInvoker, Step};
pub use matrix::{BuildAxes, CellKey, MatrixError, Selection};
pub use pipeline::{Pipeline, RunError, RunOptions, Steps};
pub use summary::{CellReport, CellStatus, RunReport};
pub use toolchain::{ResolveError, ToolchainBinding, ToolchainResolver};
