//! Build matrix expansion
//!
//! A run covers the cartesian product platform × toolchain × config × target.
//! Iteration order is significant: platform is outermost, target innermost,
//! and each axis keeps the order it was requested in.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::BuildSettings;

/// One of the four build dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Platform,
    Toolchain,
    Config,
    Target,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Platform => "platform",
            Axis::Toolchain => "toolchain",
            Axis::Config => "config",
            Axis::Target => "target",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matrix expansion errors
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// A requested value is not declared in the configuration
    #[error("unknown {axis} '{value}'")]
    UnknownValue { axis: Axis, value: String },

    /// Nothing to build along an axis
    #[error("no {0} to build")]
    EmptyAxis(Axis),
}

/// Coordinates of one build cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellKey {
    pub platform: String,
    pub toolchain: String,
    pub config: String,
    pub target: String,
}

impl CellKey {
    pub fn new(
        platform: impl Into<String>,
        toolchain: impl Into<String>,
        config: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            toolchain: toolchain.into(),
            config: config.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.platform, self.toolchain, self.config, self.target
        )
    }
}

/// Canonical axis values declared by the merged configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildAxes {
    pub platforms: Vec<String>,
    pub toolchains: Vec<String>,
    pub configs: Vec<String>,
    pub targets: Vec<String>,
}

/// Values requested for each axis; an empty list selects the whole axis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub platforms: Vec<String>,
    pub toolchains: Vec<String>,
    pub configs: Vec<String>,
    pub targets: Vec<String>,
}

impl BuildAxes {
    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self {
            platforms: settings.platforms.clone(),
            toolchains: settings.toolchain_names(),
            configs: settings.configs.clone(),
            targets: settings.targets.clone(),
        }
    }

    pub fn values(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Platform => &self.platforms,
            Axis::Toolchain => &self.toolchains,
            Axis::Config => &self.configs,
            Axis::Target => &self.targets,
        }
    }

    /// Validate `selection` against the declared axes and expand it.
    ///
    /// Every requested value is checked before any cell is produced, so an
    /// invalid request never yields a partial matrix.
    pub fn expand(&self, selection: &Selection) -> Result<Vec<CellKey>, MatrixError> {
        let requested = [
            (Axis::Platform, &selection.platforms),
            (Axis::Toolchain, &selection.toolchains),
            (Axis::Config, &selection.configs),
            (Axis::Target, &selection.targets),
        ];

        let mut chosen: Vec<Vec<String>> = Vec::with_capacity(requested.len());
        for (axis, values) in requested {
            chosen.push(self.choose(axis, values)?);
        }
        for (axis, values) in [Axis::Platform, Axis::Toolchain, Axis::Config, Axis::Target]
            .into_iter()
            .zip(&chosen)
        {
            if values.is_empty() {
                return Err(MatrixError::EmptyAxis(axis));
            }
        }

        Ok(cartesian(&chosen[0], &chosen[1], &chosen[2], &chosen[3]))
    }

    /// Requested values in order, first occurrence kept; the whole axis if none
    fn choose(&self, axis: Axis, requested: &[String]) -> Result<Vec<String>, MatrixError> {
        let canonical = self.values(axis);
        if requested.is_empty() {
            return Ok(canonical.to_vec());
        }

        let mut chosen: Vec<String> = Vec::with_capacity(requested.len());
        for value in requested {
            if !canonical.contains(value) {
                return Err(MatrixError::UnknownValue {
                    axis,
                    value: value.clone(),
                });
            }
            if !chosen.contains(value) {
                chosen.push(value.clone());
            }
        }
        Ok(chosen)
    }
}

/// Every (platform, toolchain, config, target) tuple, target varying fastest
pub fn cartesian(
    platforms: &[String],
    toolchains: &[String],
    configs: &[String],
    targets: &[String],
) -> Vec<CellKey> {
    let mut cells =
        Vec::with_capacity(platforms.len() * toolchains.len() * configs.len() * targets.len());
    for platform in platforms {
        for toolchain in toolchains {
            for config in configs {
                for target in targets {
                    cells.push(CellKey::new(platform, toolchain, config, target));
                }
            }
        }
    }
    cells
}
