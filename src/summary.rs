//! Run report (build-report.json)
//!
//! Written into the build root after every run that reached at least one
//! cell, including runs aborted by a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use crate::config::ConfigSource;
use crate::invoke::Step;
use crate::matrix::CellKey;

/// Schema version for build-report.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "nephos-build/report@1";

/// File name of the report inside the build root
pub const REPORT_FILE_NAME: &str = "build-report.json";

/// Outcome of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    Built,
    Skipped,
    Failed,
}

/// Report entry for one processed cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellReport {
    #[serde(flatten)]
    pub cell: CellKey,

    pub status: CellStatus,

    /// Selected toolset (absent for skipped cells)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolset: Option<String>,

    /// Steps that completed
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CellReport {
    pub fn built(cell: CellKey, toolset: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            cell,
            status: CellStatus::Built,
            toolset: Some(toolset.into()),
            steps,
            error: None,
        }
    }

    pub fn skipped(cell: CellKey) -> Self {
        Self {
            cell,
            status: CellStatus::Skipped,
            toolset: None,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn failed(cell: CellKey, error: impl Into<String>) -> Self {
        Self {
            cell,
            status: CellStatus::Failed,
            toolset: None,
            steps: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When the run started
    pub created_at: DateTime<Utc>,

    /// Host platform name
    pub host: String,

    /// Settings files merged for this run
    pub sources: Vec<ConfigSource>,

    /// Processed cells, in matrix order
    pub cells: Vec<CellReport>,
}

impl RunReport {
    pub fn new(host: impl Into<String>, sources: Vec<ConfigSource>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            host: host.into(),
            sources,
            cells: Vec::new(),
        }
    }

    pub fn push(&mut self, cell: CellReport) {
        self.cells.push(cell);
    }

    pub fn count(&self, status: CellStatus) -> usize {
        self.cells.iter().filter(|c| c.status == status).count()
    }

    /// One-line human summary
    pub fn human_summary(&self) -> String {
        format!(
            "{} built, {} skipped, {} failed",
            self.count(CellStatus::Built),
            self.count(CellStatus::Skipped),
            self.count(CellStatus::Failed)
        )
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_report() -> RunReport {
        let mut report = RunReport::new("win32", vec![]);
        report.push(CellReport::built(
            CellKey::new("win32", "msvc141", "Debug", "zlib"),
            "14.16.27023",
            vec![Step::Configure, Step::Build],
        ));
        report.push(CellReport::skipped(CellKey::new("win64", "msvc141", "Debug", "zlib")));
        report
    }

    #[test]
    fn test_counts_and_summary() {
        let report = sample_report();
        assert_eq!(report.count(CellStatus::Built), 1);
        assert_eq!(report.count(CellStatus::Skipped), 1);
        assert_eq!(report.human_summary(), "1 built, 1 skipped, 0 failed");
    }

    #[test]
    fn test_cell_fields_flattened() {
        let json = serde_json::to_value(sample_report()).unwrap();
        let first = &json["cells"][0];

        assert_eq!(json["schema_id"], SCHEMA_ID);
        assert_eq!(first["platform"], "win32");
        assert_eq!(first["target"], "zlib");
        assert_eq!(first["status"], "built");
        assert_eq!(first["steps"], serde_json::json!(["configure", "build"]));
        assert!(json["cells"][1].get("toolset").is_none());
    }

    #[test]
    fn test_write_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        sample_report().write_to_file(&path).unwrap();

        let loaded = RunReport::from_file(&path).unwrap();
        assert_eq!(loaded.cells, sample_report().cells);
    }
}
