#![warn(missing_docs)]
//! steadybench Report - Result Rendering
//!
//! Turns a finished result table into one of:
//! - Human-readable score table (terminal)
//! - JSON (machine-readable)
//! - CSV (spreadsheet-compatible)

mod csv;
mod human;
mod json;
mod report;

pub use csv::generate_csv_report;
pub use human::generate_human_report;
pub use json::generate_json_report;
pub use report::{
    EntryMetrics, EntryStatus, FailureInfo, Report, ReportConfig, ReportEntry, ReportMeta,
    ReportSummary, SCHEMA_VERSION, SystemInfo,
};

use serde::{Deserialize, Serialize};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// JSON with full metadata
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Render `report` in `format`
pub fn render(report: &Report, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Human => Ok(generate_human_report(report)),
        OutputFormat::Json => generate_json_report(report),
        OutputFormat::Csv => Ok(generate_csv_report(report)),
    }
}
