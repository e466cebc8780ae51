//! Report Data Structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use steadybench_core::{
    CombinationOutcome, ErrorMethod, FailureKind, Mode, OutcomeStatus, ParameterCombination,
    ResultTable, TimeUnit,
};

/// Report schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Run metadata
    pub meta: ReportMeta,
    /// One entry per combination, in enumeration order
    pub results: Vec<ReportEntry>,
    /// Totals
    pub summary: ReportSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMeta {
    /// [`SCHEMA_VERSION`] of this document
    pub schema_version: u32,
    /// steadybench version that produced it
    pub version: String,
    /// When the run finished
    pub timestamp: DateTime<Utc>,
    /// Host the run executed on
    pub system: SystemInfo,
    /// Effective run settings
    pub config: ReportConfig,
}

/// Execution settings captured in report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Discarded iterations per combination
    pub warmup_iterations: u64,
    /// Retained iterations per combination
    pub measurement_iterations: u64,
    /// e.g. `1 invocation`, `100 invocations`, `10ms`
    pub iteration: String,
    /// `process` or `in-process`
    pub isolation: String,
    /// How error bounds were computed
    pub error_method: ErrorMethod,
    /// Confidence level of the error bounds
    pub confidence_level: f64,
}

/// Host information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system
    pub os: String,
    /// CPU architecture
    pub arch: String,
    /// CPU model name, or `Unknown`
    pub cpu: String,
    /// Logical cores available
    pub cpu_cores: u32,
    /// Total memory; 0 when unknown
    pub memory_gb: f64,
}

/// Status of one combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Measured
    Passed,
    /// Setup, measurement or the worker failed
    Failed,
    /// Aborted, usually by a timeout
    Skipped,
}

/// One combination in the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Definition name
    pub benchmark: String,
    /// Axis assignments, in declaration order
    pub params: ParameterCombination,
    /// Outcome
    pub status: EntryStatus,
    /// Present when passed
    pub metrics: Option<EntryMetrics>,
    /// Present when failed or skipped
    pub failure: Option<FailureInfo>,
}

/// Statistics of a successful combination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetrics {
    /// Benchmark mode
    pub mode: Mode,
    /// Retained sample count
    pub samples: usize,
    /// Mean per invocation, in `unit`
    pub score: f64,
    /// Confidence interval half-width; `null` in JSON when undefined
    pub error: f64,
    /// Unit of every value in this struct
    pub unit: TimeUnit,
    /// Sample standard deviation
    pub std_dev: f64,
    /// Fastest sample
    pub min: f64,
    /// Slowest sample
    pub max: f64,
    /// `score - error`
    pub ci_lower: f64,
    /// `score + error`
    pub ci_upper: f64,
    /// Confidence level of `error`
    pub confidence_level: f64,
    /// How `error` was computed
    pub error_method: ErrorMethod,
}

/// Why a combination has no metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    /// `setup`, `measurement`, `configuration`, `crashed` or `skipped`
    pub kind: String,
    /// Error text
    pub message: String,
}

/// Report totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Combinations attempted
    pub total: usize,
    /// Combinations measured
    pub passed: usize,
    /// Combinations that failed
    pub failed: usize,
    /// Combinations aborted
    pub skipped: usize,
    /// Wall time of the whole run
    pub total_duration_ms: f64,
}

impl From<&CombinationOutcome> for ReportEntry {
    fn from(outcome: &CombinationOutcome) -> Self {
        let (status, metrics, failure) = match &outcome.status {
            OutcomeStatus::Success(row) => (
                EntryStatus::Passed,
                Some(EntryMetrics {
                    mode: row.mode,
                    samples: row.sample_count,
                    score: row.mean,
                    error: row.error,
                    unit: row.unit,
                    std_dev: row.std_dev,
                    min: row.min,
                    max: row.max,
                    ci_lower: row.mean - row.error,
                    ci_upper: row.mean + row.error,
                    confidence_level: row.confidence_level,
                    error_method: row.error_method,
                }),
                None,
            ),
            OutcomeStatus::Failed { kind, reason } => (
                EntryStatus::Failed,
                None,
                Some(FailureInfo {
                    kind: kind.to_string(),
                    message: reason.clone(),
                }),
            ),
            OutcomeStatus::Skipped { reason } => (
                EntryStatus::Skipped,
                None,
                Some(FailureInfo {
                    kind: "skipped".to_string(),
                    message: reason.clone(),
                }),
            ),
        };
        Self {
            benchmark: outcome.benchmark.clone(),
            params: outcome.params.clone(),
            status,
            metrics,
            failure,
        }
    }
}

impl Report {
    /// Build a report from a finished result table
    pub fn from_table(meta: ReportMeta, table: &ResultTable, total_duration_ms: f64) -> Self {
        let results: Vec<ReportEntry> = table.outcomes().iter().map(ReportEntry::from).collect();
        let mut summary = ReportSummary {
            total: results.len(),
            total_duration_ms,
            ..Default::default()
        };
        for entry in &results {
            match entry.status {
                EntryStatus::Passed => summary.passed += 1,
                EntryStatus::Failed => summary.failed += 1,
                EntryStatus::Skipped => summary.skipped += 1,
            }
        }
        Self {
            meta,
            results,
            summary,
        }
    }

    /// Crash failures are worth singling out in summaries
    pub fn crashed(&self) -> usize {
        let crashed = FailureKind::Crashed.to_string();
        self.results
            .iter()
            .filter(|e| e.failure.as_ref().is_some_and(|f| f.kind == crashed))
            .count()
    }
}
