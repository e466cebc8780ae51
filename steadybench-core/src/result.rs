//! Result Rows and Outcome Table

use crate::{BenchError, Mode, ParameterCombination};
use serde::{Deserialize, Serialize};
use std::fmt;
use steadybench_ipc::Sample;
use steadybench_stats::{ErrorMethod, ErrorPolicy, TimeUnit, summarize};

/// Aggregated measurement of one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Definition name
    pub benchmark: String,
    /// Axis assignments in declaration order
    pub params: ParameterCombination,
    /// Measurement mode
    pub mode: Mode,
    /// Retained samples
    pub sample_count: usize,
    /// Mean time per operation
    pub mean: f64,
    /// Confidence interval half-width
    pub error: f64,
    /// Unit of every time value in the row
    pub unit: TimeUnit,
    /// Sample standard deviation
    pub std_dev: f64,
    /// Fastest sample
    pub min: f64,
    /// Slowest sample
    pub max: f64,
    /// Confidence level of `error`
    pub confidence_level: f64,
    /// How `error` was derived
    pub error_method: ErrorMethod,
}

impl ResultRow {
    /// Aggregate retained samples into a row
    pub fn from_samples(
        benchmark: &str,
        params: &ParameterCombination,
        mode: Mode,
        unit: TimeUnit,
        samples: &[Sample],
        policy: &ErrorPolicy,
    ) -> Result<Self, BenchError> {
        let per_op: Vec<f64> = samples.iter().map(Sample::per_op_nanos).collect();
        let summary = summarize(&per_op, unit, policy)?;
        Ok(Self {
            benchmark: benchmark.to_string(),
            params: params.clone(),
            mode,
            sample_count: summary.sample_count,
            mean: summary.mean,
            error: summary.error,
            unit: summary.unit,
            std_dev: summary.std_dev,
            min: summary.min,
            max: summary.max,
            confidence_level: summary.confidence_level,
            error_method: summary.method,
        })
    }
}

/// Why a combination produced no row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Setup returned an error or panicked
    Setup,
    /// An invocation failed during warm-up or measurement
    Measurement,
    /// The combination or run settings were invalid
    Configuration,
    /// The worker process died or broke the protocol
    Crashed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Setup => "setup",
            FailureKind::Measurement => "measurement",
            FailureKind::Configuration => "configuration",
            FailureKind::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// Terminal status of one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Measured and aggregated
    Success(ResultRow),
    /// Setup or measurement failed
    Failed {
        /// Category
        kind: FailureKind,
        /// Message from the error
        reason: String,
    },
    /// Aborted before completion (e.g. timeout); no partial row
    Skipped {
        /// Why it was aborted
        reason: String,
    },
}

/// One entry of the result table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationOutcome {
    /// Definition name
    pub benchmark: String,
    /// Combination that was attempted
    pub params: ParameterCombination,
    /// What happened
    pub status: OutcomeStatus,
}

impl CombinationOutcome {
    /// Outcome from the scheduler's result
    pub fn from_result(
        benchmark: &str,
        params: &ParameterCombination,
        result: Result<ResultRow, BenchError>,
    ) -> Self {
        let status = match result {
            Ok(row) => OutcomeStatus::Success(row),
            Err(err) => OutcomeStatus::Failed {
                kind: err.failure_kind(),
                reason: err.to_string(),
            },
        };
        Self {
            benchmark: benchmark.to_string(),
            params: params.clone(),
            status,
        }
    }

    /// Failed outcome
    pub fn failed(
        benchmark: &str,
        params: &ParameterCombination,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            benchmark: benchmark.to_string(),
            params: params.clone(),
            status: OutcomeStatus::Failed {
                kind,
                reason: reason.into(),
            },
        }
    }

    /// Skipped outcome
    pub fn skipped(benchmark: &str, params: &ParameterCombination, reason: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.to_string(),
            params: params.clone(),
            status: OutcomeStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    /// Row of a successful combination
    pub fn row(&self) -> Option<&ResultRow> {
        match &self.status {
            OutcomeStatus::Success(row) => Some(row),
            _ => None,
        }
    }

    /// True when a row was produced
    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success(_))
    }
}

/// Outcomes of a run in enumeration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    outcomes: Vec<CombinationOutcome>,
}

impl ResultTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed combination
    pub fn push(&mut self, outcome: CombinationOutcome) {
        self.outcomes.push(outcome);
    }

    /// All outcomes
    pub fn outcomes(&self) -> &[CombinationOutcome] {
        &self.outcomes
    }

    /// Rows of successful combinations, in order
    pub fn rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.outcomes.iter().filter_map(CombinationOutcome::row)
    }

    /// Failed and skipped outcomes, in order
    pub fn failures(&self) -> impl Iterator<Item = &CombinationOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// True when any combination failed or was skipped
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Number of outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when nothing ran
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

impl FromIterator<CombinationOutcome> for ResultTable {
    fn from_iter<T: IntoIterator<Item = CombinationOutcome>>(iter: T) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
