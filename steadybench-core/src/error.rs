//! Core error types

use crate::result::FailureKind;
use crate::scheduler::Phase;
use steadybench_stats::StatsError;
use thiserror::Error;

/// Errors raised while validating or measuring a combination
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BenchError {
    /// Workload setup returned an error or panicked
    #[error("setup failed: {0}")]
    SetupFailure(String),

    /// An invocation panicked inside a timed phase; partial samples were discarded
    #[error("measurement failed during {phase}: {reason}")]
    MeasurementFailure {
        /// Phase the invocation belonged to
        phase: Phase,
        /// Panic message
        reason: String,
    },

    /// The aggregator received no samples
    #[error("empty sample set")]
    EmptySampleSet,

    /// Empty axis, duplicate axis, or a combination that does not fit its definition
    #[error("invalid parameter combination: {0}")]
    InvalidParameterCombination(String),

    /// Warm-up or measurement settings that cannot be executed
    #[error("invalid iteration plan: {0}")]
    InvalidPlan(String),

    /// Aggregation rejected its configuration
    #[error("statistics error: {0}")]
    Statistics(StatsError),
}

impl From<StatsError> for BenchError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::EmptySampleSet => BenchError::EmptySampleSet,
            other => BenchError::Statistics(other),
        }
    }
}

impl BenchError {
    /// Outcome category this error is reported under
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            BenchError::SetupFailure(_) => FailureKind::Setup,
            BenchError::MeasurementFailure { .. } => FailureKind::Measurement,
            BenchError::EmptySampleSet
            | BenchError::InvalidParameterCombination(_)
            | BenchError::InvalidPlan(_)
            | BenchError::Statistics(_) => FailureKind::Configuration,
        }
    }
}

/// Error a workload reports from `setup` (or from parsing its parameters)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkloadError {
    /// The combination lacks an axis the workload reads
    #[error("missing parameter `{0}`")]
    MissingParameter(String),

    /// An axis value could not be interpreted
    #[error("invalid value `{value}` for parameter `{axis}`: {reason}")]
    InvalidParameter {
        /// Axis name
        axis: String,
        /// Offending literal
        value: String,
        /// Parser message
        reason: String,
    },

    /// Any other setup problem
    #[error("{0}")]
    Other(String),
}

impl WorkloadError {
    /// Shorthand for [`WorkloadError::Other`]
    pub fn msg(message: impl Into<String>) -> Self {
        WorkloadError::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_empty_maps_to_empty_sample_set() {
        let err: BenchError = StatsError::EmptySampleSet.into();
        assert_eq!(err, BenchError::EmptySampleSet);
        assert_eq!(err.failure_kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            BenchError::SetupFailure("x".into()).failure_kind(),
            FailureKind::Setup
        );
        let err = BenchError::MeasurementFailure {
            phase: Phase::Warmup,
            reason: "boom".into(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Measurement);
        assert_eq!(err.to_string(), "measurement failed during warm-up: boom");
    }
}
