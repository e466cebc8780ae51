#![warn(missing_docs)]
//! steadybench Statistical Aggregator
//!
//! Reduces retained measurement samples to a mean and an error bound:
//! - Student-t confidence interval half-width (default, 99.9 %)
//! - Percentile bootstrap of the mean as an alternative policy
//! - Normalization into the definition's output time unit

mod bootstrap;
mod student;
mod summary;
mod unit;

pub use student::critical_value;
pub use summary::{ErrorMethod, ErrorPolicy, Summary, summarize};
pub use unit::TimeUnit;

use thiserror::Error;

/// Default confidence level (99.9%)
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.999;

/// Default number of bootstrap resamples
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 10_000;

/// Errors raised while aggregating samples
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// No samples were retained
    #[error("empty sample set")]
    EmptySampleSet,

    /// Confidence level outside (0, 1)
    #[error("invalid confidence level: {0} (must be between 0 and 1)")]
    InvalidConfidenceLevel(f64),

    /// Bootstrap requested with zero resamples
    #[error("bootstrap needs at least one resample")]
    InvalidBootstrapIterations,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!((DEFAULT_CONFIDENCE_LEVEL - 0.999).abs() < f64::EPSILON);
        assert_eq!(DEFAULT_BOOTSTRAP_ITERATIONS, 10_000);
    }

    #[test]
    fn test_default_policy() {
        let policy = ErrorPolicy::default();
        assert_eq!(policy.method(), ErrorMethod::StudentT);
        assert!((policy.confidence() - DEFAULT_CONFIDENCE_LEVEL).abs() < f64::EPSILON);
    }
}
