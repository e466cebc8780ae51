//! Sample Summary
//!
//! Reduces the retained per-operation samples of one combination to a mean
//! and an error bound, both expressed in the definition's time unit.

use crate::bootstrap::bootstrap_mean;
use crate::student::critical_value;
use crate::{DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_CONFIDENCE_LEVEL, StatsError, TimeUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the error bound is derived
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorPolicy {
    /// Half-width of a Student-t confidence interval with `n - 1` degrees of freedom
    StudentT {
        /// Confidence level in (0, 1)
        confidence: f64,
    },
    /// Half-width of a percentile-bootstrap confidence interval of the mean
    Bootstrap {
        /// Confidence level in (0, 1)
        confidence: f64,
        /// Number of resamples
        iterations: usize,
    },
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::StudentT {
            confidence: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl ErrorPolicy {
    /// Build a policy for `method` at the given confidence
    pub fn new(method: ErrorMethod, confidence: f64) -> Self {
        match method {
            ErrorMethod::StudentT => ErrorPolicy::StudentT { confidence },
            ErrorMethod::Bootstrap => ErrorPolicy::Bootstrap {
                confidence,
                iterations: DEFAULT_BOOTSTRAP_ITERATIONS,
            },
        }
    }

    /// Confidence level of the interval
    pub fn confidence(&self) -> f64 {
        match *self {
            ErrorPolicy::StudentT { confidence } | ErrorPolicy::Bootstrap { confidence, .. } => {
                confidence
            }
        }
    }

    /// Method tag
    pub fn method(&self) -> ErrorMethod {
        match self {
            ErrorPolicy::StudentT { .. } => ErrorMethod::StudentT,
            ErrorPolicy::Bootstrap { .. } => ErrorMethod::Bootstrap,
        }
    }

    /// Check the confidence level and resample count
    pub fn validate(&self) -> Result<(), StatsError> {
        let confidence = self.confidence();
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(StatsError::InvalidConfidenceLevel(confidence));
        }
        if let ErrorPolicy::Bootstrap { iterations: 0, .. } = self {
            return Err(StatsError::InvalidBootstrapIterations);
        }
        Ok(())
    }
}

/// Method tag carried in result rows and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMethod {
    /// Student's t-distribution
    #[default]
    StudentT,
    /// Percentile bootstrap
    Bootstrap,
}

impl fmt::Display for ErrorMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMethod::StudentT => f.write_str("student-t"),
            ErrorMethod::Bootstrap => f.write_str("bootstrap"),
        }
    }
}

impl FromStr for ErrorMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student-t" | "student" | "t" => Ok(ErrorMethod::StudentT),
            "bootstrap" => Ok(ErrorMethod::Bootstrap),
            other => Err(format!(
                "unknown error method: {other} (expected student-t or bootstrap)"
            )),
        }
    }
}

/// Aggregated statistics of one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Arithmetic mean per operation
    pub mean: f64,
    /// Confidence interval half-width (NaN for a single sample)
    pub error: f64,
    /// Sample standard deviation (0 for a single sample)
    pub std_dev: f64,
    /// Fastest sample
    pub min: f64,
    /// Slowest sample
    pub max: f64,
    /// Number of retained samples
    pub sample_count: usize,
    /// Unit of every value above
    pub unit: TimeUnit,
    /// Confidence level of `error`
    pub confidence_level: f64,
    /// How `error` was computed
    pub method: ErrorMethod,
}

/// Summarize per-operation samples given in nanoseconds.
///
/// ```
/// use steadybench_stats::{ErrorPolicy, TimeUnit, summarize};
///
/// let summary = summarize(&[100.0; 10], TimeUnit::Nanoseconds, &ErrorPolicy::default()).unwrap();
/// assert_eq!(summary.mean, 100.0);
/// assert_eq!(summary.error, 0.0);
/// ```
pub fn summarize(
    samples_nanos: &[f64],
    unit: TimeUnit,
    policy: &ErrorPolicy,
) -> Result<Summary, StatsError> {
    if samples_nanos.is_empty() {
        return Err(StatsError::EmptySampleSet);
    }
    policy.validate()?;

    let values: Vec<f64> = samples_nanos.iter().map(|&v| unit.from_nanos(v)).collect();
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let (std_dev, error) = if n == 1 {
        (0.0, f64::NAN)
    } else if min == max {
        (0.0, 0.0)
    } else {
        let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let std_dev = variance.sqrt();
        let error = match *policy {
            ErrorPolicy::StudentT { confidence } => {
                critical_value(confidence, n - 1) * std_dev / (n as f64).sqrt()
            }
            ErrorPolicy::Bootstrap {
                confidence,
                iterations,
            } => bootstrap_mean(&values, iterations, confidence).half_width(),
        };
        (std_dev, error)
    };

    Ok(Summary {
        mean,
        error,
        std_dev,
        min,
        max,
        sample_count: n,
        unit,
        confidence_level: policy.confidence(),
        method: policy.method(),
    })
}

impl Summary {
    /// Lower bound of the confidence interval
    pub fn lower(&self) -> f64 {
        self.mean - self.error
    }

    /// Upper bound of the confidence interval
    pub fn upper(&self) -> f64 {
        self.mean + self.error
    }
}
