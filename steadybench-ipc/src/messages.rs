//! IPC Message Types
//!
//! Every message derives rkyv's `Archive` with `check_bytes`, so frames are
//! validated before they are deserialized on the receiving side.

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};

/// One measurement iteration: wall time of a timed window and the number of
/// workload invocations it covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
#[repr(C, align(8))]
pub struct Sample {
    /// Elapsed monotonic time of the window in nanoseconds
    pub duration_nanos: u64,
    /// Invocations performed inside the window (always >= 1)
    pub invocations: u64,
}

impl Sample {
    /// Create a sample covering `invocations` calls
    #[inline]
    pub fn new(duration_nanos: u64, invocations: u64) -> Self {
        Self {
            duration_nanos,
            invocations: invocations.max(1),
        }
    }

    /// Sample of a single timed invocation
    #[inline]
    pub fn single(duration_nanos: u64) -> Self {
        Self::new(duration_nanos, 1)
    }

    /// Average time of one invocation in nanoseconds
    #[inline]
    pub fn per_op_nanos(&self) -> f64 {
        self.duration_nanos as f64 / self.invocations as f64
    }
}

/// How long one warm-up or measurement iteration lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum IterationLength {
    /// Time exactly this many back-to-back invocations as one window
    Invocations(u64),
    /// Keep invoking until at least this many nanoseconds have elapsed
    Time {
        /// Target window length in nanoseconds
        nanos: u64,
    },
}

impl Default for IterationLength {
    fn default() -> Self {
        IterationLength::Invocations(1)
    }
}

/// Warm-up / measurement protocol for one combination
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct IterationPlan {
    /// Iterations whose samples are discarded
    pub warmup_iterations: u64,
    /// Iterations whose samples are retained
    pub measurement_iterations: u64,
    /// Length of each iteration
    pub iteration: IterationLength,
    /// Pin the measuring thread to this CPU (Linux only)
    pub pin_cpu: Option<u32>,
}

impl Default for IterationPlan {
    fn default() -> Self {
        Self {
            warmup_iterations: 10,
            measurement_iterations: 10,
            iteration: IterationLength::default(),
            pin_cpu: None,
        }
    }
}

impl IterationPlan {
    /// Validate the plan, returning a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.measurement_iterations == 0 {
            return Err("measurement_iterations must be > 0".to_string());
        }
        match self.iteration {
            IterationLength::Invocations(0) => {
                Err("iteration batch must cover at least one invocation".to_string())
            }
            IterationLength::Time { nanos: 0 } => {
                Err("iteration time must be > 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// One `axis = value` pair of a parameter combination
#[derive(Debug, Clone, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct Assignment {
    /// Axis name
    pub axis: String,
    /// Literal value for this combination
    pub value: String,
}

/// A batch of retained measurement samples
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct SampleBatch {
    /// Index of the first sample of this batch within the measurement phase
    pub start_index: u64,
    /// Samples in measurement order
    pub samples: Vec<Sample>,
}

/// Worker details advertised during the handshake
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub struct WorkerCapabilities {
    /// Protocol version for compatibility
    pub protocol_version: u32,
    /// Worker process id
    pub pid: u32,
    /// Logical CPUs visible to the worker
    pub cpu_count: u32,
}

impl Default for WorkerCapabilities {
    fn default() -> Self {
        Self {
            protocol_version: crate::PROTOCOL_VERSION,
            pid: std::process::id(),
            cpu_count: std::thread::available_parallelism()
                .map(|p| p.get() as u32)
                .unwrap_or(1),
        }
    }
}

/// Categories of combination failures reported by a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum FailureKind {
    /// Workload setup returned an error or panicked
    Setup,
    /// A timed invocation panicked
    Measurement,
    /// The combination does not match the definition's axes
    InvalidCombination,
    /// No definition with the requested name exists in the worker's suite
    UnknownBenchmark,
}

/// Messages sent from Worker to Supervisor
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum WorkerMessage {
    /// Initial handshake
    Hello(WorkerCapabilities),

    /// Retained measurement samples
    SampleBatch(SampleBatch),

    /// Combination finished; all samples have been sent
    Complete {
        /// Number of retained samples
        samples: u64,
        /// Sum of the measured windows in nanoseconds
        measured_nanos: u64,
    },

    /// Combination failed; no further samples follow
    Failure {
        /// Error category
        kind: FailureKind,
        /// Human-readable reason
        message: String,
    },
}

/// Commands sent from Supervisor to Worker
#[derive(Debug, Clone, Archive, RkyvSerialize, RkyvDeserialize)]
#[archive(check_bytes)]
pub enum SupervisorCommand {
    /// Measure one parameter combination of a definition
    Run {
        /// Definition name
        benchmark: String,
        /// Value assigned to every axis, in axis order
        combination: Vec<Assignment>,
        /// Warm-up and measurement protocol
        plan: IterationPlan,
    },

    /// Request graceful shutdown
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_op_nanos() {
        let sample = Sample::new(1_000, 8);
        assert!((sample.per_op_nanos() - 125.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_invocations_clamped() {
        let sample = Sample::new(500, 0);
        assert_eq!(sample.invocations, 1);
        assert!((sample.per_op_nanos() - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_plan_is_valid() {
        let plan = IterationPlan::default();
        assert_eq!(plan.warmup_iterations, 10);
        assert_eq!(plan.measurement_iterations, 10);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_rejects_zero_measurement() {
        let plan = IterationPlan {
            measurement_iterations: 0,
            ..Default::default()
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_plan_rejects_empty_windows() {
        let batch = IterationPlan {
            iteration: IterationLength::Invocations(0),
            ..Default::default()
        };
        let timed = IterationPlan {
            iteration: IterationLength::Time { nanos: 0 },
            ..Default::default()
        };
        assert!(batch.validate().is_err());
        assert!(timed.validate().is_err());
    }

    #[test]
    fn test_zero_warmup_is_allowed() {
        let plan = IterationPlan {
            warmup_iterations: 0,
            ..Default::default()
        };
        assert!(plan.validate().is_ok());
    }
}
