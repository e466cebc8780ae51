#![warn(missing_docs)]
//! steadybench Core - Definitions and Measurement Runtime
//!
//! This crate provides the execution model:
//! - Parameter axes and their deterministic Cartesian product
//! - The `Workload` trait (setup once per combination, timed `invoke`)
//! - The iteration controller and the warm-up / measurement phase scheduler
//! - Result rows and the per-combination outcome table
//! - The worker process loop used for process isolation

mod definition;
mod error;
mod measure;
mod params;
mod result;
mod scheduler;
mod worker;
mod workload;

pub use definition::{BenchmarkDefinition, Mode, Suite};
pub use error::{BenchError, WorkloadError};
pub use measure::{
    Clock, ManualClock, SystemClock, Timer, measure, measure_batch, measure_for, pin_to_cpu,
    run_iteration,
};
pub use params::{ParameterAxis, ParameterCombination, ParameterSpace};
pub use result::{CombinationOutcome, FailureKind, OutcomeStatus, ResultRow, ResultTable};
pub use scheduler::{Phase, PhaseScheduler, collect_samples};
pub use worker::{WorkerMain, shutdown_requested};
pub use workload::{FnWorkload, Runnable, Workload, workload};

pub use steadybench_ipc::{IterationLength, IterationPlan, Sample};
pub use steadybench_stats::{ErrorMethod, ErrorPolicy, TimeUnit};
