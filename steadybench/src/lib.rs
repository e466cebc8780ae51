#![warn(missing_docs)]
//! # steadybench
//!
//! Parameterized microbenchmarks with a fixed warm-up and measurement plan:
//! - **Parameter axes**: every definition declares named axes; the harness
//!   runs the full Cartesian product in a deterministic order
//! - **Warm-up then measurement**: warm-up iterations are discarded, each
//!   measurement iteration becomes one sample
//! - **Error bounds**: Student-t confidence interval half-width at 99.9% by
//!   default, or a percentile bootstrap
//! - **Process isolation**: each combination runs in a fresh worker process
//!   so allocator state, caches and statics never leak between combinations
//!
//! ## Quick Start
//!
//! ```no_run
//! use steadybench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new().with(
//!         BenchmarkDefinition::new(
//!             "sum",
//!             workload(
//!                 |combo: &ParameterCombination| combo.parse::<u64>("n"),
//!                 |n: &mut u64| (0..*n).sum::<u64>(),
//!             ),
//!         )
//!         .param("n", ["100", "10000"]),
//!     );
//!     steadybench::run(&suite)
//! }
//! ```

pub use steadybench_core::{
    BenchError, BenchmarkDefinition, Clock, CombinationOutcome, ErrorMethod, ErrorPolicy,
    FailureKind, FnWorkload, IterationLength, IterationPlan, ManualClock, Mode, OutcomeStatus,
    ParameterAxis, ParameterCombination, ParameterSpace, Phase, PhaseScheduler, ResultRow,
    ResultTable, Runnable, Sample, Suite, SystemClock, TimeUnit, Workload, WorkloadError,
    collect_samples, measure, run_iteration, workload,
};

pub use steadybench_stats::{StatsError, Summary, critical_value, summarize};

pub use steadybench_report::{OutputFormat, Report, render};

pub use steadybench_cli::{
    Cli, ExecutionConfig, ExecutionPlan, IsolationMode, ParamOverride, RunDriver, SteadyConfig,
    WORKER_FLAG, build_execution_config, build_plan, build_report_meta, execute,
    is_worker_invocation, run_with_cli, run_worker,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BenchmarkDefinition, ParameterCombination, Suite, TimeUnit, Workload, WorkloadError,
        workload,
    };
}

/// Run the steadybench CLI harness for `suite`.
///
/// Call this from your benchmark binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     steadybench::run(&my_suite())
/// }
/// ```
pub use steadybench_cli::run;
