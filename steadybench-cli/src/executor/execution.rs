//! Combination Execution
//!
//! How a single combination gets measured. Both runners hand back a
//! [`CombinationOutcome`]; neither ever aborts the run.
//!
//! ## Execution Modes
//!
//! - **In-process ([`InProcessRunner`])**: fresh context per combination in
//!   the driver's process. Panics are caught, but allocator state, caches and
//!   statics carry over from one combination to the next.
//!
//! - **Isolated ([`IsolatedRunner`])**: one fresh worker process per
//!   combination. The worker streams raw samples back and the supervisor
//!   aggregates them, so both modes summarize identically.
//!
//! ```text
//! (definition, combination)
//!        │
//!        ▼
//! ┌──────────────────┐        ┌────────────┐
//! │ IsolatedRunner   │ ─IPC─▶ │   worker   │  setup → warm-up → measurement
//! └────────┬─────────┘ ◀───── └────────────┘
//!          │ samples
//!          ▼
//!  PhaseScheduler::aggregate → CombinationOutcome
//! ```

use crate::config::IsolationMode;
use crate::supervisor::{SupervisorError, WorkerHandle, WorkerOutcome};
use std::path::PathBuf;
use std::time::Duration;
use steadybench_core::{
    BenchmarkDefinition, CombinationOutcome, ErrorPolicy, FailureKind, IterationLength,
    IterationPlan, ParameterCombination, PhaseScheduler, TimeUnit,
};

/// Configuration for benchmark execution
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Warm-up and measurement protocol
    pub plan: IterationPlan,
    /// How the error bound is derived
    pub policy: ErrorPolicy,
    /// Report every definition in this unit
    pub unit_override: Option<TimeUnit>,
    /// Where combinations run
    pub isolation: IsolationMode,
    /// Concurrent workers in isolated mode
    pub jobs: usize,
    /// Per-combination timeout in isolated mode
    pub timeout: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            plan: IterationPlan::default(),
            policy: ErrorPolicy::default(),
            unit_override: None,
            isolation: IsolationMode::default(),
            jobs: 1,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ExecutionConfig {
    /// Scheduler carrying this plan, policy and unit
    pub fn scheduler(&self) -> PhaseScheduler {
        PhaseScheduler::new(self.plan.clone(), self.policy).with_unit(self.unit_override)
    }

    /// Iteration length as shown in reports, e.g. `1 invocation` or `10ms`
    pub fn iteration_label(&self) -> String {
        match self.plan.iteration {
            IterationLength::Invocations(1) => "1 invocation".to_string(),
            IterationLength::Invocations(n) => format!("{n} invocations"),
            IterationLength::Time { nanos } => format_nanos(nanos),
        }
    }
}

fn format_nanos(nanos: u64) -> String {
    match nanos {
        n if n % 1_000_000_000 == 0 => format!("{}s", n / 1_000_000_000),
        n if n % 1_000_000 == 0 => format!("{}ms", n / 1_000_000),
        n if n % 1_000 == 0 => format!("{}us", n / 1_000),
        n => format!("{n}ns"),
    }
}

/// Measures one combination
pub trait CombinationRunner: Send + Sync {
    /// Run `combination` of `definition` to completion
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> CombinationOutcome;

    /// Whether several combinations may run at once
    fn supports_parallel(&self) -> bool {
        false
    }
}

/// Runs combinations in the current process
#[derive(Debug, Clone)]
pub struct InProcessRunner {
    scheduler: PhaseScheduler,
}

impl InProcessRunner {
    /// Runner using `scheduler`
    pub fn new(scheduler: PhaseScheduler) -> Self {
        Self { scheduler }
    }
}

impl CombinationRunner for InProcessRunner {
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> CombinationOutcome {
        CombinationOutcome::from_result(
            definition.name(),
            combination,
            self.scheduler.run(definition, combination),
        )
    }
}

/// Runs every combination in a fresh worker process
#[derive(Debug, Clone)]
pub struct IsolatedRunner {
    scheduler: PhaseScheduler,
    binary: PathBuf,
    timeout: Duration,
}

impl IsolatedRunner {
    /// Runner spawning `binary` as the worker
    pub fn new(scheduler: PhaseScheduler, binary: PathBuf, timeout: Duration) -> Self {
        Self {
            scheduler,
            binary,
            timeout,
        }
    }

    /// Runner re-executing the current binary
    pub fn current_exe(scheduler: PhaseScheduler, timeout: Duration) -> std::io::Result<Self> {
        Ok(Self::new(scheduler, std::env::current_exe()?, timeout))
    }

    fn measure(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> Result<WorkerOutcome, SupervisorError> {
        let mut worker = WorkerHandle::spawn(&self.binary, self.timeout)?;
        let outcome =
            worker.run_combination(definition.name(), combination, self.scheduler.plan())?;
        if let Err(e) = worker.shutdown() {
            tracing::debug!("worker shutdown: {e}");
        }
        Ok(outcome)
    }
}

fn failure_kind(kind: steadybench_ipc::FailureKind) -> FailureKind {
    use steadybench_ipc::FailureKind as Wire;
    match kind {
        Wire::Setup => FailureKind::Setup,
        Wire::Measurement => FailureKind::Measurement,
        Wire::InvalidCombination | Wire::UnknownBenchmark => FailureKind::Configuration,
    }
}

impl CombinationRunner for IsolatedRunner {
    fn run(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> CombinationOutcome {
        let name = definition.name();
        match self.measure(definition, combination) {
            Ok(WorkerOutcome::Completed(samples)) => CombinationOutcome::from_result(
                name,
                combination,
                self.scheduler.aggregate(definition, combination, &samples),
            ),
            Ok(WorkerOutcome::Failed { kind, message }) => {
                CombinationOutcome::failed(name, combination, failure_kind(kind), message)
            }
            Err(SupervisorError::Timeout(limit)) => CombinationOutcome::skipped(
                name,
                combination,
                format!("timed out after {limit:?}"),
            ),
            Err(e) => {
                CombinationOutcome::failed(name, combination, FailureKind::Crashed, e.to_string())
            }
        }
    }

    fn supports_parallel(&self) -> bool {
        true
    }
}
