//! Phase Scheduler
//!
//! Drives one combination through setup, warm-up (samples discarded) and
//! measurement (samples retained). Exactly one context is live at a time and
//! it is dropped outside every timed window.

use crate::measure::{Clock, run_iteration};
use crate::{BenchError, BenchmarkDefinition, ParameterCombination, ResultRow, Workload};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use steadybench_ipc::{IterationPlan, Sample};
use steadybench_stats::{ErrorPolicy, TimeUnit};

/// Timed phase of a combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Iterations whose samples are discarded
    Warmup,
    /// Iterations whose samples are retained
    Measurement,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Warmup => f.write_str("warm-up"),
            Phase::Measurement => f.write_str("measurement"),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Setup, warm-up and measurement of one combination.
///
/// Returns the measurement samples in measurement order. A panic during a
/// timed phase discards every sample collected so far.
pub fn collect_samples<W, C>(
    workload: &W,
    combination: &ParameterCombination,
    plan: &IterationPlan,
    clock: &C,
) -> Result<Vec<Sample>, BenchError>
where
    W: Workload + ?Sized,
    C: Clock + ?Sized,
{
    plan.validate().map_err(BenchError::InvalidPlan)?;

    let mut context = match catch_unwind(AssertUnwindSafe(|| workload.setup(combination))) {
        Ok(Ok(context)) => context,
        Ok(Err(err)) => return Err(BenchError::SetupFailure(err.to_string())),
        Err(panic) => {
            return Err(BenchError::SetupFailure(format!(
                "setup panicked: {}",
                panic_message(&*panic)
            )));
        }
    };

    let phase = Cell::new(Phase::Warmup);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        for _ in 0..plan.warmup_iterations {
            let _ = run_iteration(workload, &mut context, clock, plan.iteration);
        }

        phase.set(Phase::Measurement);
        let mut samples = Vec::with_capacity(plan.measurement_iterations as usize);
        for _ in 0..plan.measurement_iterations {
            samples.push(run_iteration(workload, &mut context, clock, plan.iteration));
        }
        samples
    }));

    drop(context);

    outcome.map_err(|panic| BenchError::MeasurementFailure {
        phase: phase.get(),
        reason: panic_message(&*panic),
    })
}

/// Runs combinations of a definition and aggregates their samples
#[derive(Debug, Clone, Default)]
pub struct PhaseScheduler {
    plan: IterationPlan,
    policy: ErrorPolicy,
    unit_override: Option<TimeUnit>,
}

impl PhaseScheduler {
    /// Scheduler with the given protocol and error policy
    pub fn new(plan: IterationPlan, policy: ErrorPolicy) -> Self {
        Self {
            plan,
            policy,
            unit_override: None,
        }
    }

    /// Report every definition in `unit` instead of its declared unit
    pub fn with_unit(mut self, unit: Option<TimeUnit>) -> Self {
        self.unit_override = unit;
        self
    }

    /// Iteration protocol
    pub fn plan(&self) -> &IterationPlan {
        &self.plan
    }

    /// Error policy
    pub fn policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    /// Validate the combination, then run setup, warm-up and measurement
    pub fn collect(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> Result<Vec<Sample>, BenchError> {
        definition.space().check(combination)?;
        definition.runnable().collect(combination, &self.plan)
    }

    /// Aggregate samples collected elsewhere (e.g. by a worker process)
    pub fn aggregate(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
        samples: &[Sample],
    ) -> Result<ResultRow, BenchError> {
        ResultRow::from_samples(
            definition.name(),
            combination,
            definition.mode(),
            self.unit_override.unwrap_or(definition.time_unit()),
            samples,
            &self.policy,
        )
    }

    /// Measure one combination and return its row
    pub fn run(
        &self,
        definition: &BenchmarkDefinition,
        combination: &ParameterCombination,
    ) -> Result<ResultRow, BenchError> {
        let samples = self.collect(definition, combination)?;
        self.aggregate(definition, combination, &samples)
    }
}
