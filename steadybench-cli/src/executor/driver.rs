//! Run Driver
//!
//! Walks the execution plan, hands every combination to a
//! [`CombinationRunner`] and appends the outcomes to the result table in
//! enumeration order. A failing combination never stops the others.

use super::execution::{CombinationRunner, ExecutionConfig, InProcessRunner, IsolatedRunner};
use crate::planner::{ExecutionPlan, PlannedRun};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use steadybench_core::{CombinationOutcome, OutcomeStatus, ResultTable};

/// Drives a plan to a result table
pub struct RunDriver {
    config: ExecutionConfig,
    runner: Box<dyn CombinationRunner>,
}

impl RunDriver {
    /// Driver with the runner `config.isolation` asks for
    pub fn new(config: ExecutionConfig) -> anyhow::Result<Self> {
        let scheduler = config.scheduler();
        let runner: Box<dyn CombinationRunner> = if config.isolation.is_isolated() {
            Box::new(IsolatedRunner::current_exe(scheduler, config.timeout)?)
        } else {
            Box::new(InProcessRunner::new(scheduler))
        };
        Ok(Self::with_runner(config, runner))
    }

    /// Driver with an explicit runner
    pub fn with_runner(config: ExecutionConfig, runner: Box<dyn CombinationRunner>) -> Self {
        Self { config, runner }
    }

    /// Execution settings
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run every planned combination and collect the outcomes
    pub fn run_all(&self, plan: &ExecutionPlan) -> anyhow::Result<ResultTable> {
        let jobs = if self.runner.supports_parallel() {
            self.config.jobs.max(1)
        } else {
            if self.config.jobs > 1 {
                tracing::warn!("--jobs is ignored without process isolation; running serially");
            }
            1
        };

        let pb = ProgressBar::new(plan.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let outcomes: Vec<CombinationOutcome> = if jobs > 1 {
            tracing::info!("running {} combinations on {jobs} workers", plan.len());
            let pool = ThreadPoolBuilder::new().num_threads(jobs).build()?;
            // Indexed collect keeps enumeration order
            pool.install(|| {
                plan.runs
                    .par_iter()
                    .map(|run| self.run_one(plan, run, &pb))
                    .collect()
            })
        } else {
            plan.runs
                .iter()
                .map(|run| self.run_one(plan, run, &pb))
                .collect()
        };
        pb.finish_and_clear();

        for outcome in &outcomes {
            match &outcome.status {
                OutcomeStatus::Success(_) => {}
                OutcomeStatus::Failed { kind, reason } => tracing::warn!(
                    "{} {} failed ({kind}): {reason}",
                    outcome.benchmark,
                    outcome.params
                ),
                OutcomeStatus::Skipped { reason } => tracing::warn!(
                    "{} {} skipped: {reason}",
                    outcome.benchmark,
                    outcome.params
                ),
            }
        }

        Ok(outcomes.into_iter().collect())
    }

    fn run_one(&self, plan: &ExecutionPlan, run: &PlannedRun, pb: &ProgressBar) -> CombinationOutcome {
        let definition = plan.definition_of(run);
        pb.set_message(format!("{} {}", definition.name(), run.combination));
        tracing::debug!(benchmark = definition.name(), combination = %run.combination, "running");
        let outcome = self.runner.run(definition, &run.combination);
        pb.inc(1);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IsolationMode;
    use crate::planner::build_plan;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use steadybench_core::{
        BenchmarkDefinition, FailureKind, IterationPlan, ParameterCombination, Suite, workload,
    };

    fn suite() -> Suite {
        Suite::new()
            .with(
                BenchmarkDefinition::new(
                    "sum",
                    workload(
                        |combo: &ParameterCombination| combo.parse::<u64>("n"),
                        |n: &mut u64| (0..*n).sum::<u64>(),
                    ),
                )
                .param("n", ["10", "100", "oops"]),
            )
            .with(BenchmarkDefinition::new(
                "noop",
                workload(|_| Ok(()), |_: &mut ()| ()),
            ))
    }

    fn in_process() -> ExecutionConfig {
        ExecutionConfig {
            plan: IterationPlan {
                warmup_iterations: 2,
                measurement_iterations: 4,
                ..Default::default()
            },
            isolation: IsolationMode::InProcess,
            jobs: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_failures_do_not_abort_the_run() {
        let plan = build_plan(&suite(), None, &[]).unwrap();
        let table = RunDriver::new(in_process()).unwrap().run_all(&plan).unwrap();

        assert_eq!(table.len(), 4);
        let names: Vec<String> = table
            .outcomes()
            .iter()
            .map(|o| format!("{} {}", o.benchmark, o.params))
            .collect();
        assert_eq!(
            names,
            ["sum {n=10}", "sum {n=100}", "sum {n=oops}", "noop {}"]
        );
        assert!(table.outcomes()[2].row().is_none());
        assert_eq!(table.rows().count(), 3);
        assert!(table.rows().all(|r| r.sample_count == 4));
        assert!(table.has_failures());
    }

    /// Finishes combinations in reverse order of submission
    struct Staggered {
        started: AtomicUsize,
    }

    impl CombinationRunner for Staggered {
        fn run(
            &self,
            definition: &BenchmarkDefinition,
            combination: &ParameterCombination,
        ) -> CombinationOutcome {
            let n = self.started.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(40u64.saturating_sub(n as u64 * 10)));
            if combination.get("n") == Some("100") {
                CombinationOutcome::skipped(definition.name(), combination, "timed out after 1s")
            } else {
                CombinationOutcome::failed(
                    definition.name(),
                    combination,
                    FailureKind::Crashed,
                    "worker exited with signal 9",
                )
            }
        }

        fn supports_parallel(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_parallel_results_keep_enumeration_order() {
        let plan = build_plan(&suite(), None, &[]).unwrap();
        let driver = RunDriver::with_runner(
            in_process(),
            Box::new(Staggered {
                started: AtomicUsize::new(0),
            }),
        );
        let table = driver.run_all(&plan).unwrap();

        let params: Vec<String> = table.outcomes().iter().map(|o| o.params.to_string()).collect();
        assert_eq!(params, ["{n=10}", "{n=100}", "{n=oops}", "{}"]);
        assert!(matches!(
            table.outcomes()[1].status,
            OutcomeStatus::Skipped { .. }
        ));
        assert_eq!(table.failures().count(), 4);
    }
}
