//! Process isolation, checked with real worker processes.
//!
//! This binary is its own worker: the supervisor re-executes it with the
//! worker flag, so `main` must hand the suite to `run_worker` first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use steadybench::{
    BenchmarkDefinition, ExecutionConfig, FailureKind, IsolationMode, IterationPlan,
    OutcomeStatus, ParameterCombination, RunDriver, Suite, WorkloadError, build_plan, workload,
};

/// Process-wide state that one combination leaves behind
static TOUCHED: AtomicU64 = AtomicU64::new(0);

fn suite() -> Suite {
    Suite::new()
        .with(
            BenchmarkDefinition::new(
                "leaky",
                workload(
                    |combo: &ParameterCombination| {
                        let seen = TOUCHED.load(Ordering::SeqCst);
                        if seen != 0 {
                            return Err(WorkloadError::msg(format!(
                                "found state from an earlier combination: {seen}"
                            )));
                        }
                        combo.parse::<u64>("n")
                    },
                    |n: &mut u64| TOUCHED.fetch_add(*n, Ordering::SeqCst),
                ),
            )
            .param("n", ["1", "2", "3"]),
        )
        .with(BenchmarkDefinition::new(
            "exits",
            workload(
                |_: &ParameterCombination| Ok(()),
                |_: &mut ()| -> () { std::process::exit(3) },
            ),
        ))
        .with(BenchmarkDefinition::new(
            "stalls",
            workload(
                |_: &ParameterCombination| Ok(()),
                |_: &mut ()| std::thread::sleep(Duration::from_secs(5)),
            ),
        ))
}

fn config(isolation: IsolationMode) -> ExecutionConfig {
    ExecutionConfig {
        plan: IterationPlan {
            warmup_iterations: 2,
            measurement_iterations: 3,
            ..Default::default()
        },
        isolation,
        jobs: 2,
        timeout: Duration::from_secs(1),
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    let suite = suite();
    if steadybench::is_worker_invocation() {
        return steadybench::run_worker(&suite);
    }

    let leaky = regex_free_plan(&suite, "leaky")?;

    // Isolated: every combination starts from a clean process
    let table = RunDriver::new(config(IsolationMode::Process))?.run_all(&leaky)?;
    assert_eq!(table.len(), 3);
    for outcome in table.outcomes() {
        assert!(
            outcome.is_success(),
            "{} {} should succeed in its own process: {:?}",
            outcome.benchmark,
            outcome.params,
            outcome.status
        );
    }
    assert!(table.rows().all(|r| r.sample_count == 3));
    assert_eq!(TOUCHED.load(Ordering::SeqCst), 0, "supervisor state was touched");

    // A worker that dies is a crash, not a lost run
    let exits = regex_free_plan(&suite, "exits")?;
    let table = RunDriver::new(config(IsolationMode::Process))?.run_all(&exits)?;
    match &table.outcomes()[0].status {
        OutcomeStatus::Failed { kind, reason } => {
            assert_eq!(*kind, FailureKind::Crashed);
            assert!(reason.contains("status 3"), "unexpected reason: {reason}");
        }
        other => panic!("expected a crash, got {other:?}"),
    }

    // A worker that overruns its timeout is killed and skipped
    let stalls = regex_free_plan(&suite, "stalls")?;
    let table = RunDriver::new(config(IsolationMode::Process))?.run_all(&stalls)?;
    assert!(
        matches!(table.outcomes()[0].status, OutcomeStatus::Skipped { .. }),
        "expected a timeout, got {:?}",
        table.outcomes()[0].status
    );

    // In-process, the state of the first combination leaks into the rest
    let table = RunDriver::new(config(IsolationMode::InProcess))?.run_all(&leaky)?;
    assert!(table.outcomes()[0].is_success());
    for outcome in &table.outcomes()[1..] {
        assert!(matches!(
            outcome.status,
            OutcomeStatus::Failed {
                kind: FailureKind::Setup,
                ..
            }
        ));
    }

    println!("isolation: ok");
    Ok(())
}

/// Plan for the single definition called `name`
fn regex_free_plan(suite: &Suite, name: &str) -> anyhow::Result<steadybench::ExecutionPlan> {
    let mut plan = build_plan(suite, None, &[])?;
    let index = plan
        .definitions
        .iter()
        .position(|d| d.name() == name)
        .ok_or_else(|| anyhow::anyhow!("no definition `{name}`"))?;
    plan.runs.retain(|r| r.definition == index);
    Ok(plan)
}
