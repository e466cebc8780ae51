#![warn(missing_docs)]
//! steadybench CLI Library
//!
//! Command-line driver for benchmark binaries. A binary declares its
//! [`Suite`] and hands it to [`run`]; the same binary doubles as the worker
//! process when the supervisor re-executes it with the worker flag.
//!
//! # Example
//!
//! ```ignore
//! use steadybench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let suite = Suite::new().with(
//!         BenchmarkDefinition::new("sum", workload(
//!             |combo| Ok(combo.parse::<u64>("n")?),
//!             |n: &mut u64| (0..*n).sum::<u64>(),
//!         ))
//!         .param("n", ["100", "10000"]),
//!     );
//!     steadybench_cli::run(&suite)
//! }
//! ```

mod config;
mod executor;
mod planner;
mod supervisor;

pub use config::{CONFIG_FILE, IsolationMode, OutputConfig, RunnerConfig, SteadyConfig};
pub use executor::{
    CombinationRunner, ExecutionConfig, InProcessRunner, IsolatedRunner, RunDriver,
    build_report_meta,
};
pub use planner::{ExecutionPlan, ParamOverride, PlannedRun, build_plan};
pub use supervisor::{SupervisorError, WORKER_FLAG, WorkerHandle, WorkerOutcome};

use clap::{ArgAction, Parser, Subcommand};
use regex::Regex;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use steadybench_core::{
    ErrorMethod, ErrorPolicy, IterationLength, IterationPlan, ResultTable, Suite, TimeUnit,
    WorkerMain,
};
use steadybench_report::{OutputFormat, Report};
use tracing_subscriber::EnvFilter;

/// steadybench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "steadybench")]
#[command(author, version, about = "steadybench - parameterized microbenchmarks for Rust")]
pub struct Cli {
    /// Optional subcommand; defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Run only benchmarks whose name matches this regex
    #[arg(default_value = ".*")]
    pub filter: String,

    /// List the selected benchmarks and their combinations without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Discarded iterations per combination
    #[arg(long)]
    pub warmup_iterations: Option<u64>,

    /// Retained iterations per combination (one sample each)
    #[arg(long)]
    pub measurement_iterations: Option<u64>,

    /// Invocations timed together as one iteration
    #[arg(long, conflicts_with = "iteration_time")]
    pub batch: Option<u64>,

    /// Keep invoking until this much time has passed per iteration (e.g. 10ms)
    #[arg(long)]
    pub iteration_time: Option<String>,

    /// Unit for reported scores: ns, us, ms or s
    #[arg(long)]
    pub unit: Option<TimeUnit>,

    /// Confidence level of the reported error, e.g. 0.999
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Error method: student-t or bootstrap
    #[arg(long)]
    pub error_method: Option<ErrorMethod>,

    /// Run each combination in a fresh worker process (default: true).
    /// Use --isolated=false to run in-process
    #[arg(long, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    pub isolated: Option<bool>,

    /// Number of concurrently running isolated workers
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Per-combination timeout in isolated mode (e.g. 60s, 5m)
    #[arg(long)]
    pub timeout: Option<String>,

    /// Pin isolated workers to this CPU (Linux only)
    #[arg(long)]
    pub pin_cpu: Option<u32>,

    /// Output format: human, json or csv
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Output file (stdout if not specified)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Replace an axis' values, e.g. -p numPuts=100,1000
    #[arg(short = 'p', long = "param", value_name = "AXIS=V1,V2")]
    pub params: Vec<ParamOverride>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Internal: Run as worker process (used by supervisor)
    #[arg(long, hide = true)]
    pub steadybench_worker: bool,

    /// Internal: Absorb cargo bench's --bench flag
    #[arg(long, hide = true)]
    pub bench: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the selected benchmarks with their axes
    List,
    /// Run benchmarks (default)
    Run,
    /// Write a default steadybench.toml to the current directory
    Init,
}

/// Run the steadybench CLI for `suite` with the process arguments.
/// This is the main entry point for benchmark binaries.
pub fn run(suite: &Suite) -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(suite, cli)
}

/// Run the steadybench CLI with pre-parsed arguments.
pub fn run_with_cli(suite: &Suite, cli: Cli) -> anyhow::Result<()> {
    // Worker mode comes before any other initialization
    if cli.steadybench_worker {
        return run_worker(suite);
    }

    init_tracing(cli.verbose);

    // CLI flags override steadybench.toml
    let config = SteadyConfig::discover().unwrap_or_default();

    match cli.command {
        Some(Commands::List) => list_benchmarks(suite, &cli),
        Some(Commands::Init) => init_config(),
        Some(Commands::Run) => run_benchmarks(suite, &cli, &config),
        None if cli.dry_run => list_benchmarks(suite, &cli),
        None => run_benchmarks(suite, &cli, &config),
    }
}

/// Whether this process was started as a worker
pub fn is_worker_invocation() -> bool {
    std::env::args().any(|a| a == WORKER_FLAG)
}

/// Serve supervisor commands for `suite` until told to stop
pub fn run_worker(suite: &Suite) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    WorkerMain::new(suite)
        .run()
        .map_err(|e| anyhow::anyhow!("Worker error: {}", e))
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,steadybench={level},steadybench_cli={level},steadybench_core={level}"
        ))
    });
    // A host application may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn init_config() -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", path.display()));
    }
    std::fs::write(&path, SteadyConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Select, override and expand the suite per the CLI
fn plan_from_cli(suite: &Suite, cli: &Cli) -> anyhow::Result<ExecutionPlan> {
    let filter = Regex::new(&cli.filter)
        .map_err(|e| anyhow::anyhow!("invalid filter `{}`: {e}", cli.filter))?;
    Ok(build_plan(suite, Some(&filter), &cli.params)?)
}

fn list_benchmarks(suite: &Suite, cli: &Cli) -> anyhow::Result<()> {
    let plan = plan_from_cli(suite, cli)?;
    println!("steadybench plan:");

    for (i, definition) in plan.definitions.iter().enumerate() {
        let last_definition = i + 1 == plan.definitions.len();
        let (branch, stem) = if last_definition {
            ("└──", "    ")
        } else {
            ("├──", "│   ")
        };
        let count = definition.space().combination_count();
        println!(
            "{branch} {} ({count} combination{}, {})",
            definition.name(),
            if count == 1 { "" } else { "s" },
            definition.time_unit()
        );
        let axes = definition.space().axes();
        for (j, axis) in axes.iter().enumerate() {
            let leaf = if j + 1 == axes.len() { "└──" } else { "├──" };
            println!("{stem}{leaf} {}: {}", axis.name(), axis.values().join(", "));
        }
    }

    println!(
        "{} benchmarks, {} combinations.",
        plan.definitions.len(),
        plan.len()
    );
    Ok(())
}

/// Build an ExecutionConfig by layering: steadybench.toml defaults → CLI overrides.
pub fn build_execution_config(cli: &Cli, config: &SteadyConfig) -> anyhow::Result<ExecutionConfig> {
    let runner = &config.runner;
    let time_boxed = |s: &str| -> anyhow::Result<IterationLength> {
        Ok(IterationLength::Time {
            nanos: SteadyConfig::parse_duration(s)?,
        })
    };

    let iteration = match (cli.iteration_time.as_deref(), cli.batch) {
        (Some(t), _) => time_boxed(t)?,
        (None, Some(n)) => IterationLength::Invocations(n),
        (None, None) => match (runner.iteration_time.as_deref(), runner.batch) {
            (Some(t), _) => time_boxed(t)?,
            (None, Some(n)) => IterationLength::Invocations(n),
            (None, None) => IterationLength::default(),
        },
    };

    let plan = IterationPlan {
        warmup_iterations: cli.warmup_iterations.unwrap_or(runner.warmup_iterations),
        measurement_iterations: cli
            .measurement_iterations
            .unwrap_or(runner.measurement_iterations),
        iteration,
        pin_cpu: cli.pin_cpu.or(runner.pin_cpu),
    };
    plan.validate().map_err(|e| anyhow::anyhow!(e))?;

    let confidence = cli.confidence.unwrap_or(runner.confidence_level);
    let policy = match cli.error_method.unwrap_or(runner.error_method) {
        ErrorMethod::StudentT => ErrorPolicy::StudentT { confidence },
        ErrorMethod::Bootstrap => ErrorPolicy::Bootstrap {
            confidence,
            iterations: runner.bootstrap_iterations,
        },
    };
    policy.validate()?;

    let isolation = match cli.isolated {
        Some(true) => IsolationMode::Process,
        Some(false) => IsolationMode::InProcess,
        None => runner.isolation,
    };

    let timeout = SteadyConfig::parse_duration(cli.timeout.as_deref().unwrap_or(&runner.timeout))?;
    if timeout == 0 {
        anyhow::bail!("timeout must be greater than zero");
    }

    let jobs = cli.jobs.or(runner.jobs).unwrap_or(1).max(1);
    // A pinned core serves one worker at a time
    if let Some(cpu) = plan.pin_cpu.filter(|_| jobs > 1) {
        anyhow::bail!("pin_cpu = {cpu} cannot be combined with jobs = {jobs}");
    }

    Ok(ExecutionConfig {
        plan,
        policy,
        unit_override: cli.unit.or(runner.time_unit),
        isolation,
        jobs,
        timeout: Duration::from_nanos(timeout),
    })
}

/// Plan and run the suite per the CLI, returning the ordered outcomes
pub fn execute(suite: &Suite, cli: &Cli, config: &SteadyConfig) -> anyhow::Result<ResultTable> {
    let exec_config = build_execution_config(cli, config)?;
    let plan = plan_from_cli(suite, cli)?;
    RunDriver::new(exec_config)?.run_all(&plan)
}

fn run_benchmarks(suite: &Suite, cli: &Cli, config: &SteadyConfig) -> anyhow::Result<()> {
    let exec_config = build_execution_config(cli, config)?;
    let plan = plan_from_cli(suite, cli)?;

    if plan.is_empty() {
        println!("No benchmarks found.");
        return Ok(());
    }

    let mode = if exec_config.isolation.is_isolated() {
        format!("isolated, {} worker(s)", exec_config.jobs)
    } else {
        "in-process".to_string()
    };
    eprintln!(
        "Running {} combinations of {} benchmarks ({mode}), {} warm-up + {} measurement iterations of {}...\n",
        plan.len(),
        plan.definitions.len(),
        exec_config.plan.warmup_iterations,
        exec_config.plan.measurement_iterations,
        exec_config.iteration_label(),
    );

    let start_time = Instant::now();
    let table = RunDriver::new(exec_config.clone())?.run_all(&plan)?;
    let total_duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;

    let report = Report::from_table(build_report_meta(&exec_config), &table, total_duration_ms);
    let format = cli.format.unwrap_or(config.output.format);
    let output = steadybench_report::render(&report, format)?;

    let path = cli
        .output
        .clone()
        .or_else(|| config.output.path.as_ref().map(PathBuf::from));
    if let Some(path) = path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, output.as_bytes())?;
        println!("Report written to: {}", path.display());
    } else {
        print!("{}", output);
    }

    if table.has_failures() {
        let crashed = report.crashed();
        eprintln!(
            "\n{} of {} combinations failed or were skipped{}",
            report.summary.failed + report.summary.skipped,
            report.summary.total,
            if crashed > 0 {
                format!(" ({crashed} crashed)")
            } else {
                String::new()
            }
        );
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("bench").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let c = cli(&[]);
        assert_eq!(c.filter, ".*");
        assert!(c.command.is_none());
        assert_eq!(c.isolated, None);

        let exec = build_execution_config(&c, &SteadyConfig::default()).unwrap();
        assert_eq!(exec.plan.warmup_iterations, 10);
        assert_eq!(exec.plan.measurement_iterations, 10);
        assert_eq!(exec.plan.iteration, IterationLength::Invocations(1));
        assert_eq!(exec.isolation, IsolationMode::Process);
        assert_eq!(exec.jobs, 1);
        assert_eq!(exec.timeout, Duration::from_secs(60));
        assert_eq!(exec.policy, ErrorPolicy::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = SteadyConfig::default();
        config.runner.warmup_iterations = 3;
        config.runner.iteration_time = Some("5ms".to_string());
        config.runner.isolation = IsolationMode::InProcess;
        config.runner.jobs = Some(2);

        let exec = build_execution_config(&cli(&[]), &config).unwrap();
        assert_eq!(exec.plan.warmup_iterations, 3);
        assert_eq!(
            exec.plan.iteration,
            IterationLength::Time { nanos: 5_000_000 }
        );
        assert_eq!(exec.isolation, IsolationMode::InProcess);
        assert_eq!(exec.jobs, 2);

        let c = cli(&[
            "--warmup-iterations",
            "0",
            "--batch",
            "50",
            "--isolated",
            "--jobs",
            "4",
            "--error-method",
            "bootstrap",
            "--confidence",
            "0.99",
            "--unit",
            "us",
            "--timeout",
            "2s",
        ]);
        let exec = build_execution_config(&c, &config).unwrap();
        assert_eq!(exec.plan.warmup_iterations, 0);
        assert_eq!(exec.plan.iteration, IterationLength::Invocations(50));
        assert_eq!(exec.isolation, IsolationMode::Process);
        assert_eq!(exec.jobs, 4);
        assert_eq!(exec.policy.method(), ErrorMethod::Bootstrap);
        assert!((exec.policy.confidence() - 0.99).abs() < 1e-12);
        assert_eq!(exec.unit_override, Some(TimeUnit::Microseconds));
        assert_eq!(exec.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_isolated_false() {
        let exec = build_execution_config(&cli(&["--isolated=false"]), &SteadyConfig::default())
            .unwrap();
        assert_eq!(exec.isolation, IsolationMode::InProcess);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let config = SteadyConfig::default();
        assert!(build_execution_config(&cli(&["--measurement-iterations", "0"]), &config).is_err());
        assert!(build_execution_config(&cli(&["--confidence", "1.5"]), &config).is_err());
        assert!(build_execution_config(&cli(&["--batch", "0"]), &config).is_err());
        assert!(build_execution_config(&cli(&["--timeout", "soon"]), &config).is_err());
        assert!(build_execution_config(&cli(&["--timeout", "0s"]), &config).is_err());
        assert!(build_execution_config(&cli(&["--timeout", "0ms"]), &config).is_err());
    }

    #[test]
    fn test_zero_timeout_in_config_is_rejected() {
        let mut config = SteadyConfig::default();
        config.runner.timeout = "0s".to_string();
        assert!(build_execution_config(&cli(&[]), &config).is_err());
        // A CLI value replaces the bad file value
        assert!(build_execution_config(&cli(&["--timeout", "5s"]), &config).is_ok());
    }

    #[test]
    fn test_pin_cpu_requires_single_job() {
        let config = SteadyConfig::default();
        let err = build_execution_config(&cli(&["--pin-cpu", "0", "--jobs", "4"]), &config);
        assert!(err.is_err());

        let exec = build_execution_config(&cli(&["--pin-cpu", "2"]), &config).unwrap();
        assert_eq!(exec.plan.pin_cpu, Some(2));
        assert_eq!(exec.jobs, 1);

        let exec = build_execution_config(&cli(&["--jobs", "4"]), &config).unwrap();
        assert_eq!(exec.plan.pin_cpu, None);
        assert_eq!(exec.jobs, 4);

        let mut config = SteadyConfig::default();
        config.runner.pin_cpu = Some(1);
        config.runner.jobs = Some(2);
        assert!(build_execution_config(&cli(&[]), &config).is_err());
    }

    #[test]
    fn test_batch_conflicts_with_iteration_time() {
        let result = Cli::try_parse_from(["bench", "--batch", "5", "--iteration-time", "1ms"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_params_and_worker_flags() {
        let c = cli(&["put", "-p", "numPuts=1,2", "--param", "mapType=fx", "--bench"]);
        assert_eq!(c.filter, "put");
        assert_eq!(c.params.len(), 2);
        assert_eq!(c.params[0].values, ["1", "2"]);
        assert!(c.bench);

        let c = cli(&[WORKER_FLAG]);
        assert!(c.steadybench_worker);
    }

    #[test]
    fn test_subcommands() {
        assert!(matches!(cli(&["list"]).command, Some(Commands::List)));
        assert!(matches!(cli(&["run"]).command, Some(Commands::Run)));
        assert!(matches!(cli(&["init"]).command, Some(Commands::Init)));
    }
}
