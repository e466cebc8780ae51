//! Configuration loading from steadybench.toml
//!
//! Settings can live in a `steadybench.toml` next to the benchmark crate. The
//! file is discovered by walking up from the current directory; command-line
//! flags take precedence over anything it sets.

use serde::{Deserialize, Serialize};
use std::path::Path;
use steadybench_core::{ErrorMethod, TimeUnit};
use steadybench_report::OutputFormat;

/// Name of the configuration file looked up by [`SteadyConfig::discover`]
pub const CONFIG_FILE: &str = "steadybench.toml";

/// steadybench configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SteadyConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Isolation mode for benchmark execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Run each combination in a fresh worker process (default)
    #[default]
    Process,
    /// Run combinations in the driver's process with a fresh context each.
    /// Allocator state, caches and statics carry over between combinations.
    InProcess,
}

impl IsolationMode {
    /// Whether this mode provides process isolation
    pub fn is_isolated(self) -> bool {
        matches!(self, IsolationMode::Process)
    }

    /// Name used in report metadata
    pub fn as_str(self) -> &'static str {
        match self {
            IsolationMode::Process => "process",
            IsolationMode::InProcess => "in-process",
        }
    }
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Discarded iterations per combination
    #[serde(default = "default_warmup_iterations")]
    pub warmup_iterations: u64,
    /// Retained iterations per combination
    #[serde(default = "default_measurement_iterations")]
    pub measurement_iterations: u64,
    /// Invocations per iteration (fixed batch)
    #[serde(default)]
    pub batch: Option<u64>,
    /// Time-boxed iterations (e.g. "10ms"); wins over `batch` when both are set
    #[serde(default)]
    pub iteration_time: Option<String>,
    /// Timeout for a single isolated combination (e.g. "60s", "5m")
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Isolation mode: "process" or "in-process"
    #[serde(default)]
    pub isolation: IsolationMode,
    /// Number of concurrently running isolated workers
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Confidence level of the reported error (e.g. 0.999)
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// "student-t" or "bootstrap"
    #[serde(default)]
    pub error_method: ErrorMethod,
    /// Resamples for the bootstrap error method
    #[serde(default = "default_bootstrap_iterations")]
    pub bootstrap_iterations: usize,
    /// Unit for reported scores; each definition's own unit otherwise
    #[serde(default)]
    pub time_unit: Option<TimeUnit>,
    /// Pin isolated workers to this CPU
    #[serde(default)]
    pub pin_cpu: Option<u32>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            warmup_iterations: default_warmup_iterations(),
            measurement_iterations: default_measurement_iterations(),
            batch: None,
            iteration_time: None,
            timeout: default_timeout(),
            isolation: IsolationMode::default(),
            jobs: None,
            confidence_level: default_confidence_level(),
            error_method: ErrorMethod::default(),
            bootstrap_iterations: default_bootstrap_iterations(),
            time_unit: None,
            pin_cpu: None,
        }
    }
}

fn default_warmup_iterations() -> u64 {
    10
}
fn default_measurement_iterations() -> u64 {
    10
}
fn default_timeout() -> String {
    "60s".to_string()
}
fn default_confidence_level() -> f64 {
    steadybench_stats::DEFAULT_CONFIDENCE_LEVEL
}
fn default_bootstrap_iterations() -> usize {
    steadybench_stats::DEFAULT_BOOTSTRAP_ITERATIONS
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json" or "csv"
    #[serde(default)]
    pub format: OutputFormat,
    /// Write the report to this file instead of stdout
    #[serde(default)]
    pub path: Option<String>,
}

impl SteadyConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!("loaded configuration from {}", config_path.display());
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!("ignoring {}: {e}", config_path.display());
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# steadybench configuration

[runner]
# Discarded iterations before measurement
warmup_iterations = 10
# Retained iterations; each one is a sample
measurement_iterations = 10
# Invocations per iteration (uncomment to enable)
# batch = 100
# Time-boxed iterations instead of fixed batches (uncomment to enable)
# iteration_time = "10ms"
# Timeout for one isolated combination
timeout = "60s"
# Isolation mode: "process" or "in-process"
isolation = "process"
# Concurrent isolated workers (uncomment to enable)
# jobs = 4
# Confidence level of the reported error (0.0 to 1.0, exclusive)
confidence_level = 0.999
# Error method: "student-t" or "bootstrap"
error_method = "student-t"
# Resamples for the bootstrap method
bootstrap_iterations = 10000
# Unit for reported scores: ns, us, ms or s (uncomment to enable)
# time_unit = "us"
# Pin isolated workers to a CPU (uncomment to enable)
# pin_cpu = 2

[output]
# Output format: human, json or csv
format = "human"
# Report file (uncomment to enable)
# path = "target/steadybench/report.json"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic() || *c == 'µ')
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Invalid duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }
}
