//! Benchmark Executor
//!
//! Runs the planned combinations and collects their outcomes, either in the
//! current process or one worker process per combination.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Suite (declared by the benchmark binary)
//!       │
//!       ▼
//! ┌─────────────┐
//! │   planner   │  Filter, overrides, validation, enumeration
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   driver    │  One runner call per combination, in order
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  execution  │  In-process scheduler or isolated worker
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │   report    │  Metadata + result table → human / JSON / CSV
//! └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Per-combination runners and execution settings
//! - [`driver`] - Ordered (optionally parallel) run over the plan
//! - [`metadata`] - System metadata collection

mod driver;
mod execution;
mod metadata;

pub use driver::RunDriver;
pub use execution::{CombinationRunner, ExecutionConfig, InProcessRunner, IsolatedRunner};
pub use metadata::build_report_meta;
