//! Worker Process Entry Point
//!
//! The worker side of process isolation: the supervisor re-executes the
//! benchmark binary with the worker flag and talks to it over an inherited
//! pipe pair. Each `Run` command measures one combination with a fresh
//! context and streams the raw samples back; aggregation happens in the
//! supervisor.
//!
//! On Unix the pipe fds are passed in `STEADYBENCH_IPC_FD`. Without it the
//! worker falls back to stdin/stdout.

use crate::measure::pin_to_cpu;
use crate::{BenchError, ParameterCombination, Suite};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use steadybench_ipc::{
    FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, IterationPlan, MAX_BATCH_SIZE,
    SampleBatch, SupervisorCommand, WorkerCapabilities, WorkerMessage,
};

#[cfg(unix)]
use std::os::unix::io::FromRawFd;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether SIGTERM asked the worker to stop
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

#[cfg(unix)]
fn install_sigterm_handler() {
    // SAFETY: the handler only stores to an atomic, which is async-signal-safe.
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigterm_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGTERM, &sa, std::ptr::null_mut());
    }
}

#[cfg(unix)]
extern "C" fn sigterm_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn install_sigterm_handler() {}

type BoxedReader = Box<dyn Read>;
type BoxedWriter = Box<dyn Write>;

fn open_transport() -> (BoxedReader, BoxedWriter) {
    #[cfg(unix)]
    if let Ok(val) = std::env::var(IPC_FD_ENV) {
        if let Some((r, w)) = val.split_once(',') {
            if let (Ok(read_fd), Ok(write_fd)) = (r.trim().parse::<i32>(), w.trim().parse::<i32>())
            {
                // SAFETY: the supervisor dup2'd these fds into the child and
                // nothing else in the worker owns them.
                let (read_file, write_file) = unsafe {
                    (
                        std::fs::File::from_raw_fd(read_fd),
                        std::fs::File::from_raw_fd(write_fd),
                    )
                };
                return (Box::new(read_file), Box::new(write_file));
            }
        }
        tracing::warn!(
            "invalid {IPC_FD_ENV}={val:?} (expected <read_fd>,<write_fd>), falling back to stdio"
        );
    }
    (Box::new(std::io::stdin()), Box::new(std::io::stdout()))
}

fn wire_kind(err: &BenchError) -> FailureKind {
    match err {
        BenchError::SetupFailure(_) => FailureKind::Setup,
        BenchError::InvalidParameterCombination(_) | BenchError::InvalidPlan(_) => {
            FailureKind::InvalidCombination
        }
        BenchError::MeasurementFailure { .. }
        | BenchError::EmptySampleSet
        | BenchError::Statistics(_) => FailureKind::Measurement,
    }
}

/// Worker loop serving one suite
pub struct WorkerMain<'s> {
    suite: &'s Suite,
    reader: FrameReader<BoxedReader>,
    writer: FrameWriter<BoxedWriter>,
}

impl<'s> WorkerMain<'s> {
    /// Worker on the inherited pipe pair (or stdio)
    pub fn new(suite: &'s Suite) -> Self {
        let (reader, writer) = open_transport();
        Self::with_io(suite, reader, writer)
    }

    /// Worker on explicit streams
    pub fn with_io(suite: &'s Suite, reader: BoxedReader, writer: BoxedWriter) -> Self {
        Self {
            suite,
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
        }
    }

    /// Handshake, then serve commands until `Shutdown`, SIGTERM, or EOF.
    pub fn run(&mut self) -> Result<(), FrameError> {
        install_sigterm_handler();
        self.writer
            .write(&WorkerMessage::Hello(WorkerCapabilities::default()))?;

        while !shutdown_requested() {
            let command: SupervisorCommand = match self.reader.read() {
                Ok(command) => command,
                Err(FrameError::EndOfStream) => break,
                Err(e) => return Err(e),
            };

            match command {
                SupervisorCommand::Run {
                    benchmark,
                    combination,
                    plan,
                } => {
                    let combination = ParameterCombination::from(combination);
                    self.run_combination(&benchmark, &combination, &plan)?;
                }
                SupervisorCommand::Shutdown => break,
            }
        }
        Ok(())
    }

    fn run_combination(
        &mut self,
        benchmark: &str,
        combination: &ParameterCombination,
        plan: &IterationPlan,
    ) -> Result<(), FrameError> {
        tracing::debug!(benchmark, %combination, "worker measuring");

        let Some(definition) = self.suite.find(benchmark) else {
            return self.writer.write(&WorkerMessage::Failure {
                kind: FailureKind::UnknownBenchmark,
                message: format!("benchmark not found: {benchmark}"),
            });
        };

        if let Some(cpu) = plan.pin_cpu {
            if let Err(e) = pin_to_cpu(cpu as usize) {
                tracing::warn!("could not pin worker to cpu {cpu}: {e}");
            }
        }

        let result = definition
            .space()
            .check(combination)
            .and_then(|()| definition.runnable().collect(combination, plan));

        match result {
            Ok(samples) => {
                let measured_nanos = samples.iter().map(|s| s.duration_nanos).sum();
                for (i, chunk) in samples.chunks(MAX_BATCH_SIZE).enumerate() {
                    self.writer.write(&WorkerMessage::SampleBatch(SampleBatch {
                        start_index: (i * MAX_BATCH_SIZE) as u64,
                        samples: chunk.to_vec(),
                    }))?;
                }
                self.writer.write(&WorkerMessage::Complete {
                    samples: samples.len() as u64,
                    measured_nanos,
                })
            }
            Err(err) => self.writer.write(&WorkerMessage::Failure {
                kind: wire_kind(&err),
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BenchmarkDefinition, WorkloadError, workload};
    use std::io::Cursor;

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
                .param("n", ["10"]),
            )
            .with(BenchmarkDefinition::new(
                "broken",
                workload(
                    |_: &ParameterCombination| Err::<(), _>(WorkloadError::msg("nope")),
                    |_: &mut ()| (),
                ),
            ))
    }

    fn encode(commands: &[SupervisorCommand]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut writer = FrameWriter::new(&mut bytes);
        for command in commands {
            writer.write(command).unwrap();
        }
        drop(writer);
        bytes
    }

    fn run_worker(commands: &[SupervisorCommand]) -> Vec<WorkerMessage> {
        let suite = suite();
        let output = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));

        struct Shared(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut worker = WorkerMain::with_io(
            &suite,
            Box::new(Cursor::new(encode(commands))),
            Box::new(Shared(output.clone())),
        );
        worker.run().unwrap();
        drop(worker);

        let bytes = output.lock().unwrap().clone();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let mut messages = Vec::new();
        while let Ok(msg) = reader.read::<WorkerMessage>() {
            messages.push(msg);
        }
        messages
    }

    fn run_command(benchmark: &str, combination: &[(&str, &str)]) -> SupervisorCommand {
        SupervisorCommand::Run {
            benchmark: benchmark.to_string(),
            combination: ParameterCombination::new(combination.iter().copied()).to_assignments(),
            plan: IterationPlan {
                warmup_iterations: 2,
                measurement_iterations: 5,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_streams_samples_then_complete() {
        let messages = run_worker(&[run_command("sum", &[("n", "10")]), SupervisorCommand::Shutdown]);
        assert!(matches!(messages[0], WorkerMessage::Hello(_)));
        let total: u64 = match &messages[1] {
            WorkerMessage::SampleBatch(batch) => {
                assert_eq!(batch.samples.len(), 5);
                batch.samples.iter().map(|s| s.duration_nanos).sum()
            }
            other => panic!("unexpected: {other:?}"),
        };
        match messages[2] {
            WorkerMessage::Complete {
                samples,
                measured_nanos,
            } => {
                assert_eq!(samples, 5);
                assert_eq!(measured_nanos, total);
            }
            ref other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_benchmark() {
        let messages = run_worker(&[run_command("missing", &[])]);
        assert!(matches!(
            messages[1],
            WorkerMessage::Failure {
                kind: FailureKind::UnknownBenchmark,
                ..
            }
        ));
    }

    #[test]
    fn test_setup_failure_reported() {
        let messages = run_worker(&[run_command("broken", &[])]);
        match &messages[1] {
            WorkerMessage::Failure { kind, message } => {
                assert_eq!(*kind, FailureKind::Setup);
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_mismatched_combination() {
        let messages = run_worker(&[run_command("sum", &[("m", "1")])]);
        assert!(matches!(
            messages[1],
            WorkerMessage::Failure {
                kind: FailureKind::InvalidCombination,
                ..
            }
        ));
    }
}
