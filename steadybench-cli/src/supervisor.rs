//! Supervisor Process
//!
//! Spawns worker processes (the benchmark binary re-executed with the worker
//! flag) and drives one combination per worker over a pipe pair on fds 3/4.

use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use steadybench_core::ParameterCombination;
use steadybench_ipc::{
    FailureKind, FrameError, FrameReader, FrameWriter, IPC_FD_ENV, IterationPlan, PROTOCOL_VERSION,
    Sample, SupervisorCommand, WorkerMessage,
};
use thiserror::Error;

/// Command-line flag that turns the benchmark binary into a worker
pub const WORKER_FLAG: &str = "--steadybench-worker";

/// Ways driving a worker can go wrong
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The worker process could not be started
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// A frame could not be written or decoded
    #[error("IPC error: {0}")]
    IpcError(String),

    /// The worker died or closed its pipe
    #[error("worker crashed: {0}")]
    WorkerCrashed(String),

    /// The worker did not finish in time and was killed
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The worker sent something out of sequence
    #[error("worker protocol error: expected {expected}, got {got}")]
    ProtocolError {
        /// What the supervisor was waiting for
        expected: String,
        /// What arrived instead
        got: String,
    },
}

impl From<FrameError> for SupervisorError {
    fn from(e: FrameError) -> Self {
        SupervisorError::IpcError(e.to_string())
    }
}

/// What a worker reported for one combination
#[derive(Debug)]
pub enum WorkerOutcome {
    /// All retained samples, in measurement order
    Completed(Vec<Sample>),
    /// The worker caught a failure and reported it
    Failed {
        /// Failure category
        kind: FailureKind,
        /// Worker's description
        message: String,
    },
}

/// Outcome of one `poll` on the message pipe
#[derive(Debug)]
enum PollResult {
    DataAvailable,
    Timeout,
    PipeClosed,
    Error(std::io::Error),
}

/// Block until `fd` is readable, closed, or `timeout` passes
fn wait_for_data(fd: RawFd, timeout: Duration) -> PollResult {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

    // SAFETY: `pollfd` is a valid, initialized array of length 1.
    let result = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };

    if result < 0 {
        PollResult::Error(std::io::Error::last_os_error())
    } else if result == 0 {
        PollResult::Timeout
    } else if pollfd.revents & libc::POLLIN != 0 {
        // Even if the pipe is closing there may be data left to read
        PollResult::DataAvailable
    } else if pollfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
        PollResult::PipeClosed
    } else {
        PollResult::Timeout
    }
}

/// Create a pipe pair with close-on-exec set, returning (read_fd, write_fd).
fn create_pipe() -> Result<(RawFd, RawFd), std::io::Error> {
    let mut fds = [0 as RawFd; 2];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    let ret = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    for &fd in &fds {
        // SAFETY: `fd` was just returned by pipe(2).
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFD);
            libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC);
        }
    }
    Ok((fds[0], fds[1]))
}

fn close_fd(fd: RawFd) {
    // SAFETY: callers only pass descriptors they own and never use again.
    unsafe {
        libc::close(fd);
    }
}

/// Ask `pid` to stop
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    // SAFETY: kill(2) has no memory-safety preconditions.
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Reject a `Complete` whose totals disagree with the batches received
fn check_complete(samples: &[Sample], count: u64, measured_nanos: u64) -> Result<(), SupervisorError> {
    if count != samples.len() as u64 {
        return Err(SupervisorError::ProtocolError {
            expected: format!("{} samples", samples.len()),
            got: format!("{count} samples"),
        });
    }
    let received: u64 = samples.iter().map(|s| s.duration_nanos).sum();
    if received != measured_nanos {
        return Err(SupervisorError::ProtocolError {
            expected: format!("{received}ns measured"),
            got: format!("{measured_nanos}ns measured"),
        });
    }
    Ok(())
}

/// Worker process handle
pub struct WorkerHandle {
    child: Child,
    reader: FrameReader<std::fs::File>,
    writer: FrameWriter<std::fs::File>,
    timeout: Duration,
    msg_read_fd: RawFd,
}

impl WorkerHandle {
    /// Spawn `binary` as a worker using fd 3/4 for IPC and wait for its handshake.
    pub fn spawn(binary: &Path, timeout: Duration) -> Result<Self, SupervisorError> {
        // cmd pipe: supervisor writes commands, worker reads them on fd 3
        let (cmd_read, cmd_write) = create_pipe()?;
        // msg pipe: worker writes messages on fd 4, supervisor reads them
        let (msg_read, msg_write) = match create_pipe() {
            Ok(fds) => fds,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                return Err(SupervisorError::SpawnFailed(e));
            }
        };

        let mut command = Command::new(binary);
        command
            .arg(WORKER_FLAG)
            .env(IPC_FD_ENV, "3,4")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        // SAFETY: the closure only calls async-signal-safe libc functions.
        unsafe {
            command.pre_exec(move || {
                if cmd_read != 3 {
                    libc::dup2(cmd_read, 3);
                    libc::close(cmd_read);
                }
                let flags = libc::fcntl(3, libc::F_GETFD);
                libc::fcntl(3, libc::F_SETFD, flags & !libc::FD_CLOEXEC);

                if msg_write != 4 {
                    libc::dup2(msg_write, 4);
                    libc::close(msg_write);
                }
                let flags = libc::fcntl(4, libc::F_GETFD);
                libc::fcntl(4, libc::F_SETFD, flags & !libc::FD_CLOEXEC);

                // Parent-side ends must not stay open in the child
                libc::close(cmd_write);
                libc::close(msg_read);
                Ok(())
            });
        }

        let child = match command.spawn() {
            Ok(c) => c,
            Err(e) => {
                close_fd(cmd_read);
                close_fd(cmd_write);
                close_fd(msg_read);
                close_fd(msg_write);
                return Err(SupervisorError::SpawnFailed(e));
            }
        };

        close_fd(cmd_read);
        close_fd(msg_write);

        // SAFETY: both descriptors are owned by this process and wrapped once.
        let (writer_file, reader_file) = unsafe {
            (
                std::fs::File::from_raw_fd(cmd_write),
                std::fs::File::from_raw_fd(msg_read),
            )
        };

        let mut handle = Self {
            child,
            reader: FrameReader::new(reader_file),
            writer: FrameWriter::new(writer_file),
            timeout,
            msg_read_fd: msg_read,
        };

        handle.wait_for_hello()?;
        Ok(handle)
    }

    /// Read the handshake and reject a mismatched protocol version
    fn wait_for_hello(&mut self) -> Result<(), SupervisorError> {
        let deadline = Instant::now() + self.timeout;
        match self.next_message(deadline)? {
            Some(WorkerMessage::Hello(caps)) => {
                if caps.protocol_version != PROTOCOL_VERSION {
                    return Err(SupervisorError::ProtocolError {
                        expected: format!("protocol version {PROTOCOL_VERSION}"),
                        got: format!("protocol version {}", caps.protocol_version),
                    });
                }
                tracing::debug!(pid = caps.pid, cpus = caps.cpu_count, "worker ready");
                Ok(())
            }
            Some(other) => Err(SupervisorError::ProtocolError {
                expected: "Hello".to_string(),
                got: format!("{other:?}"),
            }),
            None => {
                self.terminate();
                Err(SupervisorError::Timeout(self.timeout))
            }
        }
    }

    /// Measure one combination on this worker.
    ///
    /// On timeout the worker gets SIGTERM, a short window to flush, then SIGKILL.
    pub fn run_combination(
        &mut self,
        benchmark: &str,
        combination: &ParameterCombination,
        plan: &IterationPlan,
    ) -> Result<WorkerOutcome, SupervisorError> {
        self.writer.write(&SupervisorCommand::Run {
            benchmark: benchmark.to_string(),
            combination: combination.to_assignments(),
            plan: plan.clone(),
        })?;

        let mut samples = Vec::new();
        let deadline = Instant::now() + self.timeout;

        loop {
            let Some(msg) = self.next_message(deadline)? else {
                return self.handle_timeout();
            };

            match msg {
                WorkerMessage::SampleBatch(batch) => {
                    if batch.start_index != samples.len() as u64 {
                        return Err(SupervisorError::ProtocolError {
                            expected: format!("batch starting at {}", samples.len()),
                            got: format!("batch starting at {}", batch.start_index),
                        });
                    }
                    samples.extend(batch.samples);
                }
                WorkerMessage::Complete {
                    samples: count,
                    measured_nanos,
                } => {
                    check_complete(&samples, count, measured_nanos)?;
                    return Ok(WorkerOutcome::Completed(samples));
                }
                WorkerMessage::Failure { kind, message } => {
                    return Ok(WorkerOutcome::Failed { kind, message });
                }
                WorkerMessage::Hello(_) => {
                    return Err(SupervisorError::ProtocolError {
                        expected: "SampleBatch/Complete/Failure".to_string(),
                        got: "Hello".to_string(),
                    });
                }
            }
        }
    }

    /// Next message, or `None` once `deadline` passes.
    fn next_message(&mut self, deadline: Instant) -> Result<Option<WorkerMessage>, SupervisorError> {
        loop {
            // Buffered bytes may already hold the next frame
            if !self.reader.has_buffered_data() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Ok(None);
                }
                match wait_for_data(self.msg_read_fd, remaining.min(Duration::from_millis(100))) {
                    PollResult::DataAvailable => {}
                    PollResult::Timeout => {
                        if !self.is_alive() {
                            return Err(SupervisorError::WorkerCrashed(self.exit_description()));
                        }
                        continue;
                    }
                    PollResult::PipeClosed => {
                        return Err(SupervisorError::WorkerCrashed(self.exit_description()));
                    }
                    PollResult::Error(e) => {
                        return Err(SupervisorError::WorkerCrashed(format!("pipe error: {e}")));
                    }
                }
            }

            return match self.reader.read::<WorkerMessage>() {
                Ok(msg) => Ok(Some(msg)),
                Err(FrameError::EndOfStream) => {
                    Err(SupervisorError::WorkerCrashed(self.exit_description()))
                }
                Err(e) => {
                    if !self.is_alive() {
                        return Err(SupervisorError::WorkerCrashed(self.exit_description()));
                    }
                    Err(SupervisorError::IpcError(e.to_string()))
                }
            };
        }
    }

    /// SIGTERM, drain for 500ms, then SIGKILL.
    fn handle_timeout(&mut self) -> Result<WorkerOutcome, SupervisorError> {
        tracing::warn!(
            pid = self.child.id(),
            "worker exceeded {:?}, terminating",
            self.timeout
        );
        // The worker may already be gone
        let _ = send_sigterm(self.child.id());

        let drain_deadline = Instant::now() + Duration::from_millis(500);
        loop {
            let remaining = drain_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match wait_for_data(self.msg_read_fd, remaining) {
                PollResult::DataAvailable => match self.reader.read::<WorkerMessage>() {
                    Ok(WorkerMessage::SampleBatch(_)) => continue,
                    _ => break,
                },
                _ => break,
            }
        }

        self.terminate();
        Err(SupervisorError::Timeout(self.timeout))
    }

    fn terminate(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }

    /// Human-readable reason the worker stopped talking
    fn exit_description(&mut self) -> String {
        let deadline = Instant::now() + Duration::from_millis(200);
        while Instant::now() < deadline {
            if let Ok(Some(status)) = self.child.try_wait() {
                return describe_exit(status);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        "worker closed the connection unexpectedly".to_string()
    }

    /// Ask the worker to stop and reap it
    pub fn shutdown(mut self) -> Result<(), SupervisorError> {
        self.writer.write(&SupervisorCommand::Shutdown)?;
        let _ = self.child.wait();
        Ok(())
    }

    /// True until the worker has exited
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

fn describe_exit(status: std::process::ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match (status.code(), status.signal()) {
        (Some(code), _) => format!("worker exited with status {code}"),
        (None, Some(signal)) => format!("worker exited with signal {signal}"),
        _ => format!("worker exited: {status}"),
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = send_sigterm(self.child.id());
            std::thread::sleep(Duration::from_millis(50));
            if self.is_alive() {
                let _ = self.child.kill();
            }
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_missing_binary() {
        let result = WorkerHandle::spawn(
            Path::new("/nonexistent/steadybench-worker"),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(SupervisorError::SpawnFailed(_))));
    }

    #[test]
    fn test_worker_that_never_speaks_crashes() {
        // `true` exits immediately without a handshake
        let result = WorkerHandle::spawn(Path::new("/bin/true"), Duration::from_secs(5));
        assert!(matches!(result, Err(SupervisorError::WorkerCrashed(_))));
    }

    #[test]
    fn test_complete_must_match_batches() {
        let samples = [Sample::new(100, 1), Sample::new(250, 1)];
        assert!(check_complete(&samples, 2, 350).is_ok());
        assert!(matches!(
            check_complete(&samples, 3, 350),
            Err(SupervisorError::ProtocolError { .. })
        ));
        assert!(matches!(
            check_complete(&samples, 2, 349),
            Err(SupervisorError::ProtocolError { .. })
        ));
        assert!(check_complete(&[], 0, 0).is_ok());
    }

    #[test]
    fn test_describe_exit() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(
            describe_exit(std::process::ExitStatus::from_raw(9)),
            "worker exited with signal 9"
        );
        assert_eq!(
            describe_exit(std::process::ExitStatus::from_raw(1 << 8)),
            "worker exited with status 1"
        );
    }
}
