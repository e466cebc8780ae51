#![warn(missing_docs)]
//! steadybench IPC Protocol
//!
//! Wire protocol between the run driver (supervisor) and the forked worker
//! process that measures one parameter combination. Messages are archived with
//! rkyv and sent as length-prefixed frames over a pipe pair.

mod framing;
mod messages;

pub use framing::{FrameError, FrameReader, FrameWriter, MAX_FRAME_SIZE, read_frame, write_frame};
pub use messages::{
    Assignment, FailureKind, IterationLength, IterationPlan, Sample, SampleBatch,
    SupervisorCommand, WorkerCapabilities, WorkerMessage,
};

/// Protocol version for compatibility checking
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum samples per batch frame
pub const MAX_BATCH_SIZE: usize = 4_096;

/// Environment variable carrying the `<read_fd>,<write_fd>` pair for a worker
pub const IPC_FD_ENV: &str = "STEADYBENCH_IPC_FD";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_layout() {
        assert_eq!(std::mem::size_of::<Sample>(), 16);
        assert_eq!(std::mem::align_of::<Sample>(), 8);
    }

    #[test]
    fn test_batch_fits_in_frame() {
        assert!(MAX_BATCH_SIZE * std::mem::size_of::<Sample>() < MAX_FRAME_SIZE);
    }
}
