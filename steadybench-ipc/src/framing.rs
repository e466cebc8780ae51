//! Length-Prefixed Frames
//!
//! Pipes are byte streams; every archived message is preceded by its payload
//! length so the receiver can rebuild message boundaries.
//!
//! ```text
//! +----------------+------------------+
//! | length (u32 LE)| rkyv payload     |
//! +----------------+------------------+
//! ```

use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{AlignedVec, Archive, CheckBytes, Deserialize, Infallible, Serialize};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use thiserror::Error;

/// Largest payload accepted in either direction (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const PIPE_BUFFER: usize = 64 * 1024;

/// Errors raised while writing or reading a frame
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying pipe failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// rkyv could not archive the message
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// Payload failed archive validation
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Declared payload length exceeds [`MAX_FRAME_SIZE`]
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Declared size
        size: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Structurally invalid frame
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Peer closed the stream on a frame boundary
    #[error("end of stream")]
    EndOfStream,
}

fn check_len(len: usize) -> Result<(), FrameError> {
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Err(FrameError::InvalidFrame("zero-length frame".to_string()));
    }
    Ok(())
}

/// Archive `message` and write it as one flushed frame.
pub fn write_frame<W, T>(writer: &mut BufWriter<W>, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize<AllocSerializer<256>>,
{
    let payload =
        rkyv::to_bytes::<_, 256>(message).map_err(|e| FrameError::Encode(e.to_string()))?;
    check_len(payload.len())?;

    writer.write_all(&(payload.len() as u32).to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame, validate the archive, and deserialize it.
///
/// A clean close before the length prefix yields [`FrameError::EndOfStream`];
/// a close in the middle of a payload is an I/O error.
pub fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: Read,
    T: Archive,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
{
    let mut prefix = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut prefix) {
        return Err(match e.kind() {
            ErrorKind::UnexpectedEof => FrameError::EndOfStream,
            _ => FrameError::Io(e),
        });
    }

    let len = u32::from_le_bytes(prefix) as usize;
    check_len(len)?;

    let mut payload = AlignedVec::with_capacity(len);
    payload.resize(len, 0);
    reader.read_exact(&mut payload)?;

    let archived = rkyv::check_archived_root::<T>(&payload)
        .map_err(|e| FrameError::Decode(e.to_string()))?;
    match archived.deserialize(&mut Infallible) {
        Ok(value) => Ok(value),
        Err(never) => match never {},
    }
}

/// Buffered sending half of a pipe
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a raw writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(PIPE_BUFFER, writer),
        }
    }

    /// Send one message
    pub fn write<T>(&mut self, message: &T) -> Result<(), FrameError>
    where
        T: Serialize<AllocSerializer<256>>,
    {
        write_frame(&mut self.writer, message)
    }

    /// Flush buffered bytes
    pub fn flush(&mut self) -> Result<(), FrameError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Buffered receiving half of a pipe
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a raw reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(PIPE_BUFFER, reader),
        }
    }

    /// Receive one message
    pub fn read<T>(&mut self) -> Result<T, FrameError>
    where
        T: Archive,
        T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
    {
        read_frame(&mut self.reader)
    }

    /// Whether bytes are already buffered, so a read will not block on `poll`
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Assignment, FailureKind, IterationPlan, Sample, SampleBatch, SupervisorCommand,
        WorkerMessage,
    };
    use std::io::Cursor;

    #[test]
    fn test_command_survives_the_pipe() {
        let command = SupervisorCommand::Run {
            benchmark: "put".to_string(),
            combination: vec![
                Assignment {
                    axis: "entries".to_string(),
                    value: "30".to_string(),
                },
                Assignment {
                    axis: "map".to_string(),
                    value: "fx".to_string(),
                },
            ],
            plan: IterationPlan::default(),
        };

        let mut bytes = Vec::new();
        FrameWriter::new(&mut bytes).write(&command).unwrap();

        let decoded: SupervisorCommand = FrameReader::new(Cursor::new(bytes)).read().unwrap();
        match decoded {
            SupervisorCommand::Run {
                benchmark,
                combination,
                plan,
            } => {
                assert_eq!(benchmark, "put");
                assert_eq!(combination.len(), 2);
                assert_eq!(combination[1].value, "fx");
                assert_eq!(plan, IterationPlan::default());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_message_sequence_keeps_order() {
        let messages = vec![
            WorkerMessage::SampleBatch(SampleBatch {
                start_index: 0,
                samples: vec![Sample::single(10), Sample::single(12)],
            }),
            WorkerMessage::Failure {
                kind: FailureKind::Measurement,
                message: "boom".to_string(),
            },
        ];

        let mut bytes = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut bytes);
            for msg in &messages {
                writer.write(msg).unwrap();
            }
        }

        let mut reader = FrameReader::new(Cursor::new(bytes));
        match reader.read::<WorkerMessage>().unwrap() {
            WorkerMessage::SampleBatch(batch) => {
                assert_eq!(batch.samples[1].duration_nanos, 12);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(matches!(
            reader.read::<WorkerMessage>().unwrap(),
            WorkerMessage::Failure {
                kind: FailureKind::Measurement,
                ..
            }
        ));
        assert!(matches!(
            reader.read::<WorkerMessage>(),
            Err(FrameError::EndOfStream)
        ));
    }

    #[test]
    fn test_zero_length_frame_rejected() {
        let bytes = 0u32.to_le_bytes().to_vec();
        let result: Result<WorkerMessage, _> = FrameReader::new(Cursor::new(bytes)).read();
        assert!(matches!(result, Err(FrameError::InvalidFrame(_))));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let bytes = u32::MAX.to_le_bytes().to_vec();
        let result: Result<WorkerMessage, _> = FrameReader::new(Cursor::new(bytes)).read();
        assert!(matches!(result, Err(FrameError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_truncated_payload_is_io_error() {
        let mut bytes = 64u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        let result: Result<WorkerMessage, _> = FrameReader::new(Cursor::new(bytes)).read();
        assert!(matches!(result, Err(FrameError::Io(_))));
    }
}
