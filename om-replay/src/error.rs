use std::path::PathBuf;
use std::time::Duration;

use om_features::ShapeError;
use om_logging::NdjsonError;
use thiserror::Error;

use crate::codec::{CodecError, FormatError, InvariantViolation};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("format: {0}")]
    Format(#[from] FormatError),
    #[error("record {index}: {violation}")]
    Invariant {
        index: usize,
        violation: InvariantViolation,
    },
    #[error("{}: {len} bytes is not a multiple of the record width {width}", path.display())]
    TruncatedShard {
        path: PathBuf,
        len: u64,
        width: usize,
    },
    #[error("{}: shard already exists", .0.display())]
    ShardExists(PathBuf),
    #[error(
        "generation {generation} incomplete after {waited:?} ({present}/{expected} shards)"
    )]
    Timeout {
        generation: u64,
        waited: Duration,
        present: usize,
        expected: usize,
    },
    #[error("cancelled while waiting for generation {0}")]
    Cancelled(u64),
    #[error("no resident generation holds samples")]
    EmptyPool,
    #[error("safetensors: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),
    #[error("cache: {0}")]
    Cache(&'static str),
    #[error("shape: {0}")]
    Shape(#[from] ShapeError),
    #[error("event log: {0}")]
    Events(#[from] NdjsonError),
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
}

impl From<CodecError> for ReplayError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Format(f) => Self::Format(f),
            CodecError::Invariant { index, violation } => Self::Invariant { index, violation },
        }
    }
}

impl ReplayError {
    /// Failures that leave the window unchanged and may succeed on a later
    /// `advance()`.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::TruncatedShard { .. } | Self::Timeout { .. }
        )
    }
}
