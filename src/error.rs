use crate::num::Timestamp;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Failures raised by pose algebra and traverse queries.
///
/// "No match" and "fewer results than requested" are not errors: they are
/// reported through `Option` and the length of the returned `Vec`.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Pose batches whose lengths neither match nor broadcast.
    #[error("cannot broadcast pose batches of length {left} and {right}")]
    Shape { left: usize, right: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("requested {k} results but only {available} frames are indexed")]
    OutOfRange { k: usize, available: usize },

    /// A camera does not share the traverse reference timestamps.
    #[error(
        "timestamps of camera `{camera}` are inconsistent with the traverse \
         ({len} frames, reference has {expected_len}, first mismatch at {first_mismatch:?})"
    )]
    InconsistentTimestamps {
        camera: String,
        len: usize,
        expected_len: usize,
        first_mismatch: Option<Timestamp>,
    },

    #[error("camera `{camera}` has duplicate timestamp {timestamp}")]
    UnsortedTimestamps { camera: String, timestamp: Timestamp },

    #[error("unknown camera `{0}`")]
    UnknownCamera(String),

    #[error("descriptors are not available for this query")]
    MissingDescriptors,

    #[error("descriptor dimension mismatch: expected {expected}, got {got}")]
    DescriptorDimension { expected: usize, got: usize },

    #[error("failed to parse retrieval config: {0}")]
    Config(#[from] toml::de::Error),
}

impl RetrievalError {
    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }
}
