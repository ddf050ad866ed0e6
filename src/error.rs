use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantizeError {
    #[error("pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch {
        len: usize,
        width: usize,
        height: usize,
    },

    #[error("max_colors must be between 1 and 256, got {0}")]
    InvalidMaxColors(u32),

    #[error("quantization was cancelled")]
    Cancelled,
}

/// Failure or not-ready outcome of a background [`QuantizeJob`](crate::job::QuantizeJob).
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job has not finished yet")]
    NotReady,

    #[error("job was already started")]
    AlreadyStarted,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(std::string::String),

    #[error(transparent)]
    Quantize(#[from] QuantizeError),

    #[error("worker panicked: {0}")]
    Panicked(std::string::String),
}
