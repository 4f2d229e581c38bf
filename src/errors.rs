use std::path::PathBuf;

use thiserror::Error;

/// Error type shared across the ingestion and answering pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("empty input: {0}")]
    EmptyInput(String),
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("no persisted index at {}", .0.display())]
    IndexNotFound(PathBuf),
    /// Index payload could not be encoded or decoded.
    #[error("index corrupt: {0}")]
    IndexCorrupt(String),
    #[error("index not ready; process documents first")]
    IndexNotReady,
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("answer synthesis timed out after {0}s")]
    SynthesisTimeout(u64),
    #[error("answer synthesis failed upstream: {0}")]
    SynthesisUpstream(String),
    #[error("conversation exceeded round cap of {0}")]
    RoundCapExceeded(usize),
    #[error("conversation already terminated")]
    ConversationTerminated,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::UpstreamUnavailable(err.to_string())
    }
}
