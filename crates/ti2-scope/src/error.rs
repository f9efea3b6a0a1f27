use std::time::Duration;

use ti2_frame::{DecodeError, FrameError};
use ti2_transport::TransportError;

/// Errors that can occur in microscope operations.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// A caller-supplied argument is outside its documented bounds.
    /// Raised before any I/O.
    #[error("{field} out of range: {value} (expected {range})")]
    OutOfRange {
        field: &'static str,
        value: String,
        range: String,
    },

    /// No response with the request's identifier arrived in time.
    #[error("request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// No status event arrived in time.
    #[error("no status event within {0:?}")]
    NoStatus(Duration),

    /// A received frame is too short or structurally invalid.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transport-level error, passed through unchanged.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A request could not be framed.
    #[error("frame error: {0}")]
    Frame(FrameError),

    /// The blocking I/O worker panicked or was cancelled.
    #[error("blocking worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl From<FrameError> for ScopeError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Decode(err) => ScopeError::Decode(err),
            FrameError::Transport(err) => ScopeError::Transport(err),
            FrameError::RequestTimeout(timeout) => ScopeError::RequestTimeout(timeout),
            FrameError::EventTimeout(timeout) => ScopeError::NoStatus(timeout),
            other => ScopeError::Frame(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScopeError>;
