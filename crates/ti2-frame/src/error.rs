use std::time::Duration;

use ti2_transport::TransportError;

/// A received frame does not have the structure its packet shape requires.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame is shorter than the fixed layout.
    #[error("{packet} frame too short ({len} bytes, need {min})")]
    TooShort {
        packet: &'static str,
        len: usize,
        min: usize,
    },

    /// A text field contains non-ASCII bytes.
    #[error("{packet} field `{field}` is not ASCII")]
    NotAscii {
        packet: &'static str,
        field: &'static str,
    },

    /// A numeric text field could not be parsed.
    #[error("{packet} field `{field}` is not a number: {text:?}")]
    InvalidNumber {
        packet: &'static str,
        field: &'static str,
        text: String,
    },
}

/// Errors that can occur while framing, issuing, or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A received frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// No response with the request's identifier arrived in time.
    #[error("no matching response within {0:?}")]
    RequestTimeout(Duration),

    /// No status event arrived in time.
    #[error("no status event within {0:?}")]
    EventTimeout(Duration),

    /// The request payload does not fit the fixed payload region.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A call argument is wider than the envelope's argument field.
    #[error("call argument too long ({size} bytes, max {max})")]
    ArgumentTooLong { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
