//! Error types for the Chariot protocol.

use thiserror::Error;

use crate::request::ContentFormat;

/// Errors that can occur when encoding or decoding protocol lines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An outbound record does not fit its length bound.
    #[error("record too long: max {max} bytes, got {actual}")]
    RecordTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Encoded length.
        actual: usize,
    },

    /// A response frame grew past the accumulation limit.
    #[error("response frame too long: max {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Length accumulated so far.
        actual: usize,
    },

    /// Request host or resource name is empty.
    #[error("request host or resource unspecified")]
    MissingRequestTarget,

    /// Content format has no wire rendering.
    #[error("content format not supported: {0:?}")]
    UnsupportedContentType(ContentFormat),

    /// Inbound line could not be parsed.
    #[error("malformed command: {0}")]
    MalformedCommand(String),

    /// Inbound line is well formed but names no known namespace or verb.
    #[error("unrecognized command: {0}")]
    UnrecognizedCommand(String),

    /// Response text does not start with a status code.
    #[error("invalid status: {0}")]
    InvalidStatus(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
