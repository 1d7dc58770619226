//! Error types for the endpoint.

use chariot_protocol::{ProtocolError, ResourceHandle};
use thiserror::Error;

/// Errors returned by registry, endpoint and router operations.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The registry holds `capacity` resources already.
    #[error("resource registry full (capacity {capacity})")]
    CapacityExceeded {
        /// Registry capacity.
        capacity: usize,
    },

    /// No resource has this handle.
    #[error("invalid resource handle: {0}")]
    InvalidHandle(ResourceHandle),

    /// The field was set before; first write wins.
    #[error("resource {handle}: {field} already set")]
    FieldAlreadySet {
        /// Resource handle.
        handle: ResourceHandle,
        /// Field name.
        field: &'static str,
    },

    /// A uri, attribute, buffer limit or event payload exceeds its bound.
    #[error("value too long: max {max} bytes, got {actual}")]
    ValueTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Offending length.
        actual: usize,
    },

    /// An argument is empty or zero where a value is required.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The peer answered with a non-2.xx status.
    #[error("peer rejected request: {response}")]
    PeerRejected {
        /// Full response text.
        response: String,
    },

    /// No complete response arrived in time.
    #[error("timeout waiting for response after {passes} idle polls")]
    Timeout {
        /// Idle polls performed before giving up.
        passes: u32,
    },

    /// Encoding or decoding failed.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;
