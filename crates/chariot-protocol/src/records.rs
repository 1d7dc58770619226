//! Records that can be sent to the peer device.
//!
//! Every record is a single `\n`-terminated ASCII line. Resource records are
//! `key=value` fields joined by `%`:
//!
//! ```text
//! rsrc=<handle>%maxlen=<n>%uri=<uri>%attr=<attr>
//! rsrc=<handle>%value=<value>
//! ```

use crate::codec::{encode_line, encode_line_bounded, encode_record_line};
use crate::constants::{
    FIELD_SEPARATOR, KEY_ATTR, KEY_MAX_LEN, KEY_RESOURCE, KEY_URI, KEY_VALUE,
};
use crate::error::ProtocolResult;
use crate::types::ResourceHandle;

/// A record sent from the host to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// Announce a resource and its metadata.
    CreateResource {
        /// Handle assigned by the host registry.
        handle: ResourceHandle,
        /// Event buffer length reserved on the peer.
        max_len: usize,
        /// Resource path.
        uri: String,
        /// Descriptor published with the resource.
        attr: String,
    },

    /// Publish a new value for a resource.
    Event {
        /// Resource handle.
        handle: ResourceHandle,
        /// New value.
        value: String,
    },

    /// Command addressed to the peer itself (`sys/...`, `sensors/...`).
    Console {
        /// Peer path, prefix included.
        path: String,
    },

    /// Pre-built line such as a request URL or a pin reply.
    Raw {
        /// The line text, without terminator.
        line: String,
    },
}

impl Record {
    /// Get the record text without the terminator.
    pub fn to_line_string(&self) -> String {
        match self {
            Record::CreateResource {
                handle,
                max_len,
                uri,
                attr,
            } => format!(
                "{KEY_RESOURCE}={handle}{FIELD_SEPARATOR}{KEY_MAX_LEN}={max_len}\
                 {FIELD_SEPARATOR}{KEY_URI}={uri}{FIELD_SEPARATOR}{KEY_ATTR}={attr}"
            ),
            Record::Event { handle, value } => {
                format!("{KEY_RESOURCE}={handle}{FIELD_SEPARATOR}{KEY_VALUE}={value}")
            }
            Record::Console { path } => path.clone(),
            Record::Raw { line } => line.clone(),
        }
    }

    /// Encoded length in bytes, terminator included.
    pub fn encoded_len(&self) -> usize {
        self.to_line_string().len() + 1
    }

    /// Encode the record without any length check.
    pub fn encode(&self) -> Vec<u8> {
        encode_line(&self.to_line_string())
    }

    /// Encode the record, rejecting it if it exceeds `max` bytes.
    pub fn encode_within(&self, max: usize) -> ProtocolResult<Vec<u8>> {
        encode_line_bounded(&self.to_line_string(), max)
    }

    /// Encode the record bounded by the link's record limit.
    pub fn encode_bounded(&self) -> ProtocolResult<Vec<u8>> {
        encode_record_line(&self.to_line_string())
    }
}
