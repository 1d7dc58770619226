//! Console commands addressed to the peer device itself.
//!
//! Operators type short keywords (`motes`, `temp`, `chan=26`); the peer expects
//! them under a `sys/` or `sensors/` path. `wake`/`attn` are not sent at all,
//! they only pulse the peer's attention line.

use crate::constants::{PATH_SENSORS, PATH_SYSTEM};
use crate::error::{ProtocolError, ProtocolResult};
use crate::records::Record;

/// Keywords forwarded verbatim under `sys/`.
const SYSTEM_KEYWORDS: &[&str] = &[
    "motes", "hosts", "health", "root/set", "root/get", "radio/on", "radio/off",
];

/// Keywords forwarded verbatim under `sensors/`.
const SENSOR_KEYWORDS: &[&str] = &[
    "radio", "temp", "accel", "mag", "battery", "lqi", "rssi", "sleep",
];

/// Setting prefixes forwarded under `sys/` with their argument.
const SYSTEM_SETTINGS: &[&str] = &["chan", "txpwr", "panid", "panaddr", "sleep=", "location"];

/// Prefixes that only wake the peer.
const WAKE_PREFIXES: &[&str] = &["wake", "attn"];

/// A console command after keyword mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Send `path` to the peer and read its answer.
    Peer {
        /// Full peer path, e.g. `sys/motes`.
        path: String,
    },
    /// Pulse the attention line; nothing is written.
    Wake,
}

impl ConsoleCommand {
    /// Map an operator keyword to a console command.
    pub fn parse(command: &str) -> ProtocolResult<ConsoleCommand> {
        let command = command.trim();

        if SYSTEM_KEYWORDS.contains(&command) {
            return Ok(Self::peer(PATH_SYSTEM, command));
        }
        if SENSOR_KEYWORDS.contains(&command) {
            return Ok(Self::peer(PATH_SENSORS, command));
        }
        if SYSTEM_SETTINGS.iter().any(|p| command.starts_with(p)) {
            return Ok(Self::peer(PATH_SYSTEM, command));
        }
        if WAKE_PREFIXES.iter().any(|p| command.starts_with(p)) {
            return Ok(ConsoleCommand::Wake);
        }

        Err(ProtocolError::UnrecognizedCommand(command.to_string()))
    }

    fn peer(prefix: &str, command: &str) -> ConsoleCommand {
        ConsoleCommand::Peer {
            path: format!("{prefix}{command}"),
        }
    }

    /// A sleep request. The peer goes down before it can answer.
    pub fn is_sleep(&self) -> bool {
        match self {
            ConsoleCommand::Peer { path } => path.starts_with("sys/sleep="),
            ConsoleCommand::Wake => false,
        }
    }

    /// The record to send, if any.
    pub fn to_record(&self) -> Option<Record> {
        match self {
            ConsoleCommand::Peer { path } => Some(Record::Console { path: path.clone() }),
            ConsoleCommand::Wake => None,
        }
    }
}
