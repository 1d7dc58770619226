//! Classification of inbound command lines.
//!
//! The peer forwards two kinds of commands:
//!
//! - `arduino/<digital|analog|mode>/<pin>[/<value>]` for local pin access
//! - `event/<uri>&<params>` for a remote PUT on a registered resource
//!
//! Sentinels are stripped before classification. Anything outside the two
//! namespaces is unrecognized; unknown verbs inside `arduino/` are ignored.

use crate::codec::strip_sentinels;
use crate::constants::{
    NAMESPACE_EVENT, NAMESPACE_PINS, PARAM_SEPARATOR, PREFIX_ANALOG, PREFIX_DIGITAL, PREFIX_MODE,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::PinMode;

/// Pin operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinKind {
    /// Digital read/write.
    Digital,
    /// Analog read/write.
    Analog,
    /// Pin mode configuration.
    Mode,
}

/// Value segment of a pin command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinValue {
    /// Numeric level or code.
    Level(i32),
    /// One of the literal mode tokens.
    Mode(PinMode),
}

/// A parsed pin command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinCommand {
    /// Operation family.
    pub kind: PinKind,
    /// Pin number.
    pub pin: u8,
    /// Value to write, or `None` for a read.
    pub value: Option<PinValue>,
}

/// A classified inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Local pin access.
    Pin(PinCommand),

    /// Remote PUT on a resource.
    ResourcePut {
        /// URI with the `event/` namespace removed.
        uri: String,
        /// Trimmed parameter payload.
        params: String,
    },

    /// A pin-namespace verb nobody handles; dropped without reply.
    Ignored(String),
}

impl InboundCommand {
    /// Classify one inbound line.
    pub fn parse(line: &str) -> ProtocolResult<InboundCommand> {
        let line = strip_sentinels(line);
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(NAMESPACE_PINS) {
            return parse_pin_namespace(rest);
        }

        if let Some(rest) = line.strip_prefix(NAMESPACE_EVENT) {
            let (uri, params) = rest.split_once(PARAM_SEPARATOR).ok_or_else(|| {
                ProtocolError::MalformedCommand(format!("PUT parameters did not arrive: {line}"))
            })?;
            return Ok(InboundCommand::ResourcePut {
                uri: uri.trim().to_string(),
                params: params.trim().to_string(),
            });
        }

        Err(ProtocolError::UnrecognizedCommand(line.to_string()))
    }
}

fn parse_pin_namespace(rest: &str) -> ProtocolResult<InboundCommand> {
    let (kind, tail) = if let Some(tail) = rest.strip_prefix(PREFIX_DIGITAL) {
        (PinKind::Digital, tail)
    } else if let Some(tail) = rest.strip_prefix(PREFIX_ANALOG) {
        (PinKind::Analog, tail)
    } else if let Some(tail) = rest.strip_prefix(PREFIX_MODE) {
        (PinKind::Mode, tail)
    } else {
        log::debug!("ignoring pin verb: {rest}");
        return Ok(InboundCommand::Ignored(rest.to_string()));
    };

    let (pin, value) = parse_pin_value(tail)?;
    if kind == PinKind::Mode && value.is_none() {
        return Err(ProtocolError::MalformedCommand(format!(
            "mode command without value: {tail}"
        )));
    }
    Ok(InboundCommand::Pin(PinCommand { kind, pin, value }))
}

/// Parse a `pin[/value]` tail.
///
/// The token before the first `/` is the pin number. The segment after it, up
/// to any further `/`, is the value: a mode token if it matches one, an
/// integer otherwise. An empty value segment means "read".
pub fn parse_pin_value(tail: &str) -> ProtocolResult<(u8, Option<PinValue>)> {
    let mut segments = tail.split('/');
    let pin_token = segments.next().unwrap_or("").trim();
    let pin: u8 = pin_token
        .parse()
        .map_err(|_| ProtocolError::MalformedCommand(format!("invalid pin: {tail}")))?;

    let value_token = segments.next().unwrap_or("").trim();
    if value_token.is_empty() {
        return Ok((pin, None));
    }

    if let Some(mode) = PinMode::from_token(value_token) {
        return Ok((pin, Some(PinValue::Mode(mode))));
    }

    let level: i32 = value_token
        .parse()
        .map_err(|_| ProtocolError::MalformedCommand(format!("invalid pin value: {tail}")))?;
    Ok((pin, Some(PinValue::Level(level))))
}
