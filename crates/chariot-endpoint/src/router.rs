//! Inbound command routing.
//!
//! The peer forwards remote operations to the host as single lines. The router
//! assembles them from the transport one byte at a time, classifies them, and
//! dispatches pin commands to the board and resource PUTs to their handlers.
//!
//! Malformed or unrecognized lines are logged and dropped; the peer never gets
//! an answer for them.

use chariot_protocol::{
    InboundCommand, LineCodec, PinCommand, PinKind, PinMode, PinValue, ProtocolError,
    ResourceHandle, MAX_RECORD_LEN, NAMESPACE_EVENT, RESPONSE_LEAD_BYTE,
};
use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::endpoint::Endpoint;
use crate::error::{EndpointError, EndpointResult};
use crate::metrics::metric_defs;
use crate::pins::PinIo;
use crate::transport::Transport;

/// Reply to a digital command the board cannot carry out.
pub const DIGITAL_ERROR_REPLY: &str = "Arduino could not complete digital pin request.<";
/// Reply to an analog command the board cannot carry out.
pub const ANALOG_ERROR_REPLY: &str = "Arduino could not complete analog pin request.<";
/// Reply to a mode command naming no known mode.
pub const MODE_ERROR_REPLY: &str = "Arduino remote error: invalid mode<";

/// Outcome of one routing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// No complete line is available yet.
    Idle,
    /// A response frame is waiting; it was left unread for the response logic.
    Deferred,
    /// A pin command ran and `reply` was sent to the peer.
    Pin {
        /// Status line sent back.
        reply: String,
    },
    /// A PUT reached the handler of `handle`.
    Put {
        /// Resource handle.
        handle: ResourceHandle,
        /// Value published back, if the handler returned one.
        published: Option<String>,
    },
    /// A PUT named no resource with a handler, or carried no parameters.
    Unhandled {
        /// URI as received.
        uri: String,
    },
    /// A pin verb nobody handles.
    Ignored,
}

/// Routes inbound lines to pins and resource handlers.
pub struct CommandRouter<P: PinIo> {
    pins: P,
    codec: LineCodec,
    lines_routed: u32,
    lines_dropped: u32,
}

impl<P: PinIo> CommandRouter<P> {
    /// Create a router over a pin bank.
    pub fn new(pins: P) -> Self {
        CommandRouter {
            pins,
            codec: LineCodec::new(),
            lines_routed: 0,
            lines_dropped: 0,
        }
    }

    /// Get the pin bank.
    pub fn pins(&self) -> &P {
        &self.pins
    }

    /// Get the pin bank mutably.
    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }

    /// Get the number of lines dispatched.
    pub fn lines_routed(&self) -> u32 {
        self.lines_routed
    }

    /// Get the number of lines dropped as malformed or unrecognized.
    pub fn lines_dropped(&self) -> u32 {
        self.lines_dropped
    }

    /// Read available input and dispatch at most one complete line.
    ///
    /// When no partial line is buffered and the next byte starts a response
    /// frame, nothing is consumed and [`Routed::Deferred`] is returned.
    pub fn poll<T: Transport, C: Clock>(
        &mut self,
        endpoint: &mut Endpoint<T, C>,
    ) -> EndpointResult<Routed> {
        loop {
            // a blank terminator can empty the buffer mid-read, so re-check
            if self.codec.is_empty()
                && endpoint.transport_mut().peek_byte() == Some(RESPONSE_LEAD_BYTE)
            {
                trace!("response frame pending, leaving input alone");
                return Ok(Routed::Deferred);
            }
            let Some(byte) = endpoint.transport_mut().read_byte() else {
                break;
            };
            self.codec.push_byte(byte);
            if let Some(line) = self.codec.decode_line() {
                return self.dispatch(endpoint, &line);
            }
            if self.codec.buffered_len() > MAX_RECORD_LEN {
                self.codec.clear();
                let err = ProtocolError::MalformedCommand(format!(
                    "line exceeds {MAX_RECORD_LEN} bytes"
                ));
                return Err(self.drop_line("<oversize>", err.into()));
            }
        }
        Ok(Routed::Idle)
    }

    /// Classify and run one inbound line.
    pub fn dispatch<T: Transport, C: Clock>(
        &mut self,
        endpoint: &mut Endpoint<T, C>,
        line: &str,
    ) -> EndpointResult<Routed> {
        let command = match InboundCommand::parse(line) {
            Ok(command) => command,
            Err(e) => return Err(self.drop_line(line, e.into())),
        };

        match command {
            InboundCommand::Pin(pin) => {
                let reply = self.run_pin(pin);
                endpoint.send_line(&reply)?;
                self.count_routed("pin");
                debug!("pin command {:?} -> {}", pin, reply);
                Ok(Routed::Pin { reply })
            }
            InboundCommand::ResourcePut { uri, params } => self.route_put(endpoint, uri, &params),
            InboundCommand::Ignored(verb) => {
                debug!("ignoring pin verb {:?}", verb);
                Ok(Routed::Ignored)
            }
        }
    }

    fn route_put<T: Transport, C: Clock>(
        &mut self,
        endpoint: &mut Endpoint<T, C>,
        uri: String,
        params: &str,
    ) -> EndpointResult<Routed> {
        let registry = endpoint.registry();
        let handle = registry
            .lookup_by_uri(&uri)
            .or_else(|| registry.lookup_by_uri(&format!("{NAMESPACE_EVENT}{uri}")))
            .filter(|&h| registry.get(h).is_some_and(|r| r.has_put_handler()));

        let Some(handle) = handle.filter(|_| !params.is_empty()) else {
            debug!("PUT on {:?} has no handler or no parameters", uri);
            return Ok(Routed::Unhandled { uri });
        };

        self.count_routed("put");
        let published = endpoint.registry_mut().invoke_put(handle, params);
        if let Some(value) = &published {
            endpoint.settle();
            endpoint.trigger_event(handle, value, true)?;
        }
        Ok(Routed::Put { handle, published })
    }

    fn run_pin(&mut self, command: PinCommand) -> String {
        let pin = command.pin;
        match (command.kind, command.value) {
            (PinKind::Digital, None) => {
                let level = i32::from(self.pins.digital_read(pin));
                format!("Pin D{pin} set to {level}")
            }
            (PinKind::Digital, Some(PinValue::Level(level @ 0..=1))) => {
                self.pins.digital_write(pin, level == 1);
                format!("Pin D{pin} set to {level}")
            }
            (PinKind::Digital, Some(_)) => DIGITAL_ERROR_REPLY.to_string(),
            (PinKind::Analog, None) => {
                let value = self.pins.analog_read(pin);
                format!("Pin A{pin} set to {value}")
            }
            (PinKind::Analog, Some(PinValue::Level(value))) if value >= 0 => {
                self.pins.analog_write(pin, value);
                format!("Pin A{pin} set to {value}")
            }
            (PinKind::Analog, Some(_)) => ANALOG_ERROR_REPLY.to_string(),
            (PinKind::Mode, value) => {
                let mode = match value {
                    Some(PinValue::Mode(mode)) => Some(mode),
                    Some(PinValue::Level(code)) => PinMode::from_code(code),
                    None => None,
                };
                match mode {
                    Some(mode) => {
                        self.pins.set_mode(pin, mode);
                        format!("Pin D{pin} configured as {mode}")
                    }
                    None => MODE_ERROR_REPLY.to_string(),
                }
            }
        }
    }

    fn count_routed(&mut self, kind: &'static str) {
        self.lines_routed += 1;
        metrics::counter!(metric_defs::COMMANDS_ROUTED.name, "kind" => kind).increment(1);
    }

    fn drop_line(&mut self, line: &str, err: EndpointError) -> EndpointError {
        warn!("dropping inbound line {:?}: {}", line, err);
        self.lines_dropped += 1;
        metrics::counter!(metric_defs::COMMANDS_DROPPED.name).increment(1);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::EndpointConfig;
    use crate::pins::SimulatedPins;
    use crate::transport::MemoryTransport;

    fn setup() -> (CommandRouter<SimulatedPins>, Endpoint<MemoryTransport, ManualClock>) {
        let endpoint = Endpoint::with_clock(
            MemoryTransport::new(),
            ManualClock::new(),
            EndpointConfig::default(),
        )
        .unwrap();
        (CommandRouter::new(SimulatedPins::new()), endpoint)
    }

    #[test]
    fn test_digital_write_and_read() {
        let (mut router, mut ep) = setup();
        let routed = router.dispatch(&mut ep, "arduino/digital/13/1").unwrap();
        assert_eq!(
            routed,
            Routed::Pin {
                reply: "Pin D13 set to 1".to_string()
            }
        );
        assert!(router.pins().level(13));

        router.dispatch(&mut ep, "arduino/digital/13").unwrap();
        assert_eq!(
            ep.transport().written_lines(),
            vec!["Pin D13 set to 1", "Pin D13 set to 1"]
        );
    }

    #[test]
    fn test_digital_rejects_level_above_one() {
        let (mut router, mut ep) = setup();
        router.dispatch(&mut ep, "arduino/digital/13/2").unwrap();
        assert_eq!(
            ep.transport().written(),
            b"Arduino could not complete digital pin request.<\n"
        );
        assert!(!router.pins().level(13));
    }

    #[test]
    fn test_analog_read_and_write() {
        let (mut router, mut ep) = setup();
        router.pins_mut().set_analog_input(0, 512);
        router.dispatch(&mut ep, "arduino/analog/0").unwrap();
        router.dispatch(&mut ep, "arduino/analog/5/120").unwrap();
        assert_eq!(
            ep.transport().written_lines(),
            vec!["Pin A0 set to 512", "Pin A5 set to 120"]
        );
        assert_eq!(router.pins().analog(5), 120);
    }

    #[test]
    fn test_mode_tokens_and_codes() {
        let (mut router, mut ep) = setup();
        router.dispatch(&mut ep, "arduino/mode/7/input_pullup").unwrap();
        router.dispatch(&mut ep, "arduino/mode/8/1").unwrap();
        router.dispatch(&mut ep, "arduino/mode/9/5").unwrap();
        assert_eq!(router.pins().mode(7), PinMode::InputPullup);
        assert_eq!(router.pins().mode(8), PinMode::Output);
        assert_eq!(
            ep.transport().written_lines(),
            vec![
                "Pin D7 configured as INPUT_PULLUP",
                "Pin D8 configured as OUTPUT",
                "Arduino remote error: invalid mode<",
            ]
        );
    }

    #[test]
    fn test_malformed_is_dropped_without_reply() {
        let (mut router, mut ep) = setup();
        let err = router.dispatch(&mut ep, "arduino/digital/x").unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Protocol(ProtocolError::MalformedCommand(_))
        ));
        let err = router.dispatch(&mut ep, "reboot now").unwrap_err();
        assert!(matches!(
            err,
            EndpointError::Protocol(ProtocolError::UnrecognizedCommand(_))
        ));
        assert!(ep.transport().written().is_empty());
        assert_eq!(router.lines_dropped(), 2);
    }

    #[test]
    fn test_unknown_verb_ignored() {
        let (mut router, mut ep) = setup();
        assert_eq!(
            router.dispatch(&mut ep, "arduino/servo/3/90").unwrap(),
            Routed::Ignored
        );
        assert!(ep.transport().written().is_empty());
    }

    #[test]
    fn test_poll_defers_response_frame() {
        let (mut router, mut ep) = setup();
        ep.transport_mut().feed(b"coap response<<");
        assert_eq!(router.poll(&mut ep).unwrap(), Routed::Deferred);
        assert_eq!(ep.transport().pending_input(), 15);
    }

    #[test]
    fn test_poll_defers_response_after_crlf_command() {
        let (mut router, mut ep) = setup();
        ep.transport_mut()
            .feed(b"arduino/digital/3/1\r\ncoap 2.05 CONTENT 42<<");

        assert!(matches!(router.poll(&mut ep).unwrap(), Routed::Pin { .. }));
        assert_eq!(router.poll(&mut ep).unwrap(), Routed::Deferred);
        assert_eq!(ep.transport().pending_input(), 22);

        let response = ep.await_response().unwrap();
        assert_eq!(response.text(), "coap 2.05 CONTENT 42");
        assert_eq!(router.poll(&mut ep).unwrap(), Routed::Idle);
    }

    #[test]
    fn test_poll_assembles_line_across_calls() {
        let (mut router, mut ep) = setup();
        ep.transport_mut().feed(b"arduino/digi");
        assert_eq!(router.poll(&mut ep).unwrap(), Routed::Idle);

        // a buffered partial line disables the peek guard
        ep.transport_mut().feed(b"tal/4/1<<\0");
        assert_eq!(
            router.poll(&mut ep).unwrap(),
            Routed::Pin {
                reply: "Pin D4 set to 1".to_string()
            }
        );
        assert_eq!(router.poll(&mut ep).unwrap(), Routed::Idle);
    }

    #[test]
    fn test_poll_drops_oversize_line() {
        let (mut router, mut ep) = setup();
        ep.transport_mut().feed(&[b'a'; MAX_RECORD_LEN + 1]);
        assert!(router.poll(&mut ep).is_err());
        assert_eq!(router.lines_dropped(), 1);
    }
}
