//! The endpoint: registry plus the peer link.
//!
//! Every exchange with the peer is strictly sequential. A record or request
//! is written, then exactly one response frame is awaited before anything
//! else is sent, so the frame read after a request always belongs to it.
//!
//! Waiting is a bounded busy-wait driven by the injected [`Clock`]: the
//! transport is drained, and each idle poll costs one `poll_interval` sleep.
//! After `max_passes` consecutive idle polls the wait fails with
//! [`EndpointError::Timeout`] and unread input is flushed so the next exchange
//! starts on a frame boundary.

use chariot_protocol::{
    encode_line, parse_motes, CoapRequest, ConsoleCommand, ProtocolError, Record,
    ResourceHandle, Response, ResponseFramer, StatusCode,
};
use tracing::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock, WaitPolicy};
use crate::config::EndpointConfig;
use crate::error::{EndpointError, EndpointResult};
use crate::metrics::metric_defs;
use crate::registry::ResourceRegistry;
use crate::transport::{SignalLine, Transport};

/// Reply produced locally for a wake request.
pub const WAKE_REPLY: &str = "Wakeup sent";

/// Reply produced locally for `sys/sleep=`; the peer goes down before it can
/// answer.
pub const SLEEP_REPLY: &str = "2.05 OK.";

// ============================================================================
// Endpoint
// ============================================================================

/// Host side of a Chariot serial link.
pub struct Endpoint<T: Transport, C: Clock = SystemClock> {
    transport: T,
    clock: C,
    registry: ResourceRegistry,
    config: EndpointConfig,
    framer: ResponseFramer,

    // Statistics
    requests_sent: u32,
    requests_succeeded: u32,
    requests_failed: u32,
}

impl<T: Transport> Endpoint<T, SystemClock> {
    /// Create an endpoint that sleeps on the wall clock.
    pub fn new(transport: T, config: EndpointConfig) -> EndpointResult<Self> {
        Self::with_clock(transport, SystemClock, config)
    }
}

impl<T: Transport, C: Clock> Endpoint<T, C> {
    /// Create an endpoint with an explicit clock.
    pub fn with_clock(transport: T, clock: C, config: EndpointConfig) -> EndpointResult<Self> {
        config.validate()?;
        Ok(Endpoint {
            transport,
            clock,
            registry: ResourceRegistry::new(config.capacity, config.max_line_len),
            config,
            framer: ResponseFramer::new(),
            requests_sent: 0,
            requests_succeeded: 0,
            requests_failed: 0,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Get the resource registry.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Get the resource registry for the allocate-then-set path.
    pub fn registry_mut(&mut self) -> &mut ResourceRegistry {
        &mut self.registry
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the transport mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Get the clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Get the number of lines written that expect an answer.
    pub fn requests_sent(&self) -> u32 {
        self.requests_sent
    }

    /// Get the number of exchanges answered with a success status.
    pub fn requests_succeeded(&self) -> u32 {
        self.requests_succeeded
    }

    /// Get the number of exchanges that were rejected or timed out.
    pub fn requests_failed(&self) -> u32 {
        self.requests_failed
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Register a resource and have the peer confirm it.
    ///
    /// The returned handle equals the registry length before the call. If the
    /// peer rejects the record or never answers, the handle is released again.
    pub fn create_resource(
        &mut self,
        uri: &str,
        max_len: usize,
        attr: &str,
    ) -> EndpointResult<ResourceHandle> {
        let handle = self.registry.reserve(uri, max_len, attr)?;
        let record = Record::CreateResource {
            handle,
            max_len,
            uri: uri.to_string(),
            attr: attr.to_string(),
        };

        match self.announce(&record) {
            Ok(response) => {
                info!("created resource {} at {} ({})", handle, uri, response);
                metrics::counter!(metric_defs::RESOURCES_CREATED.name).increment(1);
                self.update_registered_gauge();
                Ok(handle)
            }
            Err(e) => {
                warn!("create of {} failed, releasing handle {}: {}", uri, handle, e);
                self.registry.rollback(handle);
                Err(e)
            }
        }
    }

    /// Announce a resource built through [`ResourceRegistry::allocate`] and
    /// the individual setters.
    ///
    /// The handle is kept whether or not the peer accepts it.
    pub fn publish_resource(&mut self, handle: ResourceHandle) -> EndpointResult<()> {
        let resource = self
            .registry
            .get(handle)
            .ok_or(EndpointError::InvalidHandle(handle))?;
        let record = resource.create_record().ok_or_else(|| {
            EndpointError::InvalidArgument(format!(
                "resource {handle} needs uri, attribute and buffer limit before publishing"
            ))
        })?;

        let response = self.announce(&record)?;
        info!("published resource {} ({})", handle, response);
        metrics::counter!(metric_defs::RESOURCES_CREATED.name).increment(1);
        self.update_registered_gauge();
        Ok(())
    }

    /// Publish a new value for a resource.
    ///
    /// The event line, terminator included, must fit the resource's buffer
    /// limit; otherwise nothing is written. After the peer confirms, the
    /// resource-event line is pulsed if `notify_peer` is set so the peer fans
    /// the change out to subscribers.
    pub fn trigger_event(
        &mut self,
        handle: ResourceHandle,
        value: &str,
        notify_peer: bool,
    ) -> EndpointResult<()> {
        let resource = self
            .registry
            .get(handle)
            .ok_or(EndpointError::InvalidHandle(handle))?;
        let max = resource.max_frame_len().ok_or_else(|| {
            EndpointError::InvalidArgument(format!("resource {handle} has no buffer limit"))
        })?;

        let record = Record::Event {
            handle,
            value: value.to_string(),
        };
        let frame = record.encode_within(max).map_err(|e| match e {
            ProtocolError::RecordTooLong { max, actual } => {
                warn!(
                    "event for resource {} is {} bytes, exceeds buffer limit {}",
                    handle, actual, max
                );
                EndpointError::ValueTooLong { max, actual }
            }
            other => other.into(),
        })?;

        self.transmit(&frame)?;
        self.confirm()?;
        metrics::counter!(metric_defs::EVENTS_PUBLISHED.name).increment(1);

        if notify_peer {
            self.transport.signal(SignalLine::ResourceEvent)?;
        }
        debug!("resource {} now {:?} (notify={})", handle, value, notify_peer);
        Ok(())
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Send a CoAP-style request through the peer and return its answer.
    ///
    /// The remote status is returned as data; only a missing answer is an
    /// error. Nothing is written if the URL cannot be built.
    pub fn request(&mut self, request: &CoapRequest) -> EndpointResult<Response> {
        let frame = request.encode()?;
        debug!("sending request {}", String::from_utf8_lossy(&frame).trim_end());
        self.transmit(&frame)?;

        let response = self.await_tracked()?;
        if response.is_success() {
            self.requests_succeeded += 1;
        } else {
            self.requests_failed += 1;
            debug!("request answered with {}", response);
        }
        Ok(response)
    }

    /// Ask `mote` which of its resources are named `resource`.
    pub fn search_resources(&mut self, mote: &str, resource: &str) -> EndpointResult<Response> {
        let request = CoapRequest::search(mote, resource)?;
        self.request(&request)
    }

    /// List the motes the peer can reach.
    pub fn get_motes(&mut self) -> EndpointResult<Vec<String>> {
        let record = Record::Console {
            path: "sys/motes".to_string(),
        };
        self.transmit(&record.encode_bounded()?)?;
        let response = self.confirm()?;
        let motes = parse_motes(response.text(), self.config.max_motes);
        debug!("peer lists {} motes", motes.len());
        Ok(motes)
    }

    /// Run an operator console command against the peer.
    ///
    /// Returns the reply content with any `2.05 CONTENT ` header removed. A
    /// reply without status 2.05 is [`EndpointError::PeerRejected`].
    pub fn local_command(&mut self, command: &str) -> EndpointResult<String> {
        let console = ConsoleCommand::parse(command)?;

        let Some(record) = console.to_record() else {
            self.transport.signal(SignalLine::CoapEvent)?;
            info!("wakeup signal sent to peer");
            return Ok(WAKE_REPLY.to_string());
        };

        self.transmit(&record.encode_bounded()?)?;
        if console.is_sleep() {
            debug!("peer going to sleep, not waiting for an answer");
            return Ok(SLEEP_REPLY.to_string());
        }

        let response = self.await_tracked()?;
        if response.has_status(StatusCode::CONTENT) {
            self.requests_succeeded += 1;
            Ok(response.content().to_string())
        } else {
            Err(self.rejected(response))
        }
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Wait for the peer's online banner, then start from an empty registry.
    ///
    /// If a location is configured it is announced to the peer. Returns the
    /// banner.
    pub fn begin(&mut self) -> EndpointResult<Response> {
        info!("waiting for peer to come online");
        let policy = self.config.startup_policy();
        let banner = self.await_response_within(policy)?;
        info!("peer online: {}", banner);

        self.registry.clear();
        self.update_registered_gauge();

        if let Some(location) = self.config.location.clone() {
            let reply = self.local_command(&format!("location={location}"))?;
            info!("location set: {}", reply);
        }
        Ok(banner)
    }

    // ========================================================================
    // Response Waiting
    // ========================================================================

    /// Wait for one response frame under the configured policy.
    pub fn await_response(&mut self) -> EndpointResult<Response> {
        let policy = self.config.wait_policy();
        self.await_response_within(policy)
    }

    /// Wait for one response frame.
    ///
    /// Received bytes reset the idle count. The wait sleeps exactly
    /// `policy.max_passes` times before giving up.
    pub fn await_response_within(&mut self, policy: WaitPolicy) -> EndpointResult<Response> {
        self.framer.reset();
        let mut idle: u32 = 0;

        loop {
            let mut received = false;
            while let Some(byte) = self.transport.read_byte() {
                received = true;
                match self.framer.push(byte) {
                    Ok(Some(content)) => {
                        let response = Response::parse(&content);
                        trace!("response: {}", response);
                        return Ok(response);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let dropped = self.transport.flush_input();
                        warn!("discarding oversize response and {} unread bytes", dropped);
                        return Err(e.into());
                    }
                }
            }

            if received {
                idle = 0;
                continue;
            }
            if idle >= policy.max_passes {
                return Err(self.timed_out(policy.max_passes));
            }
            idle += 1;
            self.clock.sleep(policy.poll_interval);
        }
    }

    /// Sleep for the put-handler grace period.
    pub fn settle(&mut self) {
        let delay = self.config.settle_delay();
        self.clock.sleep(delay);
    }

    // ========================================================================
    // Protocol Helpers
    // ========================================================================

    /// Write a line that expects no answer.
    pub(crate) fn send_line(&mut self, text: &str) -> EndpointResult<()> {
        trace!("sending line {:?}", text);
        self.transport.write(&encode_line(text))?;
        Ok(())
    }

    /// Write a frame that expects an answer.
    fn transmit(&mut self, frame: &[u8]) -> EndpointResult<()> {
        trace!("sending {} bytes", frame.len());
        self.transport.write(frame)?;
        self.requests_sent += 1;
        Ok(())
    }

    /// Write a create record, pulse the resource line, and await confirmation.
    fn announce(&mut self, record: &Record) -> EndpointResult<Response> {
        let frame = record.encode_bounded()?;
        self.transmit(&frame)?;
        self.transport.signal(SignalLine::ResourceEvent)?;
        self.confirm()
    }

    /// Await a response and require a success status.
    fn confirm(&mut self) -> EndpointResult<Response> {
        let response = self.await_tracked()?;
        if response.is_success() {
            self.requests_succeeded += 1;
            Ok(response)
        } else {
            Err(self.rejected(response))
        }
    }

    /// Await a response, counting a timeout as a failed exchange.
    fn await_tracked(&mut self) -> EndpointResult<Response> {
        self.await_response().inspect_err(|_| {
            self.requests_failed += 1;
        })
    }

    fn rejected(&mut self, response: Response) -> EndpointError {
        warn!("peer rejected request: {}", response);
        metrics::counter!(metric_defs::RESPONSES_REJECTED.name).increment(1);
        self.requests_failed += 1;
        EndpointError::PeerRejected {
            response: response.into_text(),
        }
    }

    fn timed_out(&mut self, passes: u32) -> EndpointError {
        let partial = self.framer.partial();
        self.framer.reset();
        let dropped = self.transport.flush_input();
        warn!(
            "no response after {} idle polls (partial {:?}, flushed {} bytes)",
            passes, partial, dropped
        );
        metrics::counter!(metric_defs::RESPONSE_TIMEOUTS.name).increment(1);
        EndpointError::Timeout { passes }
    }

    fn update_registered_gauge(&self) {
        metrics::gauge!(metric_defs::RESOURCES_REGISTERED.name).set(self.registry.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::transport::MemoryTransport;

    fn endpoint() -> Endpoint<MemoryTransport, ManualClock> {
        Endpoint::with_clock(
            MemoryTransport::new(),
            ManualClock::new(),
            EndpointConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EndpointConfig {
            capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            Endpoint::with_clock(MemoryTransport::new(), ManualClock::new(), config),
            Err(EndpointError::Config(_))
        ));
    }

    #[test]
    fn test_partial_frame_times_out() {
        let mut ep = endpoint();
        ep.transport_mut().feed(b"2.05 CONT");
        let policy = WaitPolicy {
            poll_interval: std::time::Duration::from_millis(10),
            max_passes: 3,
        };
        assert!(matches!(
            ep.await_response_within(policy),
            Err(EndpointError::Timeout { passes: 3 })
        ));
        assert_eq!(ep.clock().sleeps(), 3);
    }

    #[test]
    fn test_wait_flushes_after_oversize_frame() {
        let mut ep = endpoint();
        let mut data = vec![b'x'; chariot_protocol::MAX_RESPONSE_LEN + 1];
        data.extend_from_slice(b"tail<<");
        ep.transport_mut().feed(&data);
        assert!(matches!(
            ep.await_response(),
            Err(EndpointError::Protocol(ProtocolError::FrameTooLong { .. }))
        ));
        assert_eq!(ep.transport().pending_input(), 0);
    }

    #[test]
    fn test_statistics() {
        let mut ep = endpoint();
        ep.transport_mut().queue_reply(b"2.01 CREATED<<");
        ep.transport_mut().queue_reply(b"4.04 NOT_FOUND<<");
        ep.create_resource("event/lamp", 32, "rt=light").unwrap();
        assert!(ep.create_resource("event/door", 32, "rt=door").is_err());
        assert_eq!(ep.requests_sent(), 2);
        assert_eq!(ep.requests_succeeded(), 1);
        assert_eq!(ep.requests_failed(), 1);
    }

    #[test]
    fn test_send_line_expects_nothing() {
        let mut ep = endpoint();
        ep.send_line("Pin D13 set to 1").unwrap();
        assert_eq!(ep.transport().written(), b"Pin D13 set to 1\n");
        assert_eq!(ep.requests_sent(), 0);
    }
}
