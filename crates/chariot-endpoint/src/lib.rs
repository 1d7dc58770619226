//! Chariot endpoint engine.
//!
//! This crate drives the host side of a Chariot serial link:
//!
//! - [`ResourceRegistry`] holds the resources the host exposes
//! - [`Endpoint`] creates resources, publishes events, runs console commands
//!   and sends CoAP-style requests, waiting for each answer in turn
//! - [`CommandRouter`] reads commands the peer forwards and runs them against
//!   the board pins or the resources' PUT handlers
//!
//! I/O goes through three seams: [`Transport`] for the byte stream, [`PinIo`]
//! for the board, and [`Clock`] for every wait.
//!
//! # Example
//!
//! ```rust
//! use chariot_endpoint::{
//!     CommandRouter, Endpoint, EndpointConfig, ManualClock, MemoryTransport, Routed,
//!     SimulatedPins,
//! };
//!
//! let mut transport = MemoryTransport::new();
//! transport.queue_reply(b"2.01 CREATED<<");
//! let mut endpoint =
//!     Endpoint::with_clock(transport, ManualClock::new(), EndpointConfig::default()).unwrap();
//!
//! let lamp = endpoint.create_resource("lamp", 32, "title=\"Lamp\"").unwrap();
//! endpoint
//!     .registry_mut()
//!     .set_put_handler(lamp, |params: &str| Some(params.to_string()))
//!     .unwrap();
//!
//! let mut router = CommandRouter::new(SimulatedPins::new());
//! endpoint.transport_mut().queue_reply(b"2.04 CHANGED<<");
//! endpoint.transport_mut().feed(b"event/lamp&on\n");
//! let routed = router.poll(&mut endpoint).unwrap();
//! assert!(matches!(routed, Routed::Put { .. }));
//! ```

pub mod clock;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod pins;
pub mod registry;
pub mod router;
pub mod transport;

pub use chariot_protocol as protocol;

pub use crate::clock::{Clock, ManualClock, SystemClock, WaitPolicy};
pub use crate::config::{EndpointConfig, ResourceConfig};
pub use crate::endpoint::Endpoint;
pub use crate::error::{EndpointError, EndpointResult};
pub use crate::metrics::describe_metrics;
pub use crate::pins::{PinIo, SimulatedPins};
pub use crate::registry::{PutHandler, Resource, ResourceRegistry, MAX_CAPACITY};
pub use crate::router::{CommandRouter, Routed};
pub use crate::transport::{MemoryTransport, SignalLine, Transport, TcpTransport};
