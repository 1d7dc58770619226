//! Chariot Endpoint Serial Protocol
//!
//! This crate provides types and utilities for talking to a Chariot peer
//! device (a networking co-processor) over its serial link. The host registers
//! resources with the peer, publishes their values, answers remote commands
//! and asks the peer to perform CoAP-style requests on its behalf.
//!
//! # Protocol Overview
//!
//! - **Records** (host → peer): `%`-separated `key=value` lines terminated
//!   with `\n`, e.g. `rsrc=0%value=on`
//! - **Responses** (peer → host): text closed by the `<<` sentinel, starting
//!   with a status code such as `2.01 CREATED`
//! - **Commands** (peer → host): lines under `arduino/` (pin access) or
//!   `event/` (resource PUT)
//! - **Requests** (host → peer): `coap://<host>/<name>?<verb>...` URLs
//!
//! # Example
//!
//! ```rust
//! use chariot_protocol::{Record, ResourceHandle, ResponseFramer, Response};
//!
//! let record = Record::Event { handle: ResourceHandle(0), value: "on".into() };
//! assert_eq!(record.encode(), b"rsrc=0%value=on\n");
//!
//! let mut framer = ResponseFramer::new();
//! let (content, _) = framer.push_slice(b"2.01 CREATED<<").unwrap().unwrap();
//! assert!(Response::parse(&content).is_success());
//! ```

mod codec;
mod console;
mod constants;
mod error;
mod inbound;
mod motes;
mod records;
mod request;
mod responses;
mod types;

pub use codec::*;
pub use console::*;
pub use constants::*;
pub use error::*;
pub use inbound::*;
pub use motes::*;
pub use records::*;
pub use request::*;
pub use responses::*;
pub use types::*;
