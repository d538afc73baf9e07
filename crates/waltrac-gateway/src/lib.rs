//! Waltrac gateway: authenticated device ingestion over CoAP.
//!
//! Devices POST signed position reports. Each report is decoded, checked
//! against the shared secret, turned into a compact JSON event and
//! republished to the broker under `<toplevel>/position/<device>`.
//!
//! # Architecture
//!
//! ```text
//! device --CoAP--> CoapServer -> Router -> PositionResource -> Publisher -> broker
//!                                      \-> CommandResource (signed diagnostic)
//! ```

pub mod coap;
pub mod context;
pub mod error;
pub mod event;
pub mod resource;

#[cfg(test)]
mod tests;

pub use coap::{CoapServer, Router, MAX_DATAGRAM_SIZE};
pub use context::GatewayContext;
pub use error::{GatewayError, GatewayResult};
pub use event::PositionEvent;
pub use resource::{
    CommandResource, Outcome, PositionResource, DIAGNOSTIC_ARG, DIAGNOSTIC_HEADER,
};
