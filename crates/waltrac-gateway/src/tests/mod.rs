//! Integration tests for the gateway.
//!
//! - `harness.rs`  - Recording broker connector and signed fixtures
//! - `position.rs` - Position resource outcomes and republished events
//! - `coap.rs`     - End-to-end CoAP requests over loopback UDP

mod coap;
