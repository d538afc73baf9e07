//! Behavioural tests for the publisher.
//!
//! - `harness.rs`  - Scripted in-memory broker connector
//! - `connect.rs`  - Readiness gating, retries and topic naming
//! - `failure.rs`  - Send and keepalive failures while connected
//! - `shutdown.rs` - Start/stop lifecycle

mod shutdown;
