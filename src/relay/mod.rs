//! Relay session to the cloud
//!
//! This module handles:
//! - A persistent framed TCP connection with automatic reconnection
//! - The attach message identifying this device
//! - Delivering inbound messages as events and queueing outbound payloads

mod manager;
mod traits;

pub use manager::{ConnectionConfig, ConnectionEvent, ConnectionManager, RelayHandle};
pub use traits::RelaySink;
