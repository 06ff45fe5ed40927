//! JSON-RPC command surface for the vehicle
//!
//! This module handles:
//! - Parsing and validating inbound JSON-RPC 2.0 messages
//! - Routing them through the method registry to handlers
//! - Building protocol-compliant replies and error objects

mod dispatcher;
pub mod handlers;
mod registry;

pub use dispatcher::Dispatcher;
pub use handlers::HandlerContext;
pub use registry::{Method, MethodDescriptor, MethodRegistry};
