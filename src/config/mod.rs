//! Gateway configuration
//!
//! This module handles:
//! - Loading the JSON configuration file at startup
//! - The live, runtime-patchable configuration shared with RPC handlers

mod live;
mod settings;

pub use live::{period_from_secs, LiveConfig, SharedConfig};
pub use settings::{GatewayConfig, RelaySettings, RexecSettings};
