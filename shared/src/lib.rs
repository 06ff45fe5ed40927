//! Autonomia Shared Protocol Types
//!
//! This crate provides the JSON-RPC wire types, telemetry payloads and frame
//! codec shared by the edge gateway and the development relay.

pub mod codec;
pub mod jsonrpc;
pub mod state_machine;
pub mod telemetry;

use std::time::{SystemTime, UNIX_EPOCH};

pub use jsonrpc::{ErrorObject, ErrorResponse, RequestId, SuccessResponse};
pub use state_machine::{RunState, TransitionError, VehicleEvent};
pub use telemetry::{DriveMode, GpsFix, Readings, StatusSnapshot, Telemetry};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing parameters for the device control loop
pub mod timing {
    /// Minimum sleep between control loop ticks
    pub const TICK_INTERVAL_MS: u64 = 200;

    /// Sensor sampling cadence
    pub const SENSOR_PERIOD_MS: u64 = 1000;

    /// Telemetry period used when `app_params.telemetry_period` is missing or invalid
    pub const DEFAULT_TELEMETRY_PERIOD_SECS: f64 = 5.0;

    /// Default upper bound for a remote shell command
    pub const DEFAULT_REXEC_TIMEOUT_SECS: u64 = 10;

    /// Upper bound for one actuator command
    pub const ACTUATOR_TIMEOUT_MS: u64 = 1000;
}

/// Attach message sent as the first frame of every relay connection
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attach {
    pub attach: String,
    pub platform: String,
}

impl Attach {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            attach: device_id.into(),
            platform: "Autonomia".into(),
        }
    }
}
