//! Status and telemetry payloads

use crate::RunState;
use serde::{Deserialize, Serialize};

/// Driving mode of the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveMode {
    /// Manual driving while recording training data
    #[default]
    Training,
    /// Vehicle drives itself
    Autonomous,
}

/// Latest sensor snapshot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Readings {
    pub lat: f64,
    pub lon: f64,
    /// Altitude above mean sea level in meters
    pub alt: f64,
    /// Ground speed in knots
    pub speed: f64,
    pub satellites: u32,
    /// Whether the receiver reports a valid fix
    pub fix: bool,
    /// When these readings were taken (ms since epoch, 0 = never)
    pub timestamp_ms: u64,
}

/// Position subset exposed by `get_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub lat: f64,
    pub lon: f64,
}

/// Reply of the `get_status` method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: RunState,
    pub mode: DriveMode,
    pub steering: f64,
    pub throttle: f64,
    #[serde(rename = "GPS")]
    pub gps: GpsFix,
}

/// Periodic outbound status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub device_id: String,
    pub timestamp_ms: u64,
    pub state: RunState,
    pub mode: DriveMode,
    pub steering: f64,
    pub throttle: f64,
    #[serde(rename = "GPS")]
    pub gps: Readings,
}
