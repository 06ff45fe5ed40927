//! GPS Sensor Module
//!
//! Provides the latest position snapshot to the control loop. The serial
//! receiver is optional: without it the readings stay at their defaults.

mod nmea;
mod serial;

pub use serial::SerialGps;

use anyhow::Result;
use async_trait::async_trait;
use autonomia_shared::Readings;

/// Source of sensor readings
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Latest snapshot. Errors when the underlying device is gone.
    async fn readings(&self) -> Result<Readings>;
}
