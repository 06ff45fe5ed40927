//! Actuator abstraction for steering output

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Drives the physical steering servo
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Move steering to `value` degrees in [0, 180]
    async fn set_steering(&self, value: f64) -> Result<()>;

    /// Human-readable name for this actuator
    fn name(&self) -> &'static str;
}

/// Actuator that only records the requested position in the log.
/// Used when no motor controller is attached.
#[derive(Debug, Default)]
pub struct LoggingActuator;

#[async_trait]
impl Actuator for LoggingActuator {
    async fn set_steering(&self, value: f64) -> Result<()> {
        info!("[ACTUATOR] steering -> {}", value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
