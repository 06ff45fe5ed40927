//! Shared vehicle state
//!
//! Every read-modify-write happens under one guard of the inner lock, so
//! status replies and telemetry always see fields from a single point in time.

use autonomia_shared::{
    now_ms, timing, DriveMode, GpsFix, Readings, RunState, StatusSnapshot, Telemetry, TransitionError,
    VehicleEvent,
};
use super::Actuator;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;

/// Servo position for straight ahead / stopped
pub const NEUTRAL: f64 = 90.0;

pub type SharedVehicle = Arc<VehicleState>;

/// Plain data behind the lock
#[derive(Debug, Clone, PartialEq)]
struct VehicleStatus {
    run_state: RunState,
    mode: DriveMode,
    steering: f64,
    throttle: f64,
    readings: Readings,
}

impl Default for VehicleStatus {
    fn default() -> Self {
        Self {
            run_state: RunState::Starting,
            mode: DriveMode::default(),
            steering: NEUTRAL,
            throttle: NEUTRAL,
            readings: Readings::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct VehicleState {
    inner: RwLock<VehicleStatus>,
}

impl VehicleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedVehicle {
        Arc::new(Self::new())
    }

    /// Apply a run state event atomically
    pub async fn transition(&self, event: VehicleEvent) -> Result<RunState, TransitionError> {
        let mut status = self.inner.write().await;
        let next = status.run_state.apply(event)?;
        status.run_state = next;
        Ok(next)
    }

    pub async fn run_state(&self) -> RunState {
        self.inner.read().await.run_state
    }

    /// Drive the actuator and record the new position while holding the write
    /// guard, so the stored value always matches the last accepted command.
    /// The actuator gets `ACTUATOR_TIMEOUT_MS` before the guard is released.
    pub async fn apply_steering(&self, actuator: &dyn Actuator, value: f64) -> Result<()> {
        let limit = Duration::from_millis(timing::ACTUATOR_TIMEOUT_MS);
        let mut status = self.inner.write().await;
        timeout(limit, actuator.set_steering(value))
            .await
            .map_err(|_| anyhow!("{} did not answer within {:?}", actuator.name(), limit))??;
        status.steering = value;
        Ok(())
    }

    pub async fn set_throttle(&self, value: f64) {
        self.inner.write().await.throttle = value;
    }

    /// Replace the sensor snapshot as a whole
    pub async fn replace_readings(&self, readings: Readings) {
        self.inner.write().await.readings = readings;
    }

    pub async fn status(&self) -> StatusSnapshot {
        let status = self.inner.read().await;
        StatusSnapshot {
            state: status.run_state,
            mode: status.mode,
            steering: status.steering,
            throttle: status.throttle,
            gps: GpsFix {
                lat: status.readings.lat,
                lon: status.readings.lon,
            },
        }
    }

    pub async fn telemetry(&self, device_id: &str) -> Telemetry {
        let status = self.inner.read().await;
        Telemetry {
            device_id: device_id.to_string(),
            timestamp_ms: now_ms(),
            state: status.run_state,
            mode: status.mode,
            steering: status.steering,
            throttle: status.throttle,
            gps: status.readings.clone(),
        }
    }
}
