//! RPC method handlers
//!
//! Expected validation failures (wrong type, missing key, out of range) are
//! reported as ordinary results: `{"success": false}`. Only unexpected
//! failures return `Err`, which the dispatcher turns into an Internal Error.

mod config;
mod drive;
mod rexec;
mod status;
mod video;

pub use config::{handle_get_config, handle_set_config, handle_set_telemetry_period};
pub use drive::{handle_set_steering, handle_set_throttle};
pub use rexec::handle_rexec;
pub use status::handle_get_status;
pub use video::handle_video_devices;

use super::Method;
use crate::camera::{DeviceEnumerator, V4lEnumerator};
use crate::config::{RexecSettings, SharedConfig};
use crate::vehicle::{Actuator, SharedVehicle};
use anyhow::Result;
use serde_json::{json, Value};
use std::sync::Arc;

/// Everything a handler may read or mutate
#[derive(Clone)]
pub struct HandlerContext {
    pub vehicle: SharedVehicle,
    pub config: SharedConfig,
    pub actuator: Arc<dyn Actuator>,
    pub cameras: Arc<dyn DeviceEnumerator>,
    pub rexec: RexecSettings,
}

impl HandlerContext {
    pub fn new(vehicle: SharedVehicle, config: SharedConfig, actuator: Arc<dyn Actuator>) -> Self {
        Self {
            vehicle,
            config,
            actuator,
            cameras: Arc::new(V4lEnumerator::default()),
            rexec: RexecSettings::default(),
        }
    }
}

/// Run the handler for `method`
pub async fn invoke(method: Method, ctx: &HandlerContext, params: &Value) -> Result<Value> {
    match method {
        Method::Rexec => handle_rexec(ctx, params).await,
        Method::VideoDevices => handle_video_devices(ctx, params).await,
        Method::SetTelemetryPeriod => handle_set_telemetry_period(ctx, params).await,
        Method::GetConfig => handle_get_config(ctx, params).await,
        Method::SetConfig => handle_set_config(ctx, params).await,
        Method::GetStatus => handle_get_status(ctx, params).await,
        Method::SetThrottle => handle_set_throttle(ctx, params).await,
        Method::SetSteering => handle_set_steering(ctx, params).await,
    }
}

fn outcome(success: bool) -> Value {
    json!({ "success": success })
}

fn rejected(msg: &str) -> Value {
    json!({ "success": false, "msg": msg })
}

/// Numeric member of an object parameter
fn number_param(params: &Value, key: &str) -> Option<f64> {
    params.as_object()?.get(key)?.as_f64()
}
