//! Drive handlers: set_throttle, set_steering

use super::{number_param, outcome, HandlerContext};
use anyhow::Result;
use serde_json::Value;
use tracing::info;

/// Servo range accepted for both throttle and steering
const MIN_POSITION: f64 = 0.0;
const MAX_POSITION: f64 = 180.0;

/// Extract `value` when it is a number within the servo range
fn position(params: &Value) -> Option<f64> {
    number_param(params, "value").filter(|v| (MIN_POSITION..=MAX_POSITION).contains(v))
}

/// Handle `set_throttle` - `{"value": 0..=180}`
pub async fn handle_set_throttle(ctx: &HandlerContext, params: &Value) -> Result<Value> {
    let Some(value) = position(params) else {
        return Ok(outcome(false));
    };

    ctx.vehicle.set_throttle(value).await;
    info!("  [SET_THROTTLE] {}", value);
    Ok(outcome(true))
}

/// Handle `set_steering` - `{"value": 0..=180}`, forwarded to the actuator
pub async fn handle_set_steering(ctx: &HandlerContext, params: &Value) -> Result<Value> {
    let Some(value) = position(params) else {
        return Ok(outcome(false));
    };

    ctx.vehicle
        .apply_steering(ctx.actuator.as_ref(), value)
        .await?;
    info!("  [SET_STEERING] {} via {}", value, ctx.actuator.name());
    Ok(outcome(true))
}
