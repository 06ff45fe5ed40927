//! Status handler

use super::HandlerContext;
use anyhow::Result;
use serde_json::Value;

/// Handle `get_status` - state, mode, steering, throttle and GPS position
pub async fn handle_get_status(ctx: &HandlerContext, _params: &Value) -> Result<Value> {
    let status = ctx.vehicle.status().await;
    Ok(serde_json::to_value(status)?)
}
