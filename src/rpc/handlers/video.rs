//! Video device listing handler

use super::HandlerContext;
use anyhow::Result;
use serde_json::{json, Value};

/// Handle `video_devices` - `{"devices": [...], "names": [...]}`
pub async fn handle_video_devices(ctx: &HandlerContext, _params: &Value) -> Result<Value> {
    let found = ctx.cameras.list().await?;
    Ok(json!({
        "devices": found.devices,
        "names": found.names,
    }))
}
