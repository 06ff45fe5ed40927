//! Configuration handlers: get_config, set_config, set_telemetry_period

use super::{number_param, outcome, HandlerContext};
use crate::config::period_from_secs;
use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

/// Handle `get_config` - full live configuration
pub async fn handle_get_config(ctx: &HandlerContext, _params: &Value) -> Result<Value> {
    Ok(ctx.config.snapshot().await)
}

/// Handle `set_config` - replace one or more whole sections, all or nothing
pub async fn handle_set_config(ctx: &HandlerContext, params: &Value) -> Result<Value> {
    let Some(update) = params.as_object() else {
        return Ok(outcome(false));
    };

    match ctx.config.replace_sections(update.clone()).await {
        Ok(count) => {
            info!("  [SET_CONFIG] Replaced {} section(s)", count);
            Ok(outcome(true))
        }
        Err(e) => {
            warn!("  [SET_CONFIG] Rejected: {}", e);
            Ok(outcome(false))
        }
    }
}

/// Handle `set_telemetry_period` - `{"period": seconds}`, seconds > 0
pub async fn handle_set_telemetry_period(ctx: &HandlerContext, params: &Value) -> Result<Value> {
    let Some(period) = number_param(params, "period") else {
        return Ok(outcome(false));
    };
    if period_from_secs(period).is_none() {
        return Ok(outcome(false));
    }

    ctx.config.set_telemetry_period(period).await;
    info!("  [SET_TELEMETRY_PERIOD] {}s", period);
    Ok(outcome(true))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_get_config_returns_sections() {
        let ctx = context();
        let config = handle_get_config(&ctx, &Value::Null).await.unwrap();
        assert_eq!(config["gps"]["speed"], 9600);
        assert_eq!(config.as_object().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_set_config_bogus_section_is_atomic() {
        let ctx = context();
        let before = handle_get_config(&ctx, &Value::Null).await.unwrap();

        let reply = handle_set_config(&ctx, &json!({"bogus_section": {}}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"success": false}));

        // A valid section alongside an invalid one is not applied either
        let reply = handle_set_config(&ctx, &json!({"video": {"fps": 10}, "cometa": {}}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"success": false}));

        let after = handle_get_config(&ctx, &Value::Null).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_set_config_replaces_sections() {
        let ctx = context();
        let reply = handle_set_config(
            &ctx,
            &json!({"video": {"fps": 10}, "arduino": {"serial": "/dev/ttyACM0"}}),
        )
        .await
        .unwrap();
        assert_eq!(reply, json!({"success": true}));

        let config = handle_get_config(&ctx, &Value::Null).await.unwrap();
        assert_eq!(config["video"], json!({"fps": 10}));
        assert_eq!(config["arduino"], json!({"serial": "/dev/ttyACM0"}));
    }

    #[tokio::test]
    async fn test_set_config_requires_object() {
        let ctx = context();
        for params in [json!(null), json!([{"video": {}}]), json!("video")] {
            let reply = handle_set_config(&ctx, &params).await.unwrap();
            assert_eq!(reply, json!({"success": false}));
        }
    }

    #[tokio::test]
    async fn test_set_telemetry_period() {
        let ctx = context();
        let reply = handle_set_telemetry_period(&ctx, &json!({"period": 2}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"success": true}));
        assert_eq!(ctx.config.telemetry_period().await, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_set_telemetry_period_rejects_bad_values() {
        let ctx = context();
        for params in [
            json!({"period": 0}),
            json!({"period": -3}),
            json!({"period": 1e300}),
            json!({"period": "5"}),
            json!({}),
            json!([5]),
            Value::Null,
        ] {
            let reply = handle_set_telemetry_period(&ctx, &params).await.unwrap();
            assert_eq!(reply, json!({"success": false}), "params {}", params);
        }
        assert_eq!(ctx.config.telemetry_period().await, Duration::from_secs(5));
    }
}
