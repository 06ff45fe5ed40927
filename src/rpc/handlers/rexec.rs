//! Remote shell execution handler
//!
//! Any caller that can reach the dispatcher could run arbitrary commands on
//! the vehicle, so the method is off unless `rexec.token` is configured and
//! every call presents it. Commands are killed after `rexec.timeout_secs`.

use super::{rejected, HandlerContext};
use anyhow::Result;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Handle `rexec` - `["<shell command>", "<token>"]`
pub async fn handle_rexec(ctx: &HandlerContext, params: &Value) -> Result<Value> {
    let Some(args) = params.as_array().filter(|args| !args.is_empty()) else {
        return Ok(rejected("Parameter must be a not empty list"));
    };
    let Some(command) = args[0].as_str() else {
        return Ok(rejected("Command must be a string"));
    };

    let Some(expected) = ctx.rexec.token.as_deref() else {
        warn!("  [REXEC] Refused, remote execution is disabled");
        return Ok(rejected("Remote execution is disabled"));
    };
    if args.get(1).and_then(Value::as_str) != Some(expected) {
        warn!("  [REXEC] Refused, bad or missing token");
        return Ok(rejected("Not authorized"));
    }

    info!("  [REXEC] {}", command);
    Ok(run_shell(command, ctx.rexec.timeout()).await)
}

/// Run `command` through `sh -c`, returning its stdout prefixed with a newline
async fn run_shell(command: &str, limit: Duration) -> Value {
    let child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!("  [REXEC] Spawn failed: {}", e);
            return rejected("Invalid command.");
        }
    };

    // On timeout the child is dropped and killed
    match timeout(limit, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => {
            Value::String(format!("\n{}", String::from_utf8_lossy(&output.stdout)))
        }
        Ok(Ok(output)) => {
            warn!("  [REXEC] Exited with {}", output.status);
            rejected("Invalid command.")
        }
        Ok(Err(e)) => {
            warn!("  [REXEC] Wait failed: {}", e);
            rejected("Invalid command.")
        }
        Err(_) => {
            warn!("  [REXEC] Timed out after {:?}", limit);
            rejected("Command timed out")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::context;
    use super::*;
    use crate::config::RexecSettings;
    use serde_json::json;

    fn authorized(timeout_secs: u64) -> HandlerContext {
        let mut ctx = context();
        ctx.rexec = RexecSettings {
            token: Some("letmein".into()),
            timeout_secs,
        };
        ctx
    }

    #[tokio::test]
    async fn test_runs_command() {
        let ctx = authorized(5);
        let reply = handle_rexec(&ctx, &json!(["echo hello", "letmein"]))
            .await
            .unwrap();
        assert_eq!(reply, json!("\nhello\n"));
    }

    #[tokio::test]
    async fn test_disabled_without_token() {
        let ctx = context();
        let reply = handle_rexec(&ctx, &json!(["echo hello", "letmein"]))
            .await
            .unwrap();
        assert_eq!(reply["success"], false);
        assert_eq!(reply["msg"], "Remote execution is disabled");
    }

    #[tokio::test]
    async fn test_wrong_token() {
        let ctx = authorized(5);
        for params in [json!(["echo hello"]), json!(["echo hello", "guess"])] {
            let reply = handle_rexec(&ctx, &params).await.unwrap();
            assert_eq!(reply["msg"], "Not authorized");
        }
    }

    #[tokio::test]
    async fn test_bad_params() {
        let ctx = authorized(5);
        for params in [json!([]), json!("echo hi"), json!({"cmd": "echo"}), json!([42])] {
            let reply = handle_rexec(&ctx, &params).await.unwrap();
            assert_eq!(reply["success"], false, "params {}", params);
        }
    }

    #[tokio::test]
    async fn test_failing_command() {
        let ctx = authorized(5);
        let reply = handle_rexec(&ctx, &json!(["exit 3", "letmein"]))
            .await
            .unwrap();
        assert_eq!(reply, json!({"success": false, "msg": "Invalid command."}));
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let ctx = authorized(1);
        let started = std::time::Instant::now();
        let reply = handle_rexec(&ctx, &json!(["sleep 30", "letmein"]))
            .await
            .unwrap();
        assert_eq!(reply["msg"], "Command timed out");
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
