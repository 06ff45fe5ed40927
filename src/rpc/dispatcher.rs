//! JSON-RPC dispatcher - validates, routes and answers inbound messages

use super::handlers::{self, HandlerContext};
use super::MethodRegistry;
use crate::camera::DeviceEnumerator;
use crate::config::{RexecSettings, SharedConfig};
use crate::vehicle::{Actuator, SharedVehicle};
use autonomia_shared::jsonrpc::JSONRPC_VERSION;
use autonomia_shared::{ErrorObject, ErrorResponse, RequestId, SuccessResponse};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Serialized last resort if a reply cannot be encoded
const INTERNAL_ERROR_FALLBACK: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// Params passed to handlers when the request has none
static NO_PARAMS: Value = Value::Null;

/// A reply ready to be sent back through the relay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Reply {
    fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Reply::Error(ErrorResponse::new(id, error))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("Failed to encode reply: {}", e);
            INTERNAL_ERROR_FALLBACK.to_string()
        })
    }
}

/// A structurally valid request
#[derive(Debug)]
struct Envelope<'a> {
    id: RequestId,
    method: &'a str,
    params: &'a Value,
}

impl<'a> Envelope<'a> {
    /// Check `jsonrpc`, `method` and `id`. On failure, returns whatever id
    /// could still be recovered so the error can be correlated.
    fn validate(request: &'a Value) -> Result<Self, Option<RequestId>> {
        let Some(object) = request.as_object() else {
            return Err(None);
        };

        let id = object.get("id").and_then(RequestId::from_value);
        let version = object.get("jsonrpc").and_then(Value::as_str);
        let method = object.get("method").and_then(Value::as_str);

        match (id, version, method) {
            (Some(id), Some(JSONRPC_VERSION), Some(method)) => Ok(Envelope {
                id,
                method,
                params: object.get("params").unwrap_or(&NO_PARAMS),
            }),
            (id, _, _) => Err(id),
        }
    }
}

/// Stateless per call; handlers hold the shared state
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    ctx: HandlerContext,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<MethodRegistry>,
        vehicle: SharedVehicle,
        config: SharedConfig,
        actuator: Arc<dyn Actuator>,
    ) -> Self {
        Self {
            registry,
            ctx: HandlerContext::new(vehicle, config, actuator),
        }
    }

    pub fn with_cameras(mut self, cameras: Arc<dyn DeviceEnumerator>) -> Self {
        self.ctx.cameras = cameras;
        self
    }

    pub fn with_rexec(mut self, settings: RexecSettings) -> Self {
        self.ctx.rexec = settings;
        self
    }

    /// Handle one raw inbound message and return the serialized reply
    pub async fn handle(&self, raw: &[u8]) -> String {
        self.dispatch(raw).await.to_json()
    }

    pub async fn dispatch(&self, raw: &[u8]) -> Reply {
        let request: Value = match serde_json::from_slice(raw) {
            Ok(request) => request,
            Err(_) => {
                warn!(
                    "Received JSON-RPC invalid message (parse error): {}",
                    String::from_utf8_lossy(raw).escape_debug()
                );
                return Reply::error(None, ErrorObject::parse_error());
            }
        };

        let envelope = match Envelope::validate(&request) {
            Ok(envelope) => envelope,
            Err(Some(id)) => {
                warn!("Malformed JSON-RPC request id={}", id);
                return Reply::error(Some(id), ErrorObject::invalid_params());
            }
            Err(None) => {
                warn!("Malformed JSON-RPC request without usable id");
                return Reply::error(None, ErrorObject::invalid_request());
            }
        };

        info!("JSON-RPC: {} id={}", envelope.method, envelope.id);

        let Some(method) = self.registry.lookup(envelope.method) else {
            warn!("Method not found: {}", envelope.method);
            return Reply::error(Some(envelope.id), ErrorObject::method_not_found());
        };

        let outcome = AssertUnwindSafe(handlers::invoke(method, &self.ctx, envelope.params))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => Reply::Success(SuccessResponse::new(envelope.id, result)),
            Ok(Err(e)) => {
                error!("Method {} failed: {:#}", envelope.method, e);
                Reply::error(Some(envelope.id), ErrorObject::internal_error())
            }
            Err(_) => {
                error!("Method {} panicked", envelope.method);
                Reply::error(Some(envelope.id), ErrorObject::internal_error())
            }
        }
    }
}
