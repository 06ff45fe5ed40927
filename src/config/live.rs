//! Live configuration shared by the RPC handlers and the control loop

use autonomia_shared::timing;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// The only top-level sections `set_config` may replace
pub const ALLOWED_SECTIONS: [&str; 4] = ["app_params", "arduino", "gps", "video"];

pub type SharedConfig = Arc<LiveConfig>;

/// Why a configuration update was refused. Nothing is applied in either case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigUpdateError {
    #[error("section '{0}' may not be replaced")]
    UnknownSection(String),
    #[error("section '{0}' must be a JSON object")]
    NotAnObject(String),
}

/// Runtime view of the configuration sections, guarded by a single lock
#[derive(Debug)]
pub struct LiveConfig {
    sections: RwLock<Map<String, Value>>,
}

impl LiveConfig {
    pub fn new(sections: Map<String, Value>) -> Self {
        Self {
            sections: RwLock::new(sections),
        }
    }

    pub fn shared(sections: Map<String, Value>) -> SharedConfig {
        Arc::new(Self::new(sections))
    }

    /// Consistent copy of every section
    pub async fn snapshot(&self) -> Value {
        Value::Object(self.sections.read().await.clone())
    }

    /// Replace whole sections. Either every section in `update` is applied or none is.
    pub async fn replace_sections(
        &self,
        update: Map<String, Value>,
    ) -> Result<usize, ConfigUpdateError> {
        for (name, value) in &update {
            if !ALLOWED_SECTIONS.contains(&name.as_str()) {
                return Err(ConfigUpdateError::UnknownSection(name.clone()));
            }
            if !value.is_object() {
                return Err(ConfigUpdateError::NotAnObject(name.clone()));
            }
        }

        let count = update.len();
        let mut sections = self.sections.write().await;
        for (name, value) in update {
            sections.insert(name, value);
        }
        Ok(count)
    }

    /// Set `app_params.telemetry_period` in seconds
    pub async fn set_telemetry_period(&self, period: f64) {
        let mut sections = self.sections.write().await;
        let app_params = sections
            .entry("app_params")
            .or_insert_with(|| Value::Object(Map::new()));
        if !app_params.is_object() {
            *app_params = Value::Object(Map::new());
        }
        if let Some(params) = app_params.as_object_mut() {
            params.insert("telemetry_period".into(), Value::from(period));
        }
    }

    /// Current telemetry period, falling back to the default when unset or invalid
    pub async fn telemetry_period(&self) -> Duration {
        let secs = self
            .sections
            .read()
            .await
            .get("app_params")
            .and_then(|params| params.get("telemetry_period"))
            .and_then(Value::as_f64)
            .and_then(period_from_secs);
        secs.unwrap_or(Duration::from_secs_f64(
            timing::DEFAULT_TELEMETRY_PERIOD_SECS,
        ))
    }
}

/// A usable telemetry period: positive, finite and representable as a `Duration`
pub fn period_from_secs(secs: f64) -> Option<Duration> {
    if secs <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}
