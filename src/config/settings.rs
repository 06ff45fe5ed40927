//! Configuration file loading

use anyhow::{Context, Result};
use autonomia_shared::timing;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted when no path is given on the command line
pub const CONFIG_ENV: &str = "AUTONOMIA_CONFIG";

/// Contents of the gateway configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// General parameters (`verbose`, `debug`, `telemetry_period`, ...)
    #[serde(default)]
    pub app_params: Map<String, Value>,
    pub arduino: Option<Map<String, Value>>,
    pub gps: Option<Map<String, Value>>,
    pub video: Option<Map<String, Value>>,
    pub relay: RelaySettings,
    #[serde(default)]
    pub rexec: RexecSettings,
}

/// Serial port of the GPS receiver
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GpsSettings {
    pub serial: String,
    pub speed: u32,
}

/// Cloud relay connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    pub server: String,
    pub port: u16,
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Policy for the remote shell execution method
#[derive(Debug, Clone, Deserialize)]
pub struct RexecSettings {
    /// Shared secret callers must present; `None` disables the method
    pub token: Option<String>,
    #[serde(default = "default_rexec_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RexecSettings {
    fn default() -> Self {
        Self {
            token: None,
            timeout_secs: default_rexec_timeout_secs(),
        }
    }
}

impl RexecSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_device_id() -> String {
    "autonomia-001".into()
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_rexec_timeout_secs() -> u64 {
    timing::DEFAULT_REXEC_TIMEOUT_SECS
}

impl GatewayConfig {
    /// Resolve the config path: first CLI argument, then `AUTONOMIA_CONFIG`, then `config.json`
    pub fn resolve_path(mut args: impl Iterator<Item = String>) -> PathBuf {
        args.next()
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .unwrap_or_else(|| "config.json".into())
            .into()
    }

    /// Read and parse the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Boolean flag from `app_params`, false when absent
    pub fn flag(&self, name: &str) -> bool {
        self.app_params
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Typed view of the `gps` section, if present and well-formed
    pub fn gps_settings(&self) -> Option<GpsSettings> {
        let section = self.gps.clone()?;
        serde_json::from_value(Value::Object(section)).ok()
    }

    /// The sections that seed the live configuration
    pub fn live_sections(&self) -> Map<String, Value> {
        let mut sections = Map::new();
        sections.insert("app_params".into(), Value::Object(self.app_params.clone()));
        for (name, section) in [
            ("arduino", &self.arduino),
            ("gps", &self.gps),
            ("video", &self.video),
        ] {
            if let Some(section) = section {
                sections.insert(name.into(), Value::Object(section.clone()));
            }
        }
        sections
    }
}
