use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ClientError;
use crate::model::RtMode;
use crate::ring::TelemetryLimits;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const CHAT_STREAM_PATH: &str = "/api/chat_stream";
pub const CONFIG_PATH: &str = "/api/config";

pub const ENV_BASE_URL: &str = "RTCHAT_BASE_URL";
pub const ENV_RT_MODE: &str = "RTCHAT_RT_MODE";
pub const ENV_TELEMETRY_MAX_EVENTS: &str = "RTCHAT_TELEMETRY_MAX_EVENTS";
pub const ENV_TELEMETRY_MAX_CHARS: &str = "RTCHAT_TELEMETRY_MAX_CHARS";
pub const ENV_STREAM_BUFFER: &str = "RTCHAT_STREAM_BUFFER";

/// Client settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server root, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Telemetry buffer caps.
    #[serde(default)]
    pub telemetry: TelemetryLimits,
    /// Realtime mode used when the caller does not pick one.
    #[serde(default)]
    pub rt_mode: RtMode,
    /// Frames buffered between the transport task and the UI loop.
    #[serde(default = "default_stream_buffer_capacity")]
    pub stream_buffer_capacity: usize,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout for the config endpoint. Streams have none.
    #[serde(default = "default_config_timeout_ms")]
    pub config_timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_stream_buffer_capacity() -> usize {
    128
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_config_timeout_ms() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            telemetry: TelemetryLimits::default(),
            rt_mode: RtMode::default(),
            stream_buffer_capacity: default_stream_buffer_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            config_timeout_ms: default_config_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `RTCHAT_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (an environment-like key source).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(mode) = lookup(ENV_RT_MODE) {
            self.rt_mode = mode.parse()?;
        }
        if let Some(value) = lookup(ENV_TELEMETRY_MAX_EVENTS) {
            self.telemetry.max_events = parse_usize(ENV_TELEMETRY_MAX_EVENTS, &value)?;
        }
        if let Some(value) = lookup(ENV_TELEMETRY_MAX_CHARS) {
            self.telemetry.max_chars = parse_usize(ENV_TELEMETRY_MAX_CHARS, &value)?;
        }
        if let Some(value) = lookup(ENV_STREAM_BUFFER) {
            self.stream_buffer_capacity = parse_usize(ENV_STREAM_BUFFER, &value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) url: {}",
                self.base_url
            )));
        }
        if self.telemetry.max_events == 0 {
            return Err(ClientError::Config(
                "telemetry.max_events must be greater than 0".into(),
            ));
        }
        if self.telemetry.max_chars == 0 {
            return Err(ClientError::Config(
                "telemetry.max_chars must be greater than 0".into(),
            ));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn config_timeout(&self) -> Duration {
        Duration::from_millis(self.config_timeout_ms)
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ClientError> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{key} must be a non-negative integer, got {value:?}")))
}
