use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CONFIG_PATH, ClientConfig};
use crate::errors::ClientError;
use crate::model::RtMode;

/// Body of the server's config endpoint.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub embedder: Option<String>,
    #[serde(default)]
    pub rt_modes: Vec<String>,
}

impl ServerConfig {
    /// Model name to display; empty unless the server reported `ok`.
    pub fn model_label(&self) -> String {
        if !self.ok {
            return String::new();
        }
        self.model.clone().unwrap_or_default()
    }

    /// Advertised realtime modes this client understands.
    pub fn supported_rt_modes(&self) -> Vec<RtMode> {
        self.rt_modes
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect()
    }
}

/// Request/response calls to the chat server (everything except the stream).
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    config_url: String,
    timeout: std::time::Duration,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            http,
            config_url: config.endpoint(CONFIG_PATH),
            timeout: config.config_timeout(),
        })
    }

    /// Fetches the server config once; no retry.
    pub async fn fetch_server_config(&self) -> Result<ServerConfig, ClientError> {
        let response = self
            .http
            .get(&self.config_url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<ServerConfig>().await?)
    }

    /// Model label for display; any failure yields an empty label.
    pub async fn model_label(&self) -> String {
        match self.fetch_server_config().await {
            Ok(config) => config.model_label(),
            Err(err) => {
                debug!(error = %err, "config fetch failed");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_requires_ok() {
        let config = ServerConfig {
            ok: false,
            model: Some("qwen".into()),
            ..ServerConfig::default()
        };
        assert_eq!(config.model_label(), "");

        let config = ServerConfig {
            ok: true,
            model: None,
            ..ServerConfig::default()
        };
        assert_eq!(config.model_label(), "");
    }

    #[test]
    fn parses_server_body() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"ok": true, "model": "m-1", "embedder": null, "rt_modes": ["prefer", "merge", "off", "later"]}"#,
        )
        .expect("config");
        assert_eq!(config.model_label(), "m-1");
        assert_eq!(
            config.supported_rt_modes(),
            vec![RtMode::Prefer, RtMode::Merge, RtMode::Off]
        );
    }
}
