use crate::error::{FeedError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio_tungstenite::tungstenite::http::Uri;

/// Default sensor feed endpoint.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8765";

/// Default wait before retrying a dropped connection.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Connection settings for the sensor feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    #[serde(alias = "endpointAddress")]
    pub endpoint_address: String,
    #[serde(alias = "reconnectDelayMs")]
    pub reconnect_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint_address: DEFAULT_ENDPOINT.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl FeedConfig {
    pub fn new(endpoint_address: impl Into<String>) -> Self {
        Self {
            endpoint_address: endpoint_address.into(),
            ..Self::default()
        }
    }

    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Parse a JSON config document. Missing options fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Check that the endpoint is a usable WebSocket URL and the delay is positive.
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay_ms == 0 {
            return Err(FeedError::InvalidReconnectDelay);
        }

        let uri: Uri = self
            .endpoint_address
            .parse()
            .map_err(|e| FeedError::InvalidEndpoint(format!("{}: {}", self.endpoint_address, e)))?;

        match uri.scheme_str() {
            Some("ws") | Some("wss") => {}
            other => {
                return Err(FeedError::InvalidEndpoint(format!(
                    "URL must start with ws:// or wss://, got scheme {:?}",
                    other.unwrap_or("")
                )));
            }
        }

        if uri.host().is_none_or(str::is_empty) {
            return Err(FeedError::InvalidEndpoint(format!(
                "missing host in {}",
                self.endpoint_address
            )));
        }

        Ok(())
    }
}
