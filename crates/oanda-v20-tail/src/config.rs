/*
[INPUT]:  Optional YAML configuration file plus CLI/environment overrides
[OUTPUT]: Credentials and client settings for one stream session
[POS]:    Configuration layer - connection setup
[UPDATE]: When adding new configuration options
*/

use std::time::Duration;

use anyhow::{Context, bail};
use oanda_v20_adapter::{ClientConfig, Credentials, Environment, StreamConfig};
use serde::{Deserialize, Serialize};

/// Connection settings for the tail binary.
///
/// Every field is optional so a file and command-line flags can be layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TailConfig {
    #[serde(default)]
    pub account_id: Option<String>,
    /// API token; prefer the OANDA_TOKEN environment variable over storing it here
    #[serde(default)]
    pub token: Option<String>,
    /// "practice" or "live"
    #[serde(default)]
    pub environment: Option<Environment>,
    /// Seconds without data before the stream is treated as stalled; 0 disables
    #[serde(default)]
    pub heartbeat_timeout_secs: Option<u64>,
    /// Override of the stream base URL
    #[serde(default)]
    pub stream_url: Option<String>,
}

impl TailConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        // An empty file parses as YAML null.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: TailConfig) -> Self {
        Self {
            account_id: overrides.account_id.or(self.account_id),
            token: overrides.token.or(self.token),
            environment: overrides.environment.or(self.environment),
            heartbeat_timeout_secs: overrides.heartbeat_timeout_secs.or(self.heartbeat_timeout_secs),
            stream_url: overrides.stream_url.or(self.stream_url),
        }
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        let account_id = non_empty(self.account_id.as_deref())
            .context("account id missing: pass --account-id, set OANDA_ACCOUNT_ID or add account_id to the config file")?;
        let token = non_empty(self.token.as_deref())
            .context("API token missing: pass --token, set OANDA_TOKEN or add token to the config file")?;
        Ok(Credentials::new(account_id, token))
    }

    pub fn client_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        let heartbeat_timeout = match self.heartbeat_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.stream.heartbeat_timeout,
        };

        ClientConfig {
            environment: self.environment.unwrap_or_default(),
            stream: StreamConfig {
                heartbeat_timeout,
                ..defaults.stream.clone()
            },
            ..defaults
        }
    }

    /// Check what can be checked without connecting
    pub fn validate(&self) -> anyhow::Result<()> {
        self.credentials()?;
        if let Some(url) = self.stream_url.as_deref() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("stream_url must be an http(s) URL, got {url}");
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
