/*
[INPUT]:  HTTP configuration (environment, timeouts, user agent) and account credentials
[OUTPUT]: Configured reqwest client with bearer auth and JSON helpers
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::error_message;
use super::{Result, V20Error};
use crate::stream::StreamingConnection;
use crate::types::Environment;

pub(crate) const ACCEPT_DATETIME_FORMAT: &str = "Accept-Datetime-Format";
pub(crate) const DATETIME_FORMAT: &str = "RFC3339";
pub(crate) const RAW_LOG_MAX_BYTES: usize = 1024;

const DEFAULT_USER_AGENT: &str = concat!("v20-rust/", env!("CARGO_PKG_VERSION"));
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Settings for long-lived stream connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Longest wait for the response or the next line; `None` waits forever
    pub heartbeat_timeout: Option<Duration>,
    /// Longest accepted record, in bytes
    pub max_line_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Some(Duration::from_secs(30)),
            max_line_bytes: 1024 * 1024,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    /// Whole-request timeout for REST calls; never applied to streams
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub stream: StreamConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Practice,
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            stream: StreamConfig::default(),
        }
    }
}

/// Account and API token used for every request
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(account_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            token: token.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(V20Error::Config("account id must not be empty".to_string()));
        }
        if self.token.trim().is_empty() {
            return Err(V20Error::Config("API token must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Main HTTP client for the v20 REST API
#[derive(Debug, Clone)]
pub struct V20Client {
    http_client: Client,
    base_url: Url,
    credentials: Credentials,
    config: ClientConfig,
}

impl V20Client {
    /// Create a client for the configured environment without touching the network
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let base_url = config.environment.rest_url();
        Self::with_base_url(credentials, config, base_url)
    }

    /// Create a client against an explicit REST base URL
    pub fn with_base_url(
        credentials: Credentials,
        config: ClientConfig,
        base_url: &str,
    ) -> Result<Self> {
        credentials.validate()?;
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
            credentials,
            config,
        })
    }

    /// Create a client and verify the credentials against the account endpoint
    pub async fn connect(credentials: Credentials, config: ClientConfig) -> Result<Self> {
        let client = Self::new(credentials, config)?;
        client.check_connection().await?;
        Ok(client)
    }

    pub fn account_id(&self) -> &str {
        &self.credentials.account_id
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Streaming connection sharing this client's credentials and settings.
    ///
    /// The stream host is derived from the REST host (`api-…` becomes `stream-…`).
    pub fn streaming(&self) -> Result<StreamingConnection> {
        StreamingConnection::from_client(self)
    }

    /// GET /accounts/{account_id}
    pub async fn check_connection(&self) -> Result<()> {
        let endpoint = format!("/accounts/{}", self.credentials.account_id);
        let _: serde_json::Value = self.get_json(&endpoint).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let builder = self.request(Method::GET, endpoint)?;
        self.send_json(builder).await
    }

    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, endpoint)?.json(body);
        self.send_json(builder).await
    }

    pub async fn put_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, endpoint)?.json(body);
        self.send_json(builder).await
    }

    /// Build full URL for an endpoint below the REST base
    fn url(&self, endpoint: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{endpoint}"))?)
    }

    /// Build an authenticated request builder
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        Ok(self
            .http_client
            .request(method, url)
            .bearer_auth(&self.credentials.token)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT_DATETIME_FORMAT, DATETIME_FORMAT))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();
        let started = Instant::now();
        debug!(method = %method, url = %url, "v20 request");

        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = response.text().await?;

        debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            body = %truncate_for_log(&body, RAW_LOG_MAX_BYTES),
            "v20 response"
        );

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(method = %method, url = %url, retry_after = ?retry_after, "v20 rate limit hit");
            return Err(V20Error::RateLimit {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            });
        }

        if !status.is_success() {
            return Err(V20Error::api_error(status, error_message(status, &body)));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Stream base for a REST base URL.
///
/// Any `fxtrade` host maps to the live stream host, then `api-fx…` maps to
/// `stream-fx…`, and anything else is kept as is.
pub(crate) fn derive_stream_base_url(rest: &Url) -> Url {
    let Some(host) = rest.host_str() else {
        return rest.clone();
    };

    if host.contains("fxtrade") {
        if let Ok(url) = Url::parse(Environment::Live.stream_url()) {
            return url;
        }
    }

    if let Some(suffix) = host.strip_prefix("api-") {
        let mut url = rest.clone();
        if url.set_host(Some(&format!("stream-{suffix}"))).is_ok() {
            return url;
        }
    }

    rest.clone()
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
