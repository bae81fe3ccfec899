/*
[INPUT]:  Stream base URL, credentials, stream settings and a cancellation token
[OUTPUT]: The four endpoint entry points; each runs one stream to completion
[POS]:    Streaming layer - connection setup and public surface
[UPDATE]: When adding stream endpoints or changing how connections are opened
*/

use std::io;
use std::pin::Pin;

use futures_util::TryStreamExt;
use reqwest::{Client, Response, Url};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::dispatch::dispatch;
use super::endpoint::StreamRoute;
use super::{BoxError, LineReader, StreamError, StreamEvent};
use crate::http::client::{ACCEPT_DATETIME_FORMAT, DATETIME_FORMAT, derive_stream_base_url};
use crate::http::error::error_message;
use crate::http::{ClientConfig, Credentials, StreamConfig, V20Client, V20Error};
use crate::types::{AccountChanges, CandleUpdate, PriceTick, TransactionEvent};

type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// Handle for opening v20 streams.
///
/// Cheap to clone; every entry point opens its own connection and clones share
/// the cancellation token.
#[derive(Debug, Clone)]
pub struct StreamingConnection {
    http_client: Client,
    stream_base_url: Url,
    credentials: Credentials,
    config: StreamConfig,
    cancel: CancellationToken,
}

impl StreamingConnection {
    /// Create a connection against the configured environment's stream host
    pub fn new(credentials: Credentials, config: ClientConfig) -> Result<Self, V20Error> {
        let stream_base_url = Url::parse(config.environment.stream_url())?;
        Self::build(credentials, &config, stream_base_url)
    }

    pub(crate) fn from_client(client: &V20Client) -> Result<Self, V20Error> {
        let stream_base_url = derive_stream_base_url(client.base_url());
        Self::build(client.credentials().clone(), client.config(), stream_base_url)
    }

    fn build(
        credentials: Credentials,
        config: &ClientConfig,
        stream_base_url: Url,
    ) -> Result<Self, V20Error> {
        credentials.validate()?;
        // No whole-request timeout: bodies stay open for hours.
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http_client,
            stream_base_url,
            credentials,
            config: config.stream.clone(),
            cancel: CancellationToken::new(),
        })
    }

    /// Point the connection at another stream host
    pub fn with_stream_base_url(mut self, base_url: &str) -> Result<Self, V20Error> {
        self.stream_base_url = Url::parse(base_url)?;
        Ok(self)
    }

    pub fn with_stream_config(mut self, config: StreamConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the token that cancels every stream opened from this handle
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn stream_base_url(&self) -> &Url {
        &self.stream_base_url
    }

    pub fn stream_config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn account_id(&self) -> &str {
        &self.credentials.account_id
    }

    /// Stream prices for `instruments` until the peer closes or an error occurs.
    ///
    /// GET /accounts/{account_id}/pricing/stream?instruments={i1,i2,...}
    pub async fn stream_prices<S, F, E>(&self, instruments: &[S], handler: F) -> Result<(), StreamError>
    where
        S: AsRef<str>,
        F: FnMut(PriceTick) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let instruments = instruments.iter().map(|instrument| instrument.as_ref()).collect();
        self.run::<PriceTick, _, _>(StreamRoute::Prices { instruments }, handler).await
    }

    /// GET /accounts/{account_id}/transactions/stream
    pub async fn stream_transactions<F, E>(&self, handler: F) -> Result<(), StreamError>
    where
        F: FnMut(TransactionEvent) -> Result<(), E>,
        E: Into<BoxError>,
    {
        self.run::<TransactionEvent, _, _>(StreamRoute::Transactions, handler).await
    }

    /// GET /accounts/{account_id}/changes/stream
    pub async fn stream_account_changes<F, E>(&self, handler: F) -> Result<(), StreamError>
    where
        F: FnMut(AccountChanges) -> Result<(), E>,
        E: Into<BoxError>,
    {
        self.run::<AccountChanges, _, _>(StreamRoute::AccountChanges, handler).await
    }

    /// GET /accounts/{account_id}/instruments/{instrument}/candles/stream?granularity={granularity}
    pub async fn stream_candles<G, F, E>(
        &self,
        instrument: &str,
        granularity: G,
        handler: F,
    ) -> Result<(), StreamError>
    where
        G: AsRef<str>,
        F: FnMut(CandleUpdate) -> Result<(), E>,
        E: Into<BoxError>,
    {
        let route = StreamRoute::Candles {
            instrument,
            granularity: granularity.as_ref(),
        };
        self.run::<CandleUpdate, _, _>(route, handler).await
    }

    async fn run<T, F, E>(&self, route: StreamRoute<'_>, handler: F) -> Result<(), StreamError>
    where
        T: StreamEvent,
        F: FnMut(T) -> Result<(), E>,
        E: Into<BoxError>,
    {
        route.validate()?;
        debug_assert_eq!(route.endpoint(), T::ENDPOINT);
        let url = route.url(&self.stream_base_url, &self.credentials.account_id)?;
        info!(endpoint = T::ENDPOINT.as_str(), url = %url, "opening stream");

        let response = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StreamError::Cancelled),
            response = self.open(url) => response?,
        };
        info!(
            endpoint = T::ENDPOINT.as_str(),
            status = response.status().as_u16(),
            "stream opened"
        );

        let body = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        let body: BodyReader = Box::pin(body);
        let reader = LineReader::new(body, self.config.max_line_bytes);
        dispatch(reader, &self.config, &self.cancel, handler).await
    }

    /// Send the GET and wait for the response head; the heartbeat timeout bounds the wait
    async fn open(&self, url: Url) -> Result<Response, StreamError> {
        let send = self
            .http_client
            .get(url)
            .bearer_auth(&self.credentials.token)
            .header(ACCEPT_DATETIME_FORMAT, DATETIME_FORMAT)
            .send();

        let response = match self.config.heartbeat_timeout {
            Some(after) => tokio::time::timeout(after, send)
                .await
                .map_err(|_| StreamError::Stalled { after })?,
            None => send.await,
        }
        .map_err(StreamError::Connection)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // The error body gets the same bound as the response head.
        let body = match self.config.heartbeat_timeout {
            Some(after) => tokio::time::timeout(after, response.text()).await.ok(),
            None => Some(response.text().await),
        }
        .and_then(|text| text.ok())
        .unwrap_or_default();
        let message = error_message(status, &body);
        warn!(status = status.as_u16(), message = %message, "stream rejected");
        Err(StreamError::Api {
            status: Some(status.as_u16()),
            message,
        })
    }
}
