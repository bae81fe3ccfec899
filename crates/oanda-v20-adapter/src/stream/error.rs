/*
[INPUT]:  Failure sources of a stream invocation (transport, read, decode, API, handler)
[OUTPUT]: Terminal StreamError values with category helpers
[POS]:    Streaming layer - error taxonomy
[UPDATE]: When adding failure modes to the stream loop
*/

use std::time::Duration;

use thiserror::Error;

use super::StreamEndpoint;

/// Error type accepted from stream handlers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal error of a stream invocation.
///
/// Once returned the connection has been released and no further records are read.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Opening the connection failed
    #[error("stream connection failed: {0}")]
    Connection(#[source] reqwest::Error),

    /// The connection failed while reading the body
    #[error("stream read failed: {0}")]
    Read(#[source] std::io::Error),

    /// No line arrived within the heartbeat timeout
    #[error("stream stalled: no data within {}ms", .after.as_millis())]
    Stalled { after: Duration },

    /// A record is not valid JSON or does not match the endpoint's shape
    #[error("failed to decode record {line}: {source}")]
    Decode {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A record is not valid UTF-8
    #[error("record {line} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        line: u64,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A record on a discriminated feed lacks its `type` field
    #[error("record {line} on the {endpoint} stream has no type field")]
    MissingDiscriminant { endpoint: StreamEndpoint, line: u64 },

    /// A record exceeded the configured line limit
    #[error("record {line} exceeds the {max} byte line limit")]
    LineTooLong { line: u64, max: usize },

    /// The service reported an error, either as the HTTP status or inline
    #[error("API error: {message}")]
    Api { status: Option<u16>, message: String },

    /// The caller's handler failed
    #[error("stream handler failed: {0}")]
    Handler(#[source] BoxError),

    /// Parameters were rejected before connecting
    #[error("invalid stream request: {0}")]
    InvalidRequest(String),

    /// The cancellation token fired
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Transport-level failure: the connection could not be opened or died
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            StreamError::Connection(_) | StreamError::Read(_) | StreamError::Stalled { .. }
        )
    }

    /// A record could not be decoded
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            StreamError::Decode { .. }
                | StreamError::InvalidUtf8 { .. }
                | StreamError::MissingDiscriminant { .. }
                | StreamError::LineTooLong { .. }
        )
    }

    /// Hint for callers layering reconnection on top; the stream itself never retries
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Api {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            other => other.is_connection_error(),
        }
    }

    /// Message reported by the service, if this is an API error
    pub fn api_message(&self) -> Option<&str> {
        match self {
            StreamError::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// The handler's error, if it has type `E`
    pub fn handler_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            StreamError::Handler(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}
