/*
[INPUT]:  An open line reader, stream settings, a cancellation token and a caller handler
[OUTPUT]: Handler invocations in wire order; a terminal StreamError or clean end
[POS]:    Streaming layer - dispatch loop shared by every endpoint
[UPDATE]: When changing heartbeat bookkeeping, stall detection or termination rules
*/

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decode::{Record, classify};
use super::{BoxError, LineReader, StreamEndpoint, StreamError, StreamEvent};
use crate::http::StreamConfig;
use crate::http::client::{RAW_LOG_MAX_BYTES, truncate_for_log};

/// Owns the open body for the lifetime of one stream invocation.
///
/// Dropping the session drops the reader and with it the connection, whichever
/// way the loop exits.
#[derive(Debug)]
struct StreamSession<R> {
    endpoint: StreamEndpoint,
    reader: LineReader<R>,
    heartbeats: u64,
    dispatched: u64,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl<R> StreamSession<R>
where
    R: AsyncRead + Unpin,
{
    fn new(endpoint: StreamEndpoint, reader: LineReader<R>) -> Self {
        Self {
            endpoint,
            reader,
            heartbeats: 0,
            dispatched: 0,
            last_heartbeat: None,
        }
    }

    async fn next_line(&mut self, timeout: Option<Duration>) -> Result<Option<String>, StreamError> {
        match timeout {
            Some(after) => tokio::time::timeout(after, self.reader.next_line())
                .await
                .map_err(|_| StreamError::Stalled { after })?,
            None => self.reader.next_line().await,
        }
    }

    fn on_heartbeat(&mut self, time: DateTime<Utc>, last_transaction_id: Option<&str>) {
        self.heartbeats += 1;
        self.last_heartbeat = Some(time);
        debug!(
            endpoint = self.endpoint.as_str(),
            heartbeats = self.heartbeats,
            time = %time,
            last_transaction_id = ?last_transaction_id,
            "stream heartbeat"
        );
    }
}

impl<R> Drop for StreamSession<R> {
    fn drop(&mut self) {
        info!(
            endpoint = self.endpoint.as_str(),
            records = self.reader.records_read(),
            dispatched = self.dispatched,
            heartbeats = self.heartbeats,
            last_heartbeat = ?self.last_heartbeat,
            "stream connection released"
        );
    }
}

/// Read, classify and dispatch until the body ends or something fails.
///
/// The handler runs on this task and the next line is not read until it
/// returns, so a slow handler slows the socket.
pub(crate) async fn dispatch<T, R, F, E>(
    reader: LineReader<R>,
    config: &StreamConfig,
    cancel: &CancellationToken,
    handler: F,
) -> Result<(), StreamError>
where
    T: StreamEvent,
    R: AsyncRead + Unpin,
    F: FnMut(T) -> Result<(), E>,
    E: Into<BoxError>,
{
    let endpoint = T::ENDPOINT;
    let mut session = StreamSession::new(endpoint, reader);
    let result = run_loop(&mut session, config, cancel, handler).await;

    match &result {
        Ok(()) => info!(endpoint = endpoint.as_str(), "stream closed by peer"),
        Err(StreamError::Cancelled) => info!(endpoint = endpoint.as_str(), "stream cancelled"),
        Err(err) => warn!(endpoint = endpoint.as_str(), error = %err, "stream terminated"),
    }

    result
}

async fn run_loop<T, R, F, E>(
    session: &mut StreamSession<R>,
    config: &StreamConfig,
    cancel: &CancellationToken,
    mut handler: F,
) -> Result<(), StreamError>
where
    T: StreamEvent,
    R: AsyncRead + Unpin,
    F: FnMut(T) -> Result<(), E>,
    E: Into<BoxError>,
{
    let endpoint = session.endpoint;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            next = session.next_line(config.heartbeat_timeout) => next?,
        };

        let Some(line) = next else {
            return Ok(());
        };
        let line_no = session.reader.records_read();

        match classify::<T>(&line, line_no) {
            Ok(Record::Heartbeat(heartbeat)) => {
                session.on_heartbeat(heartbeat.time, heartbeat.last_transaction_id.as_deref());
            }
            Ok(Record::MalformedHeartbeat(err)) => {
                warn!(
                    endpoint = endpoint.as_str(),
                    line = line_no,
                    error = %err,
                    message = %truncate_for_log(&line, RAW_LOG_MAX_BYTES),
                    "malformed heartbeat skipped"
                );
            }
            Ok(Record::Data(event)) => {
                session.dispatched += 1;
                if session.dispatched == 1 {
                    info!(endpoint = endpoint.as_str(), line = line_no, "first stream record");
                }
                handler(event).map_err(|err| StreamError::Handler(err.into()))?;
            }
            Err(err) => {
                debug!(
                    endpoint = endpoint.as_str(),
                    line = line_no,
                    bytes = line.len(),
                    message = %truncate_for_log(&line, RAW_LOG_MAX_BYTES),
                    "stream record rejected"
                );
                return Err(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountChanges, PriceTick};
    use std::io;
    use tokio::io::AsyncWriteExt;
    use tokio_test::io::Builder;

    fn config(heartbeat_timeout: Option<Duration>) -> StreamConfig {
        StreamConfig {
            heartbeat_timeout,
            max_line_bytes: 4096,
        }
    }

    fn price_line(instrument: &str) -> String {
        format!(
            r#"{{"type":"PRICE","instrument":"{instrument}","bids":[{{"price":"1.1000","liquidity":10}}],"asks":[]}}"#
        )
    }

    const HEARTBEAT: &str = r#"{"type":"HEARTBEAT","time":"2024-01-02T03:04:05.000000000Z"}"#;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("handler rejected {0}")]
    struct Rejected(String);

    #[tokio::test]
    async fn test_records_dispatched_in_order() {
        let body = format!(
            "{}\n{}\n{}\n{}\n",
            price_line("EUR_USD"),
            HEARTBEAT,
            price_line("USD_JPY"),
            price_line("GBP_USD")
        );
        let mock = Builder::new().read(body.as_bytes()).build();
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |tick: PriceTick| {
            seen.push(tick.instrument);
            Ok::<(), BoxError>(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(seen, vec!["EUR_USD", "USD_JPY", "GBP_USD"]);
    }

    #[tokio::test]
    async fn test_heartbeats_never_reach_handler() {
        let body = format!("{HEARTBEAT}\n{HEARTBEAT}\n");
        let mock = Builder::new().read(body.as_bytes()).build();
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |_: AccountChanges| {
            calls += 1;
            Ok::<(), BoxError>(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_malformed_heartbeat_skipped() {
        let body = format!(
            "{}\n{}\n{}\n",
            r#"{"type":"HEARTBEAT","time":42}"#,
            price_line("EUR_USD"),
            price_line("USD_JPY")
        );
        let mock = Builder::new().read(body.as_bytes()).build();
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |_: PriceTick| {
            calls += 1;
            Ok::<(), BoxError>(())
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_malformed_line_stops_before_later_records() {
        let body = format!(
            "{}\n{}\nnot json\n{}\n",
            price_line("EUR_USD"),
            price_line("USD_JPY"),
            price_line("GBP_USD")
        );
        let mock = Builder::new().read(body.as_bytes()).build();
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |_: PriceTick| {
            calls += 1;
            Ok::<(), BoxError>(())
        })
        .await;

        match result {
            Err(StreamError::Decode { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {other:?}"),
        }
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_handler_error_returned_verbatim() {
        let body = format!(
            "{}\n{}\n{}\n",
            price_line("EUR_USD"),
            price_line("USD_JPY"),
            price_line("GBP_USD")
        );
        let mock = Builder::new().read(body.as_bytes()).build();
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |tick: PriceTick| {
            calls += 1;
            if tick.instrument == "USD_JPY" {
                return Err(Rejected(tick.instrument));
            }
            Ok(())
        })
        .await;

        let err = result.expect_err("handler error");
        assert_eq!(
            err.handler_error::<Rejected>(),
            Some(&Rejected("USD_JPY".to_string()))
        );
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_handler_error_releases_body() {
        let (mut writer, body) = tokio::io::duplex(1024);
        writer
            .write_all(format!("{}\n", price_line("EUR_USD")).as_bytes())
            .await
            .expect("write");
        let cancel = CancellationToken::new();

        let result = dispatch(LineReader::new(body, 4096), &config(None), &cancel, |tick: PriceTick| {
            Err(Rejected(tick.instrument))
        })
        .await;
        assert!(matches!(result, Err(StreamError::Handler(_))));

        let err = writer
            .write_all(format!("{}\n", price_line("USD_JPY")).as_bytes())
            .await
            .expect_err("reader side should be closed");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_decode_error_releases_body() {
        let (mut writer, body) = tokio::io::duplex(1024);
        writer.write_all(b"{\"type\":\"PRICE\",\"bids\":\n").await.expect("write");
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(body, 4096), &config(None), &cancel, |_: PriceTick| {
            calls += 1;
            Ok::<(), BoxError>(())
        })
        .await;
        assert!(matches!(result, Err(StreamError::Decode { line: 1, .. })));
        assert_eq!(calls, 0);

        let err = writer
            .write_all(format!("{}\n", price_line("EUR_USD")).as_bytes())
            .await
            .expect_err("reader side should be closed");
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_read_failure_after_records() {
        let body = format!("{}\n", price_line("EUR_USD"));
        let mock = Builder::new()
            .read(body.as_bytes())
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(LineReader::new(mock, 4096), &config(None), &cancel, |_: PriceTick| {
            calls += 1;
            Ok::<(), BoxError>(())
        })
        .await;

        assert!(matches!(result, Err(StreamError::Read(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_stall_timeout() {
        let (mut writer, body) = tokio::io::duplex(1024);
        writer
            .write_all(format!("{}\n", price_line("EUR_USD")).as_bytes())
            .await
            .expect("write");
        let cancel = CancellationToken::new();
        let mut calls = 0;

        let result = dispatch(
            LineReader::new(body, 4096),
            &config(Some(Duration::from_millis(50))),
            &cancel,
            |_: PriceTick| {
                calls += 1;
                Ok::<(), BoxError>(())
            },
        )
        .await;

        match result {
            Err(StreamError::Stalled { after }) => assert_eq!(after, Duration::from_millis(50)),
            other => panic!("expected stall, got {other:?}"),
        }
        assert_eq!(calls, 1);
        drop(writer);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_read() {
        let (writer, body) = tokio::io::duplex(1024);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = dispatch(LineReader::new(body, 4096), &config(None), &cancel, |_: PriceTick| {
            Ok::<(), BoxError>(())
        })
        .await;

        assert!(matches!(result, Err(StreamError::Cancelled)));
        drop(writer);
    }
}
