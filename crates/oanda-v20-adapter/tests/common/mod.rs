/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for oanda-v20-adapter tests

#![allow(dead_code)]

use std::time::Duration;

use oanda_v20_adapter::{ClientConfig, Credentials, StreamConfig, StreamingConnection};
use wiremock::MockServer;

pub const ACCOUNT_ID: &str = "test-account";
pub const TOKEN: &str = "test-token";
pub const USER_AGENT: &str = "oanda-v20-tests/1.0";

pub const HEARTBEAT: &str = r#"{"type":"HEARTBEAT","time":"2024-05-01T12:00:00.000000000Z"}"#;

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new(ACCOUNT_ID, TOKEN)
}

pub fn test_config() -> ClientConfig {
    ClientConfig {
        user_agent: USER_AGENT.to_string(),
        stream: StreamConfig {
            heartbeat_timeout: Some(Duration::from_secs(5)),
            max_line_bytes: 64 * 1024,
        },
        ..ClientConfig::default()
    }
}

/// Streaming connection whose stream base is the mock server root
pub fn streaming_connection(server: &MockServer) -> StreamingConnection {
    StreamingConnection::new(test_credentials(), test_config())
        .expect("streaming connection")
        .with_stream_base_url(&server.uri())
        .expect("mock server url")
}

/// Join records into a newline-delimited body
pub fn ndjson<S: AsRef<str>>(lines: &[S]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(line.as_ref());
        body.push('\n');
    }
    body
}

pub fn price_line(instrument: &str, bid: &str, ask: &str) -> String {
    format!(
        r#"{{"type":"PRICE","time":"2024-05-01T12:00:00.000000000Z","instrument":"{instrument}","tradeable":true,"bids":[{{"price":"{bid}","liquidity":1000000}}],"asks":[{{"price":"{ask}","liquidity":1000000}}],"closeoutBid":"{bid}","closeoutAsk":"{ask}"}}"#
    )
}
