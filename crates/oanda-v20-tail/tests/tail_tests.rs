/*
[INPUT]:  YAML config on disk and a mock stream server
[OUTPUT]: Test results for config layering and JSON line output
[POS]:    Integration tests - tail binary building blocks
[UPDATE]: When config fields or the output format change
*/

use oanda_v20_adapter::{StreamError, StreamingConnection, TransactionEvent};
use oanda_v20_tail::{JsonLineWriter, TailConfig};
use tokio_test::assert_ok;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BODY: &str = concat!(
    "{\"type\":\"HEARTBEAT\",\"time\":\"2024-05-01T12:00:00Z\",\"lastTransactionID\":\"10\"}\n",
    "{\"type\":\"TRANSACTION\",\"time\":\"2024-05-01T12:00:01Z\",\"transactionID\":\"11\",\"accountID\":\"acct-1\",\"transaction\":{\"id\":\"11\",\"type\":\"DAILY_FINANCING\"}}\n",
    "{\"type\":\"TRANSACTION\",\"time\":\"2024-05-01T12:00:02Z\",\"transactionID\":\"12\",\"accountID\":\"acct-1\"}\n",
);

fn write_config(name: &str, content: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}.yaml", name, std::process::id()));
    std::fs::write(&path, content).expect("write config");
    path
}

fn connection_for(config: &TailConfig) -> StreamingConnection {
    let connection = assert_ok!(StreamingConnection::new(
        assert_ok!(config.credentials()),
        config.client_config()
    ));
    let url = config.stream_url.as_deref().expect("stream url");
    assert_ok!(connection.with_stream_base_url(url))
}

#[tokio::test]
async fn test_file_config_with_cli_token_streams_json_lines() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/acct-1/transactions/stream"))
        .and(header("authorization", "Bearer cli-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
        .expect(1)
        .mount(&server)
        .await;

    let yaml = format!(
        "account_id: acct-1\ntoken: file-token\nheartbeat_timeout_secs: 5\nstream_url: \"{}\"\n",
        server.uri()
    );
    let path = write_config("oanda-v20-tail-stream", &yaml);
    let file_config = assert_ok!(TailConfig::from_file(path.to_str().expect("utf-8 path")));
    let _ = std::fs::remove_file(&path);

    let config = file_config.merge(TailConfig {
        token: Some("cli-token".to_string()),
        ..TailConfig::default()
    });
    assert_ok!(config.validate());

    let connection = connection_for(&config);
    let mut out = JsonLineWriter::new(Vec::new());
    let result = connection
        .stream_transactions(|event: TransactionEvent| out.write_event(&event))
        .await;
    assert_ok!(result);
    assert_eq!(out.written(), 2);

    let text = String::from_utf8(out.into_inner()).expect("utf-8 output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"{"type":"TRANSACTION","time":"2024-05-01T12:00:01Z","transactionID":"11","accountID":"acct-1","transaction":{"id":"11","type":"DAILY_FINANCING"}}"#,
            r#"{"type":"TRANSACTION","time":"2024-05-01T12:00:02Z","transactionID":"12","accountID":"acct-1"}"#,
        ]
    );
}

#[tokio::test]
async fn test_rejected_token_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/acct-1/changes/stream"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "errorMessage": "Insufficient authorization to perform request."
        })))
        .mount(&server)
        .await;

    let config = TailConfig {
        account_id: Some("acct-1".to_string()),
        token: Some("stale".to_string()),
        stream_url: Some(server.uri()),
        ..TailConfig::default()
    };
    let connection = connection_for(&config);
    let mut out = JsonLineWriter::new(Vec::new());
    let result = connection
        .stream_account_changes(|event| out.write_event(&event))
        .await;

    match result {
        Err(StreamError::Api { status: Some(401), message }) => {
            assert_eq!(message, "Insufficient authorization to perform request.");
        }
        other => panic!("expected 401 api error, got {other:?}"),
    }
    assert_eq!(out.written(), 0);
}

#[test]
fn test_missing_config_file() {
    assert!(TailConfig::from_file("/nonexistent/oanda-v20-tail.yaml").is_err());
}
