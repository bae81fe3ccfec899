/*
[INPUT]:  OANDA_ACCOUNT_ID and OANDA_TOKEN environment variables
[OUTPUT]: Account transactions printed as they happen, until Ctrl-C
[POS]:    Examples - transaction stream with caller-driven reconnection
[UPDATE]: When the transaction stream surface or error categories change
*/

use std::time::Duration;

use oanda_v20_adapter::{
    BoxError, ClientConfig, Credentials, StreamError, StreamingConnection, TransactionEvent,
};

/// Example: Follow the transaction stream and reconnect on transport failures
///
/// The stream never retries by itself; this loop shows the caller-side policy.
#[tokio::main]
async fn main() {
    println!("=== OANDA v20 Transaction Stream Example ===\n");

    let (account_id, token) = match (std::env::var("OANDA_ACCOUNT_ID"), std::env::var("OANDA_TOKEN")) {
        (Ok(account_id), Ok(token)) => (account_id, token),
        _ => {
            eprintln!("Set OANDA_ACCOUNT_ID and OANDA_TOKEN to run this example");
            return;
        }
    };

    let streaming = match StreamingConnection::new(
        Credentials::new(account_id, token),
        ClientConfig::default(),
    ) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create stream connection: {}", e);
            return;
        }
    };

    let cancel = streaming.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut backoff = Duration::from_secs(1);
    loop {
        let result = streaming
            .stream_transactions(|event: TransactionEvent| {
                println!(
                    "{} {} id={}",
                    event.time,
                    event.kind,
                    event.transaction_id.as_deref().unwrap_or("-")
                );
                Ok::<(), BoxError>(())
            })
            .await;

        match result {
            Ok(()) => println!("Stream closed by server, reconnecting"),
            Err(StreamError::Cancelled) => {
                println!("\n✓ Cancelled");
                return;
            }
            Err(e) if e.is_retryable() => {
                println!("✗ {} (retrying in {:?})", e, backoff);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(30));
                continue;
            }
            Err(e) => {
                println!("✗ Stream error: {}", e);
                return;
            }
        }
        backoff = Duration::from_secs(1);
    }
}
