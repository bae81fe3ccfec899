/*
[INPUT]:  OANDA_ACCOUNT_ID and OANDA_TOKEN environment variables
[OUTPUT]: Live best bid/ask for a few instruments printed to stdout
[POS]:    Examples - price stream consumption
[UPDATE]: When the price stream surface changes
*/

use std::time::Duration;

use oanda_v20_adapter::{BoxError, ClientConfig, Credentials, PriceTick, StreamError, V20Client};

/// Example: Stream practice-account prices for ten ticks, then stop
#[tokio::main]
async fn main() {
    println!("=== OANDA v20 Price Stream Example ===\n");

    let (account_id, token) = match (std::env::var("OANDA_ACCOUNT_ID"), std::env::var("OANDA_TOKEN")) {
        (Ok(account_id), Ok(token)) => (account_id, token),
        _ => {
            eprintln!("Set OANDA_ACCOUNT_ID and OANDA_TOKEN to run this example");
            return;
        }
    };

    let client = match V20Client::new(Credentials::new(account_id, token), ClientConfig::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {}", e);
            return;
        }
    };

    let streaming = match client.streaming() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to create stream connection: {}", e);
            return;
        }
    };
    println!("✓ Streaming from {}\n", streaming.stream_base_url());

    // Stop after a minute even if the market is closed
    let cancel = streaming.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        cancel.cancel();
    });

    let mut ticks = 0;
    let result = streaming
        .stream_prices(&["EUR_USD", "USD_JPY", "GBP_USD"], |tick: PriceTick| -> Result<(), BoxError> {
            ticks += 1;
            let bid = tick.best_bid().map(|b| b.price.to_string()).unwrap_or_default();
            let ask = tick.best_ask().map(|a| a.price.to_string()).unwrap_or_default();
            println!("{} {} bid={} ask={}", tick.time, tick.instrument, bid, ask);

            if ticks >= 10 {
                return Err("received 10 ticks".into());
            }
            Ok(())
        })
        .await;

    match result {
        Err(StreamError::Handler(reason)) => println!("\n✓ Stopped: {}", reason),
        Err(StreamError::Cancelled) => println!("\n✓ Stopped after timeout"),
        Err(e) => println!("\n✗ Stream error: {}", e),
        Ok(()) => println!("\n✓ Stream closed by server"),
    }
}
