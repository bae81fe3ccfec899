/*
[INPUT]:  CLI arguments, optional YAML configuration file, OS shutdown signals
[OUTPUT]: Stream events as JSON lines on stdout until the stream ends or is cancelled
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use oanda_v20_adapter::{
    BoxError, CandlestickGranularity, Environment, StreamError, StreamingConnection, V20Client,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oanda_v20_tail::{JsonLineWriter, TailConfig};

#[derive(Parser, Debug)]
#[command(name = "oanda-v20-tail", version, about = "Print OANDA v20 stream events as JSON lines")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Use the live (fxtrade) environment instead of practice
    #[arg(long = "live")]
    live: bool,
    #[arg(long = "token", env = "OANDA_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long = "account-id", env = "OANDA_ACCOUNT_ID")]
    account_id: Option<String>,
    #[arg(long = "stream-url", value_name = "URL")]
    stream_url: Option<String>,
    /// Seconds without data before giving up; 0 waits forever
    #[arg(long = "heartbeat-timeout", value_name = "SECS")]
    heartbeat_timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price ticks for one or more instruments
    Prices {
        #[arg(long = "instrument", value_name = "INSTRUMENT", required = true)]
        instruments: Vec<String>,
    },
    /// Account transactions
    Transactions,
    /// Account change sets
    Changes,
    /// Candle updates for one instrument
    Candles {
        #[arg(long = "instrument", value_name = "INSTRUMENT")]
        instrument: String,
        #[arg(long = "granularity", value_name = "GRANULARITY", default_value = "M1")]
        granularity: CandlestickGranularity,
    },
}

impl Cli {
    fn overrides(&self) -> TailConfig {
        TailConfig {
            account_id: self.account_id.clone(),
            token: self.token.clone(),
            environment: self.live.then_some(Environment::Live),
            heartbeat_timeout_secs: self.heartbeat_timeout_secs,
            stream_url: self.stream_url.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = match &args.config_path {
        Some(path) => load_config(path)?,
        None => TailConfig::default(),
    }
    .merge(args.overrides());
    config.validate().context("invalid configuration")?;

    let client = V20Client::new(config.credentials()?, config.client_config())
        .context("create v20 client")?;
    let mut streaming = client.streaming().context("create stream connection")?;
    if let Some(url) = config.stream_url.as_deref() {
        streaming = streaming
            .with_stream_base_url(url)
            .context("apply stream url override")?;
    }

    info!(
        environment = ?config.client_config().environment,
        stream_base_url = %streaming.stream_base_url(),
        command = ?args.command,
        "starting oanda-v20-tail"
    );

    setup_signal_handlers(streaming.cancellation_token());

    let mut out = JsonLineWriter::new(io::stdout().lock());
    let result = run(&streaming, args.command, &mut out).await;
    info!(events = out.written(), "stream finished");

    match result {
        Ok(()) => Ok(()),
        Err(StreamError::Cancelled) => {
            info!("stream cancelled by signal");
            Ok(())
        }
        Err(err) => Err(anyhow::Error::new(err).context("stream failed")),
    }
}

async fn run<W: io::Write>(
    streaming: &StreamingConnection,
    command: Command,
    out: &mut JsonLineWriter<W>,
) -> std::result::Result<(), StreamError> {
    match command {
        Command::Prices { instruments } => {
            streaming
                .stream_prices(instruments.as_slice(), |event| emit(out, &event))
                .await
        }
        Command::Transactions => streaming.stream_transactions(|event| emit(out, &event)).await,
        Command::Changes => {
            streaming
                .stream_account_changes(|event| emit(out, &event))
                .await
        }
        Command::Candles {
            instrument,
            granularity,
        } => {
            streaming
                .stream_candles(&instrument, granularity, |event| emit(out, &event))
                .await
        }
    }
}

fn emit<W: io::Write, T: Serialize>(
    out: &mut JsonLineWriter<W>,
    event: &T,
) -> std::result::Result<(), BoxError> {
    out.write_event(event).map_err(BoxError::from)
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<TailConfig> {
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    TailConfig::from_file(path_str).context("load config")
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
