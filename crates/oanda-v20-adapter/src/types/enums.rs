/*
[INPUT]:  v20 environment names and candlestick granularity codes
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const PRACTICE_API_URL: &str = "https://api-fxpractice.oanda.com/v3";
const LIVE_API_URL: &str = "https://api-fxtrade.oanda.com/v3";
const PRACTICE_STREAM_URL: &str = "https://stream-fxpractice.oanda.com/v3";
const LIVE_STREAM_URL: &str = "https://stream-fxtrade.oanda.com/v3";

/// Trading environment a connection targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Paper trading (fxpractice)
    #[default]
    Practice,
    /// Real money (fxtrade)
    Live,
}

impl Environment {
    /// Base URL of the REST API
    pub fn rest_url(self) -> &'static str {
        match self {
            Environment::Practice => PRACTICE_API_URL,
            Environment::Live => LIVE_API_URL,
        }
    }

    /// Base URL of the streaming API
    pub fn stream_url(self) -> &'static str {
        match self {
            Environment::Practice => PRACTICE_STREAM_URL,
            Environment::Live => LIVE_STREAM_URL,
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "practice" | "fxpractice" | "demo" => Ok(Environment::Practice),
            "live" | "fxtrade" => Ok(Environment::Live),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Candlestick bucket size accepted by the candle stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandlestickGranularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M4,
    M5,
    M10,
    M15,
    M30,
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
    W,
    M,
}

impl CandlestickGranularity {
    pub const ALL: [CandlestickGranularity; 21] = [
        CandlestickGranularity::S5,
        CandlestickGranularity::S10,
        CandlestickGranularity::S15,
        CandlestickGranularity::S30,
        CandlestickGranularity::M1,
        CandlestickGranularity::M2,
        CandlestickGranularity::M4,
        CandlestickGranularity::M5,
        CandlestickGranularity::M10,
        CandlestickGranularity::M15,
        CandlestickGranularity::M30,
        CandlestickGranularity::H1,
        CandlestickGranularity::H2,
        CandlestickGranularity::H3,
        CandlestickGranularity::H4,
        CandlestickGranularity::H6,
        CandlestickGranularity::H8,
        CandlestickGranularity::H12,
        CandlestickGranularity::D,
        CandlestickGranularity::W,
        CandlestickGranularity::M,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CandlestickGranularity::S5 => "S5",
            CandlestickGranularity::S10 => "S10",
            CandlestickGranularity::S15 => "S15",
            CandlestickGranularity::S30 => "S30",
            CandlestickGranularity::M1 => "M1",
            CandlestickGranularity::M2 => "M2",
            CandlestickGranularity::M4 => "M4",
            CandlestickGranularity::M5 => "M5",
            CandlestickGranularity::M10 => "M10",
            CandlestickGranularity::M15 => "M15",
            CandlestickGranularity::M30 => "M30",
            CandlestickGranularity::H1 => "H1",
            CandlestickGranularity::H2 => "H2",
            CandlestickGranularity::H3 => "H3",
            CandlestickGranularity::H4 => "H4",
            CandlestickGranularity::H6 => "H6",
            CandlestickGranularity::H8 => "H8",
            CandlestickGranularity::H12 => "H12",
            CandlestickGranularity::D => "D",
            CandlestickGranularity::W => "W",
            CandlestickGranularity::M => "M",
        }
    }
}

impl AsRef<str> for CandlestickGranularity {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CandlestickGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive: `M` is a month, `M1` a minute
impl FromStr for CandlestickGranularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|granularity| granularity.as_str() == value)
            .ok_or_else(|| format!("unknown granularity: {value}"))
    }
}
