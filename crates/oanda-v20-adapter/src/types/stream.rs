/*
[INPUT]:  Newline-delimited JSON records from the v20 streaming endpoints
[OUTPUT]: Typed stream records (prices, transactions, account changes, candles, heartbeats)
[POS]:    Data layer - stream record shapes
[UPDATE]: When stream payloads gain fields or a new stream endpoint is added
*/

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::stream::{StreamEndpoint, StreamEvent};

/// Discriminant value carried by keep-alive records
pub const HEARTBEAT_TYPE: &str = "HEARTBEAT";

/// Keep-alive record interleaved with data on every stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    #[serde(rename = "type")]
    pub kind: String,
    pub time: DateTime<Utc>,
    /// Only sent on the transaction stream
    #[serde(
        rename = "lastTransactionID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transaction_id: Option<String>,
}

/// One level of the price ladder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default)]
    pub liquidity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub bids: Vec<PriceBucket>,
    #[serde(default)]
    pub asks: Vec<PriceBucket>,
    #[serde(
        default,
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub closeout_bid: Option<Decimal>,
    #[serde(
        default,
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub closeout_ask: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub tradeable: bool,
}

impl PriceTick {
    /// Top of book on the bid side
    pub fn best_bid(&self) -> Option<&PriceBucket> {
        self.bids.first()
    }

    /// Top of book on the ask side
    pub fn best_ask(&self) -> Option<&PriceBucket> {
        self.asks.first()
    }
}

/// Transaction stream record; the transaction body is passed through untouched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub time: String,
    #[serde(rename = "transactionID", default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(rename = "accountID", default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(rename = "batchID", default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_raw",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction: Option<Box<RawValue>>,
}

/// Account change set.
///
/// The service sends no discriminant for this record; it is identified by the
/// endpoint it arrives on. A `type` field is tolerated if present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountChanges {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub time: String,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_raw",
        skip_serializing_if = "Option::is_none"
    )]
    pub changes: Option<Box<RawValue>>,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_raw",
        skip_serializing_if = "Option::is_none"
    )]
    pub state: Option<Box<RawValue>>,
    #[serde(rename = "lastTransactionID")]
    pub last_transaction_id: String,
}

/// Open/high/low/close quadruple
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    #[serde(deserialize_with = "serde_helpers::deserialize_f64")]
    pub open: f64,
    #[serde(deserialize_with = "serde_helpers::deserialize_f64")]
    pub high: f64,
    #[serde(deserialize_with = "serde_helpers::deserialize_f64")]
    pub low: f64,
    #[serde(deserialize_with = "serde_helpers::deserialize_f64")]
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamCandle {
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Ohlc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Ohlc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<Ohlc>,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleUpdate {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub granularity: String,
    #[serde(default)]
    pub candles: Vec<StreamCandle>,
}

impl StreamEvent for PriceTick {
    const ENDPOINT: StreamEndpoint = StreamEndpoint::Prices;
}

impl StreamEvent for TransactionEvent {
    const ENDPOINT: StreamEndpoint = StreamEndpoint::Transactions;
}

impl StreamEvent for AccountChanges {
    const ENDPOINT: StreamEndpoint = StreamEndpoint::AccountChanges;
}

impl StreamEvent for CandleUpdate {
    const ENDPOINT: StreamEndpoint = StreamEndpoint::Candles;
}

mod serde_helpers {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use serde_json::value::RawValue;

    /// Keeps an explicit `null` as a raw payload; only a missing field is `None`
    pub fn deserialize_raw<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Box::<RawValue>::deserialize(deserializer).map(Some)
    }

    /// Accepts a JSON number or a numeric string
    pub fn deserialize_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Some(number) = value.as_f64() {
            return Ok(number);
        }

        if let Some(raw) = value.as_str() {
            return raw.trim().parse::<f64>().map_err(serde::de::Error::custom);
        }

        Err(serde::de::Error::custom("invalid numeric value"))
    }
}
