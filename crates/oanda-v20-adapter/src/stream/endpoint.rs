/*
[INPUT]:  Stream kind, account identifier and call-specific parameters
[OUTPUT]: Fully encoded stream URLs and the decoding contract per endpoint
[POS]:    Streaming layer - endpoint catalogue and URL construction
[UPDATE]: When endpoint paths or query parameters change
*/

use std::fmt;

use serde::de::DeserializeOwned;
use url::Url;

use super::StreamError;

/// The four long-lived feeds exposed by the streaming API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEndpoint {
    Prices,
    Transactions,
    AccountChanges,
    Candles,
}

impl StreamEndpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamEndpoint::Prices => "prices",
            StreamEndpoint::Transactions => "transactions",
            StreamEndpoint::AccountChanges => "account_changes",
            StreamEndpoint::Candles => "candles",
        }
    }

    /// Whether records on this feed must carry a non-empty `type` field
    pub fn requires_discriminant(self) -> bool {
        !matches!(self, StreamEndpoint::AccountChanges)
    }
}

impl fmt::Display for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record type that can be decoded from one stream endpoint
pub trait StreamEvent: DeserializeOwned + Send + 'static {
    const ENDPOINT: StreamEndpoint;
}

/// Endpoint plus the parameters of one stream call
#[derive(Debug, Clone)]
pub(crate) enum StreamRoute<'a> {
    Prices { instruments: Vec<&'a str> },
    Transactions,
    AccountChanges,
    Candles { instrument: &'a str, granularity: &'a str },
}

impl<'a> StreamRoute<'a> {
    pub(crate) fn endpoint(&self) -> StreamEndpoint {
        match self {
            StreamRoute::Prices { .. } => StreamEndpoint::Prices,
            StreamRoute::Transactions => StreamEndpoint::Transactions,
            StreamRoute::AccountChanges => StreamEndpoint::AccountChanges,
            StreamRoute::Candles { .. } => StreamEndpoint::Candles,
        }
    }

    /// Reject parameters the service would refuse before opening a connection
    pub(crate) fn validate(&self) -> Result<(), StreamError> {
        match self {
            StreamRoute::Prices { instruments } => {
                if instruments.is_empty() {
                    return Err(StreamError::InvalidRequest(
                        "price stream needs at least one instrument".to_string(),
                    ));
                }
                if instruments.iter().any(|instrument| instrument.trim().is_empty()) {
                    return Err(StreamError::InvalidRequest(
                        "instrument identifiers must not be empty".to_string(),
                    ));
                }
            }
            StreamRoute::Candles {
                instrument,
                granularity,
            } => {
                if instrument.trim().is_empty() {
                    return Err(StreamError::InvalidRequest(
                        "candle stream needs an instrument".to_string(),
                    ));
                }
                if granularity.trim().is_empty() {
                    return Err(StreamError::InvalidRequest(
                        "candle stream needs a granularity".to_string(),
                    ));
                }
            }
            StreamRoute::Transactions | StreamRoute::AccountChanges => {}
        }
        Ok(())
    }

    /// Build the endpoint URL below `base` for `account_id`.
    ///
    /// Path segments are percent-encoded; query values are form-encoded, so the
    /// instrument separator goes out as `%2C`.
    pub(crate) fn url(&self, base: &Url, account_id: &str) -> Result<Url, StreamError> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StreamError::InvalidRequest(format!("stream base url cannot take a path: {base}"))
            })?;
            segments.pop_if_empty().push("accounts").push(account_id);
            match self {
                StreamRoute::Prices { .. } => {
                    segments.extend(["pricing", "stream"]);
                }
                StreamRoute::Transactions => {
                    segments.extend(["transactions", "stream"]);
                }
                StreamRoute::AccountChanges => {
                    segments.extend(["changes", "stream"]);
                }
                StreamRoute::Candles { instrument, .. } => {
                    segments.extend(["instruments", *instrument, "candles", "stream"]);
                }
            }
        }

        match self {
            StreamRoute::Prices { instruments } => {
                url.query_pairs_mut()
                    .append_pair("instruments", &instruments.join(","));
            }
            StreamRoute::Candles { granularity, .. } => {
                url.query_pairs_mut().append_pair("granularity", granularity);
            }
            StreamRoute::Transactions | StreamRoute::AccountChanges => {}
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn base() -> Url {
        Url::parse("https://stream-fxpractice.oanda.com/v3").expect("base url")
    }

    #[rstest]
    #[case(
        StreamRoute::Prices { instruments: vec!["EUR_USD", "USD_JPY"] },
        "https://stream-fxpractice.oanda.com/v3/accounts/101-004-1/pricing/stream?instruments=EUR_USD%2CUSD_JPY"
    )]
    #[case(
        StreamRoute::Transactions,
        "https://stream-fxpractice.oanda.com/v3/accounts/101-004-1/transactions/stream"
    )]
    #[case(
        StreamRoute::AccountChanges,
        "https://stream-fxpractice.oanda.com/v3/accounts/101-004-1/changes/stream"
    )]
    #[case(
        StreamRoute::Candles { instrument: "EUR_USD", granularity: "M1" },
        "https://stream-fxpractice.oanda.com/v3/accounts/101-004-1/instruments/EUR_USD/candles/stream?granularity=M1"
    )]
    fn test_route_urls(#[case] route: StreamRoute<'static>, #[case] expected: &str) {
        let url = route.url(&base(), "101-004-1").expect("url");
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_route_url_with_trailing_slash_base() {
        let base = Url::parse("http://127.0.0.1:8080/").expect("base url");
        let url = StreamRoute::Transactions.url(&base, "acct").expect("url");
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/accounts/acct/transactions/stream");
    }

    #[test]
    fn test_route_url_escapes_path_segments() {
        let route = StreamRoute::Candles {
            instrument: "EUR/USD",
            granularity: "M 1",
        };
        let url = route.url(&base(), "a b").expect("url");
        assert_eq!(
            url.as_str(),
            "https://stream-fxpractice.oanda.com/v3/accounts/a%20b/instruments/EUR%2FUSD/candles/stream?granularity=M+1"
        );
    }

    #[test]
    fn test_validate_rejects_empty_instruments() {
        let route = StreamRoute::Prices {
            instruments: Vec::new(),
        };
        assert!(matches!(route.validate(), Err(StreamError::InvalidRequest(_))));

        let route = StreamRoute::Prices {
            instruments: vec!["EUR_USD", " "],
        };
        assert!(matches!(route.validate(), Err(StreamError::InvalidRequest(_))));
    }

    #[test]
    fn test_validate_candles() {
        let ok = StreamRoute::Candles {
            instrument: "EUR_USD",
            granularity: "H1",
        };
        assert!(ok.validate().is_ok());

        let missing = StreamRoute::Candles {
            instrument: "EUR_USD",
            granularity: "",
        };
        assert!(matches!(missing.validate(), Err(StreamError::InvalidRequest(_))));
    }

    #[test]
    fn test_endpoint_discriminant_rules() {
        assert!(StreamEndpoint::Prices.requires_discriminant());
        assert!(StreamEndpoint::Candles.requires_discriminant());
        assert!(!StreamEndpoint::AccountChanges.requires_discriminant());
        assert_eq!(StreamRoute::AccountChanges.endpoint(), StreamEndpoint::AccountChanges);
    }
}
