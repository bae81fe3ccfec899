/*
[INPUT]:  One non-empty stream line and the expected record type
[OUTPUT]: Heartbeat, malformed heartbeat, or typed data record; terminal errors otherwise
[POS]:    Streaming layer - record classification and decoding
[UPDATE]: When the heartbeat marker or error payload shape changes
*/

use serde::Deserialize;

use super::{StreamError, StreamEvent};
use crate::types::{HEARTBEAT_TYPE, Heartbeat};

/// Outcome of classifying one line
#[derive(Debug)]
pub enum Record<T> {
    Heartbeat(Heartbeat),
    /// Tagged as a heartbeat but not decodable; not fatal
    MalformedHeartbeat(serde_json::Error),
    Data(T),
}

/// Structural view used to route a line before decoding it fully
#[derive(Debug, Deserialize)]
struct Probe {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

/// Classify and decode one line read from the `T::ENDPOINT` stream.
///
/// Heartbeats are recognised by the value of the `type` field, never by the raw
/// text, so key order and spacing do not matter. `line_no` is the 1-based record
/// index used in errors.
pub fn classify<T: StreamEvent>(line: &str, line_no: u64) -> Result<Record<T>, StreamError> {
    let probe: Probe = serde_json::from_str(line).map_err(|source| StreamError::Decode {
        line: line_no,
        source,
    })?;

    let error_message = probe.error_message.filter(|message| !message.is_empty());

    match probe.kind.as_deref() {
        Some(HEARTBEAT_TYPE) => {
            return Ok(match serde_json::from_str::<Heartbeat>(line) {
                Ok(heartbeat) => Record::Heartbeat(heartbeat),
                Err(err) => Record::MalformedHeartbeat(err),
            });
        }
        Some(kind) if !kind.is_empty() => {}
        _ => {
            if let Some(message) = error_message {
                return Err(StreamError::Api {
                    status: None,
                    message,
                });
            }
            if T::ENDPOINT.requires_discriminant() {
                return Err(StreamError::MissingDiscriminant {
                    endpoint: T::ENDPOINT,
                    line: line_no,
                });
            }
        }
    }

    serde_json::from_str::<T>(line)
        .map(Record::Data)
        .map_err(|source| match error_message {
            Some(message) => StreamError::Api {
                status: None,
                message,
            },
            None => StreamError::Decode {
                line: line_no,
                source,
            },
        })
}
