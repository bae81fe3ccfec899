/*
[INPUT]:  Stream base URL, account credentials and per-endpoint parameters
[OUTPUT]: Decoded stream records delivered to caller handlers in arrival order
[POS]:    Streaming layer - long-lived newline-delimited JSON feeds
[UPDATE]: When adding stream endpoints or changing dispatch semantics
*/

pub mod client;
pub mod decode;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod reader;

pub use client::StreamingConnection;
pub use decode::{Record, classify};
pub use endpoint::{StreamEndpoint, StreamEvent};
pub use error::{BoxError, StreamError};
pub use reader::LineReader;
