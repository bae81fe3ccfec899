/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public OANDA v20 adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod http;
pub mod stream;
pub mod types;

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    Credentials,
    Result,
    StreamConfig,
    V20Client,
    V20Error,
};

// Re-export commonly used types from stream
pub use stream::{
    BoxError,
    StreamEndpoint,
    StreamError,
    StreamEvent,
    StreamingConnection,
};

// Re-export all types
pub use types::*;

pub use tokio_util::sync::CancellationToken;
