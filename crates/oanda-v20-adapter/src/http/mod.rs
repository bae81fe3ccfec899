/*
[INPUT]:  HTTP client configuration, credentials and REST endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;

pub use error::{Result, V20Error};

pub use client::{ClientConfig, Credentials, StreamConfig, V20Client};
