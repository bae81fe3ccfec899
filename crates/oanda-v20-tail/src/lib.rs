/*
[INPUT]:  Module declarations for the stream tail binary
[OUTPUT]: Public API for configuration loading and event output
[POS]:    Library root for oanda-v20-tail
[UPDATE]: When adding new modules or changing public exports
*/

pub mod config;
pub mod output;

pub use config::TailConfig;
pub use output::JsonLineWriter;
