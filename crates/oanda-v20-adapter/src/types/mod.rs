/*
[INPUT]:  v20 wire schema and serde requirements
[OUTPUT]: Typed Rust structs/enums for stream records and client settings
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

pub mod enums;
pub mod stream;

pub use enums::*;
pub use stream::*;
