// src/protocol/mod.rs
//
// The line-oriented wire protocol surface: JSON/plain-text response shapes,
// the binary orderbook encoder, and the command dispatcher that ties them
// to an `Engine`.

pub mod binary;
pub mod dispatcher;
pub mod json;

pub use dispatcher::serve;
