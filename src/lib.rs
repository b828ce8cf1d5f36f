// src/lib.rs
//
// venue_core — the in-process matching engine of a toy stock exchange.
// Maintains one symbol's limit order book for one venue: price-time
// priority matching for LIMIT/MARKET/IOC/FOK orders, per-account position
// accounting, and the line-oriented protocol a frontend drives it with.
//
// Pure Rust: cargo test

pub mod account;
pub mod book;
pub mod engine;
pub mod error;
pub mod order;
pub mod protocol;
pub mod timestamp;
pub mod types;

pub use account::{Account, AccountRegistry};
pub use book::OrderBook;
pub use engine::Engine;
pub use error::{LookupError, ValidationError};
pub use order::{Fill, Order, OrderRegistry};
pub use types::{OrderKind, Side};
