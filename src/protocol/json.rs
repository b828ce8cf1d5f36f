// src/protocol/json.rs
//
// Wire-format DTOs for every textual response the dispatcher can emit.
// These are plain serde structs rather than hand-built strings: `serde` and
// `serde_json` render the wire shapes directly, key by key.
//
// Field order here follows struct declaration order — `serde_json` preserves
// it for plain structs — and is chosen to match the original backend's
// `printf` key order exactly, for frontend compatibility.

use serde::Serialize;

use crate::engine::{DebugMemory, Engine, Quote};
use crate::order::{Fill, Order};

#[derive(Debug, Serialize)]
pub struct FillJson {
    pub price: i64,
    pub qty: i64,
    pub ts: String,
}

impl From<&Fill> for FillJson {
    fn from(fill: &Fill) -> Self {
        FillJson { price: fill.price, qty: fill.qty, ts: fill.ts.clone() }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderJson {
    pub ok: bool,
    pub venue: String,
    pub symbol: String,
    pub direction: String,
    #[serde(rename = "originalQty")]
    pub original_qty: i64,
    pub qty: i64,
    pub price: i64,
    #[serde(rename = "orderType")]
    pub order_type: String,
    pub id: u64,
    pub account: String,
    pub ts: String,
    #[serde(rename = "totalFilled")]
    pub total_filled: i64,
    pub open: bool,
    pub fills: Vec<FillJson>,
}

impl OrderJson {
    pub fn new(engine: &Engine, order: &Order) -> Self {
        let account = engine
            .accounts
            .get(order.account_id)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        OrderJson {
            ok: true,
            venue: engine.venue.clone(),
            symbol: engine.symbol.clone(),
            direction: order.direction.as_str().to_string(),
            original_qty: order.original_qty,
            qty: order.remaining_qty,
            price: order.price,
            order_type: order.kind.as_wire_str().to_string(),
            id: order.id,
            account,
            ts: order.ts.clone(),
            total_filled: order.total_filled,
            open: order.open,
            fills: order.fills.iter().map(FillJson::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorJson {
    pub ok: bool,
    pub error: String,
}

impl ErrorJson {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorJson { ok: false, error: message.into() }
    }

    pub fn backend_error(code: u8) -> Self {
        ErrorJson::new(format!("Backend error {code}"))
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteJson {
    pub ok: bool,
    pub venue: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ask: Option<i64>,
    #[serde(rename = "bidSize")]
    pub bid_size: i64,
    #[serde(rename = "askSize")]
    pub ask_size: i64,
    #[serde(rename = "bidDepth")]
    pub bid_depth: i64,
    #[serde(rename = "askDepth")]
    pub ask_depth: i64,
    #[serde(rename = "lastTrade", skip_serializing_if = "Option::is_none")]
    pub last_trade: Option<String>,
    #[serde(rename = "lastSize", skip_serializing_if = "Option::is_none")]
    pub last_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<i64>,
    #[serde(rename = "quoteTime")]
    pub quote_time: String,
}

impl QuoteJson {
    pub fn new(engine: &Engine, quote: Quote, quote_time: String) -> Self {
        QuoteJson {
            ok: true,
            venue: engine.venue.clone(),
            symbol: engine.symbol.clone(),
            bid: quote.bid,
            ask: quote.ask,
            bid_size: quote.bid_size,
            ask_size: quote.ask_size,
            bid_depth: quote.bid_depth,
            ask_depth: quote.ask_depth,
            last_trade: quote.last_trade_time,
            last_size: quote.last_size,
            last: quote.last_price,
            quote_time,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LevelJson {
    pub price: i64,
    pub qty: i64,
    #[serde(rename = "isBuy")]
    pub is_buy: bool,
}

#[derive(Debug, Serialize)]
pub struct OrderbookJson {
    pub ok: bool,
    pub venue: String,
    pub symbol: String,
    pub ts: String,
    pub asks: Vec<LevelJson>,
    pub bids: Vec<LevelJson>,
}

impl OrderbookJson {
    pub fn new(engine: &Engine, ts: String) -> Self {
        let asks = engine
            .book
            .ask_levels_asc()
            .flat_map(|(price, queue)| {
                queue.iter().map(move |&id| {
                    let qty = engine.orders.get(id).expect("book references a live order").remaining_qty;
                    LevelJson { price, qty, is_buy: false }
                })
            })
            .collect();
        let bids = engine
            .book
            .bid_levels_desc()
            .flat_map(|(price, queue)| {
                queue.iter().map(move |&id| {
                    let qty = engine.orders.get(id).expect("book references a live order").remaining_qty;
                    LevelJson { price, qty, is_buy: true }
                })
            })
            .collect();
        OrderbookJson { ok: true, venue: engine.venue.clone(), symbol: engine.symbol.clone(), ts, asks, bids }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusAllJson {
    pub ok: bool,
    pub venue: String,
    pub orders: Vec<OrderJson>,
}

#[derive(Debug, Serialize)]
pub struct DebugMemoryJson {
    pub ok: bool,
    pub orders: usize,
    pub accounts: usize,
    pub levels: usize,
    pub fills: usize,
}

impl From<DebugMemory> for DebugMemoryJson {
    fn from(d: DebugMemory) -> Self {
        DebugMemoryJson { ok: true, orders: d.orders, accounts: d.accounts, levels: d.levels, fills: d.fills }
    }
}

#[derive(Debug, Serialize)]
pub struct TimestampJson {
    pub ok: bool,
    pub ts: String,
}
