// src/engine.rs
//
// The top-level matching engine: ties the order book, the order registry,
// and the account registry together, and implements the order lifecycle
// (admission, matching, residual placement, cancellation, post-mortem
// lookup) described for the order lifecycle.
//
// Single-threaded by design: one command is fully processed —
// every fill, every cleanup, every account update — before the next is
// read. Nothing here spawns a thread or holds a lock.

use crate::account::AccountRegistry;
use crate::book::{fok_can_buy, fok_can_sell, OrderBook};
use crate::error::ValidationError;
use crate::order::{Fill, Order, OrderRegistry};
use crate::timestamp;
use crate::types::{saturate, OrderKind, Side, MAX_ACCOUNTS, SATURATION_BOUND};

/// Global market state: the last trade, if any has occurred.
#[derive(Debug, Default)]
pub struct MarketState {
    pub last_trade_time: Option<String>,
    /// `-1` is the "no trade yet" sentinel.
    pub last_price: i64,
    pub last_size: i64,
}

impl MarketState {
    fn new() -> Self {
        Self { last_trade_time: None, last_price: -1, last_size: -1 }
    }

    pub fn has_traded(&self) -> bool {
        self.last_price != -1
    }
}

/// Outcome of a `CANCEL` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// `id` is outside the known order range.
    NotFound,
    /// `id` exists but cancelling it is a no-op (not a LIMIT order, or
    /// already closed) — the order's current state is still reported.
    NoOp,
    /// The order was resting and has been removed from the book.
    Cancelled,
}

/// A read-only snapshot of quote state, ready to be rendered as the Quote
/// JSON response. Field presence mirrors the wire contract: `bid`/`ask` are only
/// `Some` when that side of the book is non-empty; the `last_*` fields are
/// only `Some` once at least one trade has occurred.
#[derive(Debug)]
pub struct Quote {
    pub bid: Option<i64>,
    pub ask: Option<i64>,
    pub bid_size: i64,
    pub ask_size: i64,
    pub bid_depth: i64,
    pub ask_depth: i64,
    pub last_trade_time: Option<String>,
    pub last_size: Option<i64>,
    pub last_price: Option<i64>,
}

/// Synthetic allocation counters for `__DEBUG_MEMORY__` — this engine has no
/// custom allocator hook, so these are the object counts it already tracks
/// rather than true heap-profiler output.
#[derive(Debug)]
pub struct DebugMemory {
    pub orders: usize,
    pub accounts: usize,
    pub levels: usize,
    pub fills: usize,
}

/// The single-symbol matching engine for one venue.
pub struct Engine {
    pub venue: String,
    pub symbol: String,
    pub book: OrderBook,
    pub orders: OrderRegistry,
    pub accounts: AccountRegistry,
    pub market: MarketState,
}

/// Truncate (and own) an argv token the way the original backend copies its
/// two positional arguments into fixed 64-byte buffers — the
/// byte budget includes the implicit C-string terminator, so 63 content
/// bytes survive.
pub fn truncate_token(raw: &str, max_bytes: usize) -> String {
    if raw.len() <= max_bytes {
        return raw.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !raw.is_char_boundary(end) {
        end -= 1;
    }
    raw[..end].to_string()
}

impl Engine {
    pub fn new(venue: &str, symbol: &str) -> Self {
        Self {
            venue: truncate_token(venue, 63),
            symbol: truncate_token(symbol, 63),
            book: OrderBook::new(),
            orders: OrderRegistry::new(),
            accounts: AccountRegistry::new(),
            market: MarketState::new(),
        }
    }

    /// Admit a new order. Validates input shape first; a failed validation
    /// never advances the order-id counter.
    /// On success, returns the new order's id — the order has already been
    /// matched, cleaned up, and (if residual) rested or closed.
    pub fn submit_order(
        &mut self,
        account_name: &str,
        account_id: u64,
        qty: i64,
        price: i64,
        direction_wire: i64,
        kind_wire: i64,
    ) -> Result<u64, ValidationError> {
        if price < 0 || qty <= 0 {
            return Err(ValidationError::SillyValue);
        }
        let side = Side::from_wire(direction_wire).ok_or(ValidationError::SillyValue)?;
        // An unrecognized kind token is not a validation failure: the order
        // is admitted and reported back with `orderType: "unknown"` (see
        // `OrderKind::Unknown`), matching the original backend's
        // `orderType_to_print` default branch.
        let kind = OrderKind::from_wire(kind_wire);

        if account_id >= MAX_ACCOUNTS {
            return Err(ValidationError::AccountCapExceeded);
        }
        if self.orders.would_exceed_cap() {
            return Err(ValidationError::TooManyOrders);
        }

        let account_name = truncate_token(account_name, 63);
        self.accounts
            .lookup_or_create(account_id, &account_name)
            .expect("account id already checked against MAX_ACCOUNTS");

        let id = self.orders.peek_next_id();
        let ts = timestamp::now();
        let order = Order::new(id, side, qty, price, kind, account_id, ts);
        let id = self.orders.register(order);
        self.accounts.attach_order(account_id, id);

        let should_run = match kind {
            OrderKind::Fok => match side {
                Side::Buy => fok_can_buy(&self.book, &self.orders, qty, price),
                Side::Sell => fok_can_sell(&self.book, &self.orders, qty, price),
            },
            _ => true,
        };

        if should_run {
            self.run_order(id);
        }

        // Cleanup runs against whichever side the incoming order matched
        // against, even if nothing actually crossed (a no-op scan is cheap
        // and keeps the invariant trivially true to state).
        self.book.cleanup_side(side.opposite(), |oid| {
            self.orders.get(oid).expect("book only references registered orders").open
        });

        // MARKET orders report price 0 once matching is done, regardless of
        // whether they rested (they never do) or closed.
        if kind == OrderKind::Market {
            self.orders.get_mut(id).unwrap().price = 0;
        }

        let (is_open, kind, side, price) = {
            let order = self.orders.get(id).unwrap();
            (order.open, order.kind, order.direction, order.price)
        };
        if is_open {
            if kind.rests_on_book() {
                self.book.insert_resting(side, price, id);
            } else {
                let order = self.orders.get_mut(id).unwrap();
                order.open = false;
                order.remaining_qty = 0;
            }
        }

        Ok(id)
    }

    /// Match an already-admitted order against the opposite side of the
    /// book until it is filled or no further liquidity qualifies.
    fn run_order(&mut self, incoming_id: u64) {
        let (side, kind, limit_price) = {
            let order = self.orders.get(incoming_id).unwrap();
            (order.direction, order.kind, order.price)
        };

        match side {
            Side::Sell => {
                // Snapshot level ids up front: the bid side is not mutated
                // (no pops) until the post-run cleanup pass, so this mirrors
                // the original's `current_node = current_node->next` walk
                // exactly while sidestepping a long-lived borrow of `self.book`.
                let levels: Vec<(i64, Vec<u64>)> = self
                    .book
                    .bid_levels_desc()
                    .map(|(p, q)| (p, q.iter().copied().collect()))
                    .collect();
                for (price, ids) in levels {
                    if kind != OrderKind::Market && price < limit_price {
                        break;
                    }
                    for standing_id in ids {
                        if self.orders.get(incoming_id).unwrap().remaining_qty == 0 {
                            return;
                        }
                        self.cross(standing_id, incoming_id);
                    }
                }
            }
            Side::Buy => {
                let levels: Vec<(i64, Vec<u64>)> = self
                    .book
                    .ask_levels_asc()
                    .map(|(p, q)| (p, q.iter().copied().collect()))
                    .collect();
                for (price, ids) in levels {
                    if kind != OrderKind::Market && price > limit_price {
                        break;
                    }
                    for standing_id in ids {
                        if self.orders.get(incoming_id).unwrap().remaining_qty == 0 {
                            return;
                        }
                        self.cross(standing_id, incoming_id);
                    }
                }
            }
        }
    }

    /// Match one standing order against one incoming order, trading at the
    /// standing (maker) order's price.
    fn cross(&mut self, standing_id: u64, incoming_id: u64) {
        let (trade_qty, trade_price, standing_side) = {
            let standing = self.orders.get(standing_id).expect("standing order must exist");
            let incoming = self.orders.get(incoming_id).expect("incoming order must exist");
            if standing.remaining_qty == 0 || incoming.remaining_qty == 0 {
                return;
            }
            (
                standing.remaining_qty.min(incoming.remaining_qty),
                standing.price,
                standing.direction,
            )
        };

        let ts = timestamp::now();
        let standing_account;
        let incoming_account;
        {
            let standing = self.orders.get_mut(standing_id).unwrap();
            standing.remaining_qty -= trade_qty;
            standing.total_filled += trade_qty;
            standing.fills.push(Fill { price: trade_price, qty: trade_qty, ts: ts.clone() });
            if standing.remaining_qty == 0 {
                standing.open = false;
            }
            standing_account = standing.account_id;
        }
        {
            let incoming = self.orders.get_mut(incoming_id).unwrap();
            incoming.remaining_qty -= trade_qty;
            incoming.total_filled += trade_qty;
            incoming.fills.push(Fill { price: trade_price, qty: trade_qty, ts: ts.clone() });
            if incoming.remaining_qty == 0 {
                incoming.open = false;
            }
            incoming_account = incoming.account_id;
        }

        self.market.last_trade_time = Some(ts);
        self.market.last_price = trade_price;
        self.market.last_size = trade_qty;

        if let Some(account) = self.accounts.get_mut(standing_account) {
            account.apply_trade(trade_qty, trade_price, standing_side);
        }
        if let Some(account) = self.accounts.get_mut(incoming_account) {
            account.apply_trade(trade_qty, trade_price, standing_side.opposite());
        }
    }

    /// `STATUS id` — pure lookup, never mutates state.
    pub fn status(&self, id: u64) -> Option<&Order> {
        self.orders.get(id)
    }

    /// `STATUSALL acct_id` — every order the account has ever placed.
    pub fn status_all(&self, account_id: u64) -> Option<Vec<&Order>> {
        let account = self.accounts.get(account_id)?;
        Some(
            account
                .orders
                .iter()
                .filter_map(|&id| self.orders.get(id))
                .collect(),
        )
    }

    /// `CANCEL id`.
    pub fn cancel(&mut self, id: u64) -> CancelOutcome {
        let Some(order) = self.orders.get(id) else {
            return CancelOutcome::NotFound;
        };
        if order.kind != OrderKind::Limit || !order.open {
            return CancelOutcome::NoOp;
        }
        let (price, side) = (order.price, order.direction);
        self.book.remove_order(side, price, id);
        let order = self.orders.get_mut(id).unwrap();
        order.open = false;
        order.remaining_qty = 0;
        CancelOutcome::Cancelled
    }

    /// `__ACC_FROM_ID__ id`.
    pub fn account_name_for_order(&self, id: u64) -> Option<&str> {
        let order = self.orders.get(id)?;
        let account = self.accounts.get(order.account_id)?;
        Some(account.name.as_str())
    }

    fn level_qty(&self, side: Side, price: i64) -> i64 {
        let Some(queue) = self.book.find_level(price, side) else { return 0 };
        let mut total: i64 = 0;
        for &id in queue.iter() {
            let qty = self.orders.get(id).expect("book only references registered orders").remaining_qty;
            total = total.saturating_add(qty).min(SATURATION_BOUND);
        }
        total
    }

    fn side_depth(&self, side: Side) -> i64 {
        let prices: Vec<i64> = match side {
            Side::Buy => self.book.bids.keys().copied().collect(),
            Side::Sell => self.book.asks.keys().copied().collect(),
        };
        let mut total: i64 = 0;
        for price in prices {
            total = total.saturating_add(self.level_qty(side, price)).min(SATURATION_BOUND);
        }
        total
    }

    /// `QUOTE`.
    pub fn quote(&self) -> Quote {
        let bid = self.book.best_bid();
        let ask = self.book.best_ask();
        Quote {
            bid,
            ask,
            bid_size: bid.map(|p| self.level_qty(Side::Buy, p)).unwrap_or(0),
            ask_size: ask.map(|p| self.level_qty(Side::Sell, p)).unwrap_or(0),
            bid_depth: self.side_depth(Side::Buy),
            ask_depth: self.side_depth(Side::Sell),
            last_trade_time: self.market.has_traded().then(|| self.market.last_trade_time.clone().unwrap()),
            last_size: self.market.has_traded().then_some(self.market.last_size),
            last_price: self.market.has_traded().then_some(self.market.last_price),
        }
    }

    /// `__DEBUG_MEMORY__`.
    pub fn debug_memory(&self) -> DebugMemory {
        DebugMemory {
            orders: self.orders.len(),
            accounts: self.accounts.count(),
            levels: self.book.bids.len() + self.book.asks.len(),
            fills: self.orders.total_fill_count(),
        }
    }

    /// `__SCORES__` — an HTML scoreboard of every account's position, cash,
    /// and mark-to-market NAV (`shares * last_price + cents`, saturating).
    pub fn scoreboard_html(&self) -> String {
        let last_price = if self.market.has_traded() { self.market.last_price } else { 0 };
        let mut rows = String::new();
        for (id, account) in self.accounts.iter() {
            let nav = account.nav(last_price);
            rows.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                id, account.name, account.shares, account.cents, nav, account.pos_min, account.pos_max,
            ));
        }
        format!(
            "<html><head><title>{venue} {symbol} scores</title></head><body>\n\
             <table border=\"1\">\n\
             <tr><th>Account</th><th>Name</th><th>Shares</th><th>Cents</th><th>NAV</th><th>Min</th><th>Max</th></tr>\n\
             {rows}</table>\n</body></html>",
            venue = self.venue,
            symbol = self.symbol,
        )
    }
}
