// src/book.rs
//
// The order book geometry: two price-ordered level lists (bids, asks), each
// holding a time-ordered FIFO of order ids at that price.
//
// Levels are `BTreeMap<i64, VecDeque<u64>>` rather than a hand-rolled
// intrusive doubly-linked list. A `BTreeMap` already keeps keys in strict
// sorted order (satisfying the strictly-decreasing/increasing book-ordering
// invariant for free) and a `VecDeque` already gives O(1) push/pop at both
// ends for the FIFO. Bids read highest-price-first via `.next_back()` /
// `.iter().rev()`; asks read lowest-price-first via `.next()` / `.iter()`.
//
// Order nodes store only the order id (`u64`); the order record itself lives
// in the `OrderRegistry` rather than a raw/owning pointer — a non-owning
// id into the global order registry.

use std::collections::{BTreeMap, VecDeque};

use crate::order::OrderRegistry;
use crate::types::Side;

#[derive(Debug, Default)]
pub struct OrderBook {
    pub bids: BTreeMap<i64, VecDeque<u64>>,
    pub asks: BTreeMap<i64, VecDeque<u64>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self { bids: BTreeMap::new(), asks: BTreeMap::new() }
    }

    pub fn best_bid(&self) -> Option<i64> {
        self.bids.keys().next_back().copied()
    }

    pub fn best_ask(&self) -> Option<i64> {
        self.asks.keys().next().copied()
    }

    fn levels(&self, side: Side) -> &BTreeMap<i64, VecDeque<u64>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i64, VecDeque<u64>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn find_level(&self, price: i64, side: Side) -> Option<&VecDeque<u64>> {
        self.levels(side).get(&price)
    }

    /// Splice a resting LIMIT order onto its side at its price, appending to
    /// the tail of that level's FIFO (or creating a new level if none exists
    /// at that price yet).
    pub fn insert_resting(&mut self, side: Side, price: i64, order_id: u64) {
        self.levels_mut(side).entry(price).or_default().push_back(order_id);
    }

    /// Remove a specific resting order from its level (used by `CANCEL`).
    /// Frees the level too if it becomes empty. Returns whether the order
    /// was found.
    pub fn remove_order(&mut self, side: Side, price: i64, order_id: u64) -> bool {
        let levels = self.levels_mut(side);
        let Some(queue) = levels.get_mut(&price) else { return false };
        let Some(pos) = queue.iter().position(|&id| id == order_id) else { return false };
        queue.remove(pos);
        if queue.is_empty() {
            levels.remove(&price);
        }
        true
    }

    /// Bid levels from best (highest price) to worst.
    pub fn bid_levels_desc(&self) -> impl Iterator<Item = (i64, &VecDeque<u64>)> {
        self.bids.iter().rev().map(|(p, q)| (*p, q))
    }

    /// Ask levels from best (lowest price) to worst.
    pub fn ask_levels_asc(&self) -> impl Iterator<Item = (i64, &VecDeque<u64>)> {
        self.asks.iter().map(|(p, q)| (*p, q))
    }

    /// Post-match cleanup: scan the given side from its head, freeing order
    /// ids whose order has closed (and the level itself once its FIFO is
    /// empty), stopping at the first order still open or when the side is
    /// exhausted. `is_open` queries the order registry; kept as a callback so
    /// `OrderBook` never needs to borrow `OrderRegistry` directly.
    pub fn cleanup_side(&mut self, side: Side, is_open: impl Fn(u64) -> bool) {
        loop {
            let best_price = match side {
                Side::Buy => self.bids.keys().next_back().copied(),
                Side::Sell => self.asks.keys().next().copied(),
            };
            let Some(price) = best_price else { break };

            let levels = self.levels_mut(side);
            let queue = levels.get_mut(&price).expect("listed level must be non-empty");
            while let Some(&front_id) = queue.front() {
                if is_open(front_id) {
                    break;
                }
                queue.pop_front();
            }

            if queue.is_empty() {
                levels.remove(&price);
                continue;
            }
            break;
        }
    }
}

/// FOK pre-check for a BUY: can `qty` be fully satisfied against the ask
/// side at or below `limit_price`? Subtraction-only running target, per
/// accumulating via addition instead could in principle overflow.
pub fn fok_can_buy(book: &OrderBook, orders: &OrderRegistry, qty: i64, limit_price: i64) -> bool {
    let mut remaining = qty;
    for (price, queue) in book.ask_levels_asc() {
        if price > limit_price {
            break;
        }
        for &id in queue.iter() {
            let order = orders.get(id).expect("order listed in book must exist in registry");
            remaining -= order.remaining_qty;
            if remaining <= 0 {
                return true;
            }
        }
    }
    false
}

/// FOK pre-check for a SELL: can `qty` be fully satisfied against the bid
/// side at or above `limit_price`?
pub fn fok_can_sell(book: &OrderBook, orders: &OrderRegistry, qty: i64, limit_price: i64) -> bool {
    let mut remaining = qty;
    for (price, queue) in book.bid_levels_desc() {
        if price < limit_price {
            break;
        }
        for &id in queue.iter() {
            let order = orders.get(id).expect("order listed in book must exist in registry");
            remaining -= order.remaining_qty;
            if remaining <= 0 {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::Order;
    use crate::types::OrderKind;

    fn push_order(orders: &mut OrderRegistry, side: Side, qty: i64, price: i64) -> u64 {
        let id = orders.peek_next_id();
        let order = Order::new(id, side, qty, price, OrderKind::Limit, 0, "t".into());
        orders.register(order)
    }

    #[test]
    fn insert_resting_maintains_price_order() {
        let mut book = OrderBook::new();
        book.insert_resting(Side::Buy, 100, 1);
        book.insert_resting(Side::Buy, 110, 2);
        book.insert_resting(Side::Buy, 105, 3);
        let prices: Vec<i64> = book.bid_levels_desc().map(|(p, _)| p).collect();
        assert_eq!(prices, vec![110, 105, 100]);
    }

    #[test]
    fn insert_resting_same_price_preserves_fifo() {
        let mut book = OrderBook::new();
        book.insert_resting(Side::Sell, 100, 1);
        book.insert_resting(Side::Sell, 100, 2);
        book.insert_resting(Side::Sell, 100, 3);
        let ids: Vec<u64> = book.find_level(100, Side::Sell).unwrap().iter().copied().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn remove_order_collapses_empty_level() {
        let mut book = OrderBook::new();
        book.insert_resting(Side::Buy, 100, 1);
        assert!(book.remove_order(Side::Buy, 100, 1));
        assert!(book.find_level(100, Side::Buy).is_none());
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn cleanup_side_stops_at_first_open_order() {
        let mut orders = OrderRegistry::new();
        let a = push_order(&mut orders, Side::Buy, 10, 100);
        let b = push_order(&mut orders, Side::Buy, 10, 100);
        orders.get_mut(a).unwrap().open = false;

        let mut book = OrderBook::new();
        book.insert_resting(Side::Buy, 100, a);
        book.insert_resting(Side::Buy, 100, b);

        book.cleanup_side(Side::Buy, |id| orders.get(id).unwrap().open);

        let remaining: Vec<u64> = book.find_level(100, Side::Buy).unwrap().iter().copied().collect();
        assert_eq!(remaining, vec![b]);
    }

    #[test]
    fn cleanup_side_frees_fully_closed_level() {
        let mut orders = OrderRegistry::new();
        let a = push_order(&mut orders, Side::Sell, 10, 100);
        orders.get_mut(a).unwrap().open = false;

        let mut book = OrderBook::new();
        book.insert_resting(Side::Sell, 100, a);
        book.cleanup_side(Side::Sell, |id| orders.get(id).unwrap().open);

        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn fok_can_buy_true_when_liquidity_suffices() {
        let mut orders = OrderRegistry::new();
        let a = push_order(&mut orders, Side::Sell, 50, 100);
        let b = push_order(&mut orders, Side::Sell, 50, 101);
        let mut book = OrderBook::new();
        book.insert_resting(Side::Sell, 100, a);
        book.insert_resting(Side::Sell, 101, b);

        assert!(fok_can_buy(&book, &orders, 80, 101));
        assert!(!fok_can_buy(&book, &orders, 150, 100));
    }

    #[test]
    fn fok_can_sell_respects_price_limit() {
        let mut orders = OrderRegistry::new();
        let a = push_order(&mut orders, Side::Buy, 50, 100);
        let mut book = OrderBook::new();
        book.insert_resting(Side::Buy, 100, a);

        assert!(!fok_can_sell(&book, &orders, 50, 101)); // no bid at/above 101
        assert!(fok_can_sell(&book, &orders, 50, 100));
    }
}
