// src/protocol/binary.rs
//
// `ORDERBOOK_BINARY` — a big-endian dump of the resting book for frontends
// that want it without JSON parsing overhead. Hand-written with
// `to_be_bytes` rather than a zero-copy `#[repr(C)]` cast: unlike the
// teacher's SBE messages this layout has no fixed-size header and a
// variable number of records, so there's nothing to cast a byte slice onto.

use crate::engine::Engine;

/// Encode the book as: bids (price/time order) as 4-byte qty + 4-byte price
/// pairs, terminated by an 8-zero-byte sentinel; then asks, same format,
/// same sentinel. Quantity is never 0 for a resting order, so the sentinel
/// can't be confused with a real record.
pub fn encode_orderbook(engine: &Engine) -> Vec<u8> {
    let mut out = Vec::new();

    for (price, queue) in engine.book.bid_levels_desc() {
        for &id in queue.iter() {
            let qty = engine.orders.get(id).expect("book references a live order").remaining_qty;
            out.extend_from_slice(&(qty as i32).to_be_bytes());
            out.extend_from_slice(&(price as i32).to_be_bytes());
        }
    }
    out.extend_from_slice(&[0u8; 8]);

    for (price, queue) in engine.book.ask_levels_asc() {
        for &id in queue.iter() {
            let qty = engine.orders.get(id).expect("book references a live order").remaining_qty;
            out.extend_from_slice(&(qty as i32).to_be_bytes());
            out.extend_from_slice(&(price as i32).to_be_bytes());
        }
    }
    out.extend_from_slice(&[0u8; 8]);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_book_is_just_the_two_sentinels() {
        let engine = Engine::new("V", "S");
        let bytes = encode_orderbook(&engine);
        assert_eq!(bytes, vec![0u8; 16]);
    }

    #[test]
    fn one_bid_then_sentinel_then_one_ask_then_sentinel() {
        let mut engine = Engine::new("V", "S");
        engine.submit_order("A", 0, 10, 100, 1, 1).unwrap();
        engine.submit_order("B", 1, 5, 200, 2, 1).unwrap();

        let bytes = encode_orderbook(&engine);
        let mut expected = Vec::new();
        expected.extend_from_slice(&10i32.to_be_bytes());
        expected.extend_from_slice(&100i32.to_be_bytes());
        expected.extend_from_slice(&[0u8; 8]);
        expected.extend_from_slice(&5i32.to_be_bytes());
        expected.extend_from_slice(&200i32.to_be_bytes());
        expected.extend_from_slice(&[0u8; 8]);

        assert_eq!(bytes, expected);
    }
}
