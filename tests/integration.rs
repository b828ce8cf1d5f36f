// tests/integration.rs
//
// End-to-end scenarios driven straight through the dispatcher, the way a
// frontend would drive the real process over stdin/stdout — just without
// the process boundary, so assertions can poke at the engine directly too.

use venue_core::engine::Engine;
use venue_core::protocol::dispatcher::dispatch_command;

fn tokens(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

fn send(engine: &mut Engine, line: &str) -> String {
    let mut out = Vec::new();
    let mut ticker = Vec::new();
    dispatch_command(engine, &tokens(line), &mut out, &mut ticker).unwrap();
    String::from_utf8(out).unwrap()
}

fn send_with_ticker(engine: &mut Engine, line: &str) -> (String, String) {
    let mut out = Vec::new();
    let mut ticker = Vec::new();
    dispatch_command(engine, &tokens(line), &mut out, &mut ticker).unwrap();
    (String::from_utf8(out).unwrap(), String::from_utf8(ticker).unwrap())
}

#[test]
fn scenario_simple_cross() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 100 5000 1 1");
    send(&mut engine, "ORDER B 1 100 5000 2 1");

    assert_eq!(engine.status(0).unwrap().remaining_qty, 0);
    assert!(!engine.status(0).unwrap().open);
    assert_eq!(engine.status(1).unwrap().remaining_qty, 0);
    assert!(!engine.status(1).unwrap().open);

    assert_eq!(engine.book.best_bid(), None);
    assert_eq!(engine.book.best_ask(), None);

    let a = engine.accounts.get(0).unwrap();
    assert_eq!(a.shares, 100);
    assert_eq!(a.cents, -500_000);
    let b = engine.accounts.get(1).unwrap();
    assert_eq!(b.shares, -100);
    assert_eq!(b.cents, 500_000);

    assert_eq!(engine.market.last_price, 5000);
    assert_eq!(engine.market.last_size, 100);
}

#[test]
fn scenario_partial_fill_then_rest() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 100 5000 1 1");
    send(&mut engine, "ORDER B 1 40 5000 2 1");

    let order0 = engine.status(0).unwrap();
    assert_eq!(order0.remaining_qty, 60);
    assert!(order0.open);
    assert_eq!(engine.book.best_bid(), Some(5000));

    let order1 = engine.status(1).unwrap();
    assert_eq!(order1.total_filled, 40);
    assert!(!order1.open);
}

#[test]
fn scenario_price_time_priority() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 100 5000 1 1");
    send(&mut engine, "ORDER B 1 50 5000 1 1");
    send(&mut engine, "ORDER C 2 120 5000 2 1");

    assert!(!engine.status(0).unwrap().open);
    assert_eq!(engine.status(0).unwrap().total_filled, 100);
    let b = engine.status(1).unwrap();
    assert_eq!(b.total_filled, 20);
    assert_eq!(b.remaining_qty, 30);
    assert!(!engine.status(2).unwrap().open);
}

#[test]
fn scenario_market_sweep() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER S1 0 50 5000 2 1");
    send(&mut engine, "ORDER S2 1 50 5100 2 1");
    let out = send(&mut engine, "ORDER X 2 80 0 1 2");

    assert!(out.contains("\"open\":false"));
    assert!(out.contains("\"price\":0"));

    let x = engine.status(2).unwrap();
    assert_eq!(x.fills.len(), 2);
    assert_eq!((x.fills[0].price, x.fills[0].qty), (5000, 50));
    assert_eq!((x.fills[1].price, x.fills[1].qty), (5100, 30));

    assert_eq!(engine.book.best_ask(), Some(5100));
}

#[test]
fn scenario_fok_kill() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER ASK 0 50 5000 2 1");
    let out = send(&mut engine, "ORDER Y 1 100 5000 1 3");

    assert!(out.contains("\"open\":false"));
    assert!(out.contains("\"fills\":[]"));
    assert_eq!(engine.status(1).unwrap().remaining_qty, 0);
    assert_eq!(engine.book.best_ask(), Some(5000));
    assert_eq!(engine.market.last_price, -1);
}

#[test]
fn scenario_cancel_collapses_level() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 10 100 1 1");
    let (out, ticker) = send_with_ticker(&mut engine, "CANCEL 0");
    assert!(out.contains("\"open\":false"));
    assert!(ticker.contains("CANCELLED"));
    assert_eq!(engine.book.best_bid(), None);

    let quote = send(&mut engine, "QUOTE");
    assert!(!quote.contains("\"bid\""));
}

#[test]
fn invariant_quantity_conservation_across_partial_fills() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 100 5000 1 1");
    send(&mut engine, "ORDER B 1 30 5000 2 1");
    send(&mut engine, "ORDER C 2 40 5000 2 1");

    for id in 0..3u64 {
        let order = engine.status(id).unwrap();
        assert_eq!(order.remaining_qty + order.total_filled, order.original_qty);
    }
}

#[test]
fn invariant_account_conservation() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 100 5000 1 1");
    send(&mut engine, "ORDER B 1 60 5000 2 1");
    send(&mut engine, "ORDER C 2 40 5000 2 1");

    let total_shares: i64 = engine.accounts.iter().map(|(_, a)| a.shares).sum();
    assert_eq!(total_shares, 0);
    let total_cents: i64 = engine.accounts.iter().map(|(_, a)| a.cents).sum();
    assert_eq!(total_cents, 0);
}

#[test]
fn invariant_uncrossed_book_after_resting_orders() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 10 100 1 1");
    send(&mut engine, "ORDER B 1 10 200 2 1");
    let bid = engine.book.best_bid().unwrap();
    let ask = engine.book.best_ask().unwrap();
    assert!(bid < ask);
}

#[test]
fn invariant_fill_symmetry() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 50 5000 1 1");
    send(&mut engine, "ORDER B 1 50 5000 2 1");

    let a = engine.status(0).unwrap();
    let b = engine.status(1).unwrap();
    assert_eq!(a.fills.len(), 1);
    assert_eq!(b.fills.len(), 1);
    assert_eq!(a.fills[0].price, b.fills[0].price);
    assert_eq!(a.fills[0].qty, b.fills[0].qty);
    assert_eq!(a.direction, venue_core::Side::Buy);
    assert_eq!(b.direction, venue_core::Side::Sell);
}

#[test]
fn idempotence_cancel_on_non_limit_is_a_no_op() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER S 0 10 100 2 1");
    let market_out = send(&mut engine, "ORDER B 1 10 0 1 2");
    assert!(market_out.contains("\"open\":false"));

    let (out1, ticker1) = send_with_ticker(&mut engine, "CANCEL 1");
    let (out2, ticker2) = send_with_ticker(&mut engine, "CANCEL 1");
    assert_eq!(out1, out2);
    assert!(ticker1.is_empty());
    assert!(ticker2.is_empty());
}

#[test]
fn idempotence_status_does_not_mutate() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 10 100 1 1");
    let first = send(&mut engine, "STATUS 0");
    let second = send(&mut engine, "STATUS 0");
    assert_eq!(first, second);
}

#[test]
fn quote_is_pure_modulo_timestamp() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 10 100 1 1");
    send(&mut engine, "ORDER B 1 10 200 2 1");

    let first = send(&mut engine, "QUOTE");
    let second = send(&mut engine, "QUOTE");

    let strip_ts = |s: &str| -> String {
        let start = s.find("\"quoteTime\"").unwrap();
        s[..start].to_string()
    };
    assert_eq!(strip_ts(&first), strip_ts(&second));
}

#[test]
fn statusall_reports_every_order_for_an_account() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER A 0 10 100 1 1");
    send(&mut engine, "ORDER A 0 20 110 1 1");
    let out = send(&mut engine, "STATUSALL 0");
    assert!(out.contains("\"orders\":["));
    assert!(out.matches("\"id\":").count() == 2);
}

#[test]
fn statusall_unknown_account_errors() {
    let mut engine = Engine::new("TEST", "FOO");
    let out = send(&mut engine, "STATUSALL 42");
    assert!(out.contains("Account not known on this book"));
}

#[test]
fn unrecognized_command_is_reported() {
    let mut engine = Engine::new("TEST", "FOO");
    let out = send(&mut engine, "BOGUS");
    assert!(out.contains("Did not comprehend"));
}

#[test]
fn unrecognized_kind_token_is_admitted_not_rejected() {
    let mut engine = Engine::new("TEST", "FOO");
    send(&mut engine, "ORDER S 0 10 100 2 1");
    let out = send(&mut engine, "ORDER B 1 10 100 1 9");
    assert!(out.contains("\"orderType\":\"unknown\""));
    assert!(out.contains("\"open\":false"));
    assert!(!out.contains("Backend error"));
}

#[test]
fn too_many_orders_does_not_consume_an_id() {
    // Exercise the error path cheaply: drive the account cap instead of the
    // (astronomically large) order-count cap, since both short-circuit
    // before `OrderRegistry::register`.
    let mut engine = Engine::new("TEST", "FOO");
    let out = send(&mut engine, "ORDER A 5000 10 100 1 1");
    assert!(out.contains("Backend error 3"));
    assert_eq!(engine.orders.len(), 0);
}
