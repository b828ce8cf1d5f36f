// src/protocol/dispatcher.rs
//
// The command loop: read one line, tokenize it, dispatch on the first
// token, write one response (usually JSON, always followed by an `END`
// trailer except for the binary orderbook dump), flush. Ticker messages go
// to a second writer so the primary stream stays parseable line-by-line.
//
// Kept generic over `Read`/`Write` rather than hardcoding `Stdin`/`Stdout` so
// the whole protocol surface is testable against in-memory buffers without a
// process boundary.

use std::io::{self, BufRead, Write};

use crate::engine::{CancelOutcome, Engine};
use crate::error::{LookupError, ValidationError};
use crate::protocol::binary::encode_orderbook;
use crate::protocol::json::{
    DebugMemoryJson, ErrorJson, OrderJson, OrderbookJson, QuoteJson, StatusAllJson, TimestampJson,
};
use crate::timestamp;

const MAX_TOKENS: usize = 64;
const MAX_TOKEN_BYTES: usize = 63;

/// Split a line on space/tab/CR/LF, capping at `MAX_TOKENS` tokens of at most
/// `MAX_TOKEN_BYTES` each — the same shape as the original's fixed
/// `tokens[MAXTOKENS][MAXTOKENSIZE]` scratch buffer, expressed without a
/// preallocated 2D array.
fn tokenize(line: &str) -> Vec<String> {
    line.split(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n')
        .filter(|tok| !tok.is_empty())
        .take(MAX_TOKENS)
        .map(|tok| {
            let mut end = MAX_TOKEN_BYTES.min(tok.len());
            while end > 0 && !tok.is_char_boundary(end) {
                end -= 1;
            }
            tok[..end].to_string()
        })
        .collect()
}

/// `atoi`-style integer parsing: leading whitespace and an optional sign,
/// then digits, stopping at the first non-digit; 0 if no digits are found.
/// Tokens are frontend-controlled but untrusted, so this never panics.
fn parse_int(token: &str) -> i64 {
    let mut chars = token.trim_start().chars().peekable();
    let mut sign: i64 = 1;
    if let Some(&c) = chars.peek() {
        if c == '-' {
            sign = -1;
            chars.next();
        } else if c == '+' {
            chars.next();
        }
    }
    let mut value: i64 = 0;
    let mut saw_digit = false;
    for c in chars {
        match c.to_digit(10) {
            Some(d) => {
                saw_digit = true;
                value = value.saturating_mul(10).saturating_add(d as i64);
            }
            None => break,
        }
    }
    if saw_digit {
        sign * value
    } else {
        0
    }
}

fn write_json<W: Write, T: serde::Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    let rendered = serde_json::to_string(value).expect("wire DTOs always serialize");
    out.write_all(rendered.as_bytes())
}

fn end_message<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(b"\nEND\n")?;
    out.flush()
}

/// Serve commands from `input` until EOF or an I/O error. Returns
/// `Err(UnexpectedEof)` on a clean EOF (after emitting the fatal error
/// record the protocol promises) so the caller can decide the process exit
/// code; any other error is a genuine I/O failure.
pub fn serve<R: BufRead, W: Write, T: Write>(
    engine: &mut Engine,
    mut input: R,
    mut out: W,
    mut ticker: T,
) -> io::Result<()> {
    loop {
        let mut line = String::new();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            write_json(&mut out, &ErrorJson::new("Unexpected EOF on stdin. Quitting."))?;
            end_message(&mut out)?;
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF on stdin"));
        }

        let tokens = tokenize(&line);
        dispatch_command(engine, &tokens, &mut out, &mut ticker)?;
    }
}

/// Handle exactly one already-tokenized command. Exposed separately from
/// `serve` so tests can drive the protocol without a `Read` at all.
pub fn dispatch_command<W: Write, T: Write>(
    engine: &mut Engine,
    tokens: &[String],
    out: &mut W,
    ticker: &mut T,
) -> io::Result<()> {
    let command = tokens.first().map(String::as_str).unwrap_or("");

    match command {
        "ORDER" => {
            let account_name = tokens.get(1).map(String::as_str).unwrap_or("");
            let account_id = parse_int(tokens.get(2).map(String::as_str).unwrap_or("0"));
            let qty = parse_int(tokens.get(3).map(String::as_str).unwrap_or("0"));
            let price = parse_int(tokens.get(4).map(String::as_str).unwrap_or("0"));
            let direction = parse_int(tokens.get(5).map(String::as_str).unwrap_or("0"));
            let kind = parse_int(tokens.get(6).map(String::as_str).unwrap_or("0"));

            let account_id = if account_id < 0 { u64::MAX } else { account_id as u64 };

            match engine.submit_order(account_name, account_id, qty, price, direction, kind) {
                Ok(id) => {
                    let order = engine.status(id).unwrap();
                    write_json(out, &OrderJson::new(engine, order))?;
                }
                Err(err) => {
                    tracing::debug!(account = account_name, code = validation_code(err), "order rejected");
                    write_json(out, &ErrorJson::backend_error(validation_code(err)))?;
                }
            }
            end_message(out)
        }

        "QUOTE" => {
            let ts = timestamp::now();
            let quote = engine.quote();
            write_json(out, &QuoteJson::new(engine, quote, ts))?;
            end_message(out)
        }

        "ORDERBOOK" => {
            let ts = timestamp::now();
            write_json(out, &OrderbookJson::new(engine, ts))?;
            end_message(out)
        }

        "ORDERBOOK_BINARY" => {
            out.write_all(&encode_orderbook(engine))?;
            out.flush()
        }

        "STATUS" => {
            let id = parse_int(tokens.get(1).map(String::as_str).unwrap_or("-1"));
            match lookup_order(engine, id) {
                Ok(order) => write_json(out, &OrderJson::new(engine, order))?,
                Err(err) => write_json(out, &ErrorJson::new(err.to_string()))?,
            }
            end_message(out)
        }

        "STATUSALL" => {
            let account_id = parse_int(tokens.get(1).map(String::as_str).unwrap_or("-1"));
            let orders = if account_id < 0 {
                Err(LookupError::UnknownAccount)
            } else {
                engine.status_all(account_id as u64).ok_or(LookupError::UnknownAccount)
            };
            match orders {
                Ok(orders) => {
                    let json = StatusAllJson {
                        ok: true,
                        venue: engine.venue.clone(),
                        orders: orders.into_iter().map(|o| OrderJson::new(engine, o)).collect(),
                    };
                    write_json(out, &json)?;
                }
                Err(err) => write_json(out, &ErrorJson::new(err.to_string()))?,
            }
            end_message(out)
        }

        "CANCEL" => {
            let id = parse_int(tokens.get(1).map(String::as_str).unwrap_or("-1"));
            let id = match lookup_order(engine, id) {
                Ok(order) => order.id,
                Err(err) => {
                    write_json(out, &ErrorJson::new(err.to_string()))?;
                    return end_message(out);
                }
            };
            if engine.cancel(id) == CancelOutcome::Cancelled {
                let order = engine.status(id).unwrap();
                writeln!(ticker, "CANCELLED {} {} {}", engine.symbol, order.direction, order.price)?;
                ticker.flush()?;
            }
            let order = engine.status(id).unwrap();
            write_json(out, &OrderJson::new(engine, order))?;
            end_message(out)
        }

        "__ACC_FROM_ID__" => {
            let id = parse_int(tokens.get(1).map(String::as_str).unwrap_or("-1"));
            match lookup_order(engine, id) {
                Ok(order) => {
                    let name = engine.accounts.get(order.account_id).map(|a| a.name.as_str()).unwrap_or("");
                    write!(out, "OK {name}")?;
                }
                // Same `LookupError::NoSuchId` case STATUS/CANCEL report, but
                // this command's wire contract is the plain-text `ERROR None`
                // rather than `LookupError`'s JSON-facing `Display` string.
                Err(LookupError::NoSuchId) => write!(out, "ERROR None")?,
                Err(err) => write_json(out, &ErrorJson::new(err.to_string()))?,
            }
            end_message(out)
        }

        "__SCORES__" => {
            out.write_all(engine.scoreboard_html().as_bytes())?;
            end_message(out)
        }

        "__DEBUG_MEMORY__" => {
            let json: DebugMemoryJson = engine.debug_memory().into();
            write_json(out, &json)?;
            end_message(out)
        }

        "__TIMESTAMP__" => {
            write_json(out, &TimestampJson { ok: true, ts: timestamp::now() })?;
            end_message(out)
        }

        _ => {
            write_json(out, &ErrorJson::new("Did not comprehend"))?;
            end_message(out)
        }
    }
}

fn lookup_order(engine: &Engine, id: i64) -> Result<&crate::order::Order, LookupError> {
    if id < 0 {
        return Err(LookupError::NoSuchId);
    }
    engine.status(id as u64).ok_or(LookupError::NoSuchId)
}

fn validation_code(err: ValidationError) -> u8 {
    err.code()
}
