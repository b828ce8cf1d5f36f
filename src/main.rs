// src/main.rs
//
// Process entry point: parse the two mandatory positional arguments, wire up
// structured logging, build the engine, and serve commands over stdin/stdout
// until EOF. Ticker messages go to stderr — the protocol's two positional
// args leave no room for a third "ticker file" argument, and stderr is the
// standard secondary stream for a process whose stdout is otherwise a
// strict line (or, for `ORDERBOOK_BINARY`, binary) protocol.

use std::io::{self, BufReader};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use venue_core::engine::Engine;
use venue_core::protocol;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (venue, symbol) = match (args.get(1), args.get(2)) {
        (Some(venue), Some(symbol)) => (venue.as_str(), symbol.as_str()),
        _ => {
            eprintln!("usage: {} <venue> <symbol>", args.first().map(String::as_str).unwrap_or("venue_core"));
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(venue, symbol, "starting venue core");
    let mut engine = Engine::new(venue, symbol);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let stderr = io::stderr();

    match protocol::serve(&mut engine, BufReader::new(stdin.lock()), stdout.lock(), stderr.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "terminating on stdin EOF");
            ExitCode::FAILURE
        }
    }
}
