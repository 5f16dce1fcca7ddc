//! Signaling client against a live server.
//!
//! Demonstrates:
//! - Creating a Connection with custom options
//! - Queuing a message before the handshake completes
//! - Reacting to wait/open/message/close events
//! - Closing on Ctrl+C
//!
//! Usage:
//!   cargo run --example signaling_client
//!   cargo run --example signaling_client -- ws://127.0.0.1:9000/signaling
//!   cargo run --example signaling_client -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use resilient_signaling::{Connection, ConnectionEvent, ConnectionOptions};

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9000/signaling";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    url: String,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            url: args
                .iter()
                .find(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "resilient_signaling=debug"
    } else {
        "resilient_signaling=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Signaling Client ===\n");
    println!("[1] Connecting to {}", args.url);

    let options = ConnectionOptions::new()
        .with_requested_heartbeat_timeout(Duration::from_secs(5))
        .with_welcome_timeout(Duration::from_secs(3))
        .with_hello_body(json!({ "client": "signaling_client" }));

    let (connection, mut events) =
        Connection::new(&args.url, options).context("failed to create connection")?;
    println!("    Connection id: {}\n", connection.id());

    // Sent as soon as the handshake completes
    connection.send_message(json!({ "type": "join", "room": "demo" }));

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ConnectionEvent::StateChanged(state) => println!("[state] {state}"),
                    ConnectionEvent::Wait { keep_alive, retry_after } => {
                        println!("[wait] retrying in {retry_after:?} (keep alive: {keep_alive})");
                    }
                    ConnectionEvent::Open => println!("[open] handshake complete"),
                    ConnectionEvent::Message(body) => println!("[message] {body}"),
                    ConnectionEvent::Error(e) => println!("[error] {e}"),
                    ConnectionEvent::Close(None) => {
                        println!("[close] normal");
                        break;
                    }
                    ConnectionEvent::Close(Some(e)) => {
                        println!("[close] {e} ({})", e.close_reason());
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n[2] Ctrl+C received, closing...");
                connection.close();
            }
        }
    }

    println!("\n=== Done ===");
    Ok(())
}
