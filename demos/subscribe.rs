//! Subscribe to topics and print incoming values.
//!
//! Demonstrates:
//! - Building a client with initial subscriptions
//! - Lifecycle callbacks across reconnects
//! - Replacing the subscription set while running
//! - Publishing a message envelope
//!
//! Usage:
//!   cargo run --example subscribe -- ws://localhost:9873/ prices trades
//!   cargo run --example subscribe -- tcp://localhost:9872 prices --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use socket_reconnect::{Callbacks, SubscriptionClient};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_ADDRESS: &str = "ws://localhost:9873/";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    address: String,
    topics: Vec<String>,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let (flags, positional): (Vec<String>, Vec<String>) =
            std::env::args().skip(1).partition(|a| a.starts_with("--"));

        let mut positional = positional.into_iter();
        Self {
            address: positional
                .next()
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            topics: positional.collect(),
            debug: flags.iter().any(|a| a == "--debug"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "socket_reconnect=trace"
    } else {
        "socket_reconnect=info"
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
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    println!("=== Subscribe: {} ===\n", args.address);

    let client = SubscriptionClient::builder()
        .address(&args.address)
        .retry_interval(Duration::from_secs(2))
        .subscriptions(args.topics.iter().cloned())
        .build(
            Callbacks::new()
                .on_connected(|| println!("[Connected]"))
                .on_disconnected(|| println!("[Disconnected] retrying..."))
                .on_message(|value| println!("[Message] {value}")),
        )
        .context("failed to build client")?;

    client.connect();

    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut topics = client.subscriptions();
    topics.push("heartbeat".to_string());
    client.update_subscriptions(topics)?;

    if let Err(e) = client.send_messages([json!({"hello": "from subscribe demo"})]) {
        println!("[Publish skipped] {e}");
    }

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;

    client.close().await?;
    println!("\n=== Done ===");
    Ok(())
}
