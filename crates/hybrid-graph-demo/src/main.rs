//! Vending machine agent driven from a fixed-step tick loop.
//!
//! The agent waits for coins in a plain leaf state and hands over to a
//! behaviour tree to dispense. The tree reports back through a trigger, so
//! the state machine decides what happens after a sale or a fault.
//!
//! ```bash
//! RUST_LOG=hybrid_graph=debug DEMO_COINS=1,1,1,2,1 cargo run -p hybrid-graph-demo
//! ```
mod config;
mod vending;

use anyhow::Result;
use hybrid_graph::{Graph, Machine};
use tokio::time::{MissedTickBehavior, interval};

use config::DemoConfig;
use vending::{Vendor, VendingBoard};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = DemoConfig::from_env();
    tracing::info!(?config, "starting vending demo");

    let board = VendingBoard::new(config.price, config.stock, config.coins.clone());
    let mut graph = Graph::builder()
        .config(config.graph.clone())
        .run::<Machine<Vendor>, _>(board)?;

    let mut ticker = interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut state = graph.current_state_name();
    for _ in 0..config.ticks {
        ticker.tick().await;
        graph.update()?;

        let now = graph.current_state_name();
        if now != state {
            tracing::info!(tick = graph.tick(), from = state, to = now, "state changed");
            state = now;
        }
    }

    let summary = graph.blackboard().read(VendingBoard::summary);
    tracing::info!(%summary, "demo finished");
    graph.dispose()?;
    Ok(())
}
