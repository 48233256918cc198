//! Demo configuration read from the environment.
use std::env;
use std::time::Duration;

use hybrid_graph::GraphConfig;

/// Settings for one demo run.
#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub graph: GraphConfig,
    /// Interval between driver updates.
    pub tick: Duration,
    /// Number of updates before the demo stops.
    pub ticks: u32,
    pub price: u32,
    pub stock: u32,
    /// Coins inserted, one per update, in order.
    pub coins: Vec<u32>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            graph: GraphConfig::default(),
            tick: Duration::from_millis(50),
            ticks: 60,
            price: 3,
            stock: 2,
            coins: vec![1, 1, 1, 2, 1, 1, 1, 1],
        }
    }
}

impl DemoConfig {
    /// Environment variables:
    /// - `DEMO_TICK_MS` - update interval in milliseconds (default: 50)
    /// - `DEMO_TICKS` - number of updates (default: 60)
    /// - `DEMO_PRICE` - price of one item (default: 3)
    /// - `DEMO_STOCK` - items in stock (default: 2)
    /// - `DEMO_COINS` - comma-separated coin values (default: 1,1,1,2,1,1,1,1)
    ///
    /// Graph settings come from [`GraphConfig::from_env`].
    pub fn from_env() -> Self {
        let mut config = Self {
            graph: GraphConfig::from_env(),
            ..Self::default()
        };

        if let Some(ms) = read_env::<u64>("DEMO_TICK_MS") {
            config.tick = Duration::from_millis(ms.max(1));
        }
        if let Some(ticks) = read_env("DEMO_TICKS") {
            config.ticks = ticks;
        }
        if let Some(price) = read_env::<u32>("DEMO_PRICE") {
            config.price = price.max(1);
        }
        if let Some(stock) = read_env("DEMO_STOCK") {
            config.stock = stock;
        }
        if let Ok(coins) = env::var("DEMO_COINS") {
            config.coins = coins
                .split(',')
                .filter_map(|coin| coin.trim().parse().ok())
                .collect();
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
