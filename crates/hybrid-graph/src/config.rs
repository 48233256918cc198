//! Driver tunables and their environment loader.
use std::env;
use std::time::Duration;

/// Shortest wall time a repeating node may spend on one pass before it is
/// allowed to run again.
pub const DEFAULT_MIN_LOOP_TIME: Duration = Duration::from_millis(100);

/// Capacity of the mailbox behaviour trees post triggers into.
pub const DEFAULT_TRIGGER_BUFFER: usize = 16;

#[derive(Clone, Debug)]
pub struct GraphConfig {
    pub min_loop_time: Duration,
    pub trigger_buffer: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_loop_time: DEFAULT_MIN_LOOP_TIME,
            trigger_buffer: DEFAULT_TRIGGER_BUFFER,
        }
    }
}

impl GraphConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `HYBRID_GRAPH_MIN_LOOP_MS` - Loop throttle in milliseconds (default: 100)
    /// - `HYBRID_GRAPH_TRIGGER_BUFFER` - Trigger mailbox capacity (default: 16)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(millis) = read_env::<u64>("HYBRID_GRAPH_MIN_LOOP_MS") {
            config.min_loop_time = Duration::from_millis(millis);
        }

        if let Some(capacity) = read_env::<usize>("HYBRID_GRAPH_TRIGGER_BUFFER") {
            config.trigger_buffer = capacity.max(1);
        }

        config
    }

    pub fn with_min_loop_time(mut self, min_loop_time: Duration) -> Self {
        self.min_loop_time = min_loop_time;
        self
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
