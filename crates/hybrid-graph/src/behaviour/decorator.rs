//! Decorators: gates and observers attached to one executable node.
//!
//! Gating (`can_enter`, `can_exit`) is synchronous and never suspends.
//! Decorator state such as a loop counter or a random generator survives
//! across executions of the same node.
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;

use super::node::NodeHandle;
use super::status::AbortResult;
use crate::error::{GraphError, Result};

pub trait Decorator<B>: Send + Sync {
    /// Entry gate, evaluated once before the node starts.
    fn can_enter(&self, _blackboard: &B) -> bool {
        true
    }

    /// Exit gate, evaluated after every pass. Returning `false` runs the
    /// node's work again.
    fn can_exit(&self, _blackboard: &B) -> bool {
        true
    }

    fn on_enter(&self, _blackboard: &mut B, _node: &NodeHandle) {}

    fn on_pre_execute(&self, _blackboard: &mut B) {}

    fn on_exit(&self, _blackboard: &mut B) {}

    /// Result reported when `can_enter` rejects the node.
    fn abort_result(&self) -> AbortResult {
        AbortResult::Failed
    }
}

/// Admits the node only while `condition` holds.
pub struct If<F> {
    condition: F,
    abort: AbortResult,
}

/// Alias kept for trees that read better as "condition" than "if".
pub type Condition<F> = If<F>;

impl<F> If<F> {
    pub fn new(condition: F) -> Self {
        Self {
            condition,
            abort: AbortResult::Failed,
        }
    }

    /// Result reported when the condition rejects the node.
    pub fn abort_with(mut self, abort: AbortResult) -> Self {
        self.abort = abort;
        self
    }
}

impl<B, F> Decorator<B> for If<F>
where
    F: Fn(&B) -> bool + Send + Sync,
{
    fn can_enter(&self, blackboard: &B) -> bool {
        (self.condition)(blackboard)
    }

    fn abort_result(&self) -> AbortResult {
        self.abort
    }
}

/// Enters while `condition` holds and keeps repeating until it stops holding.
pub struct While<F> {
    condition: F,
    abort: AbortResult,
}

impl<F> While<F> {
    pub fn new(condition: F) -> Self {
        Self {
            condition,
            abort: AbortResult::Failed,
        }
    }

    pub fn abort_with(mut self, abort: AbortResult) -> Self {
        self.abort = abort;
        self
    }
}

impl<B, F> Decorator<B> for While<F>
where
    F: Fn(&B) -> bool + Send + Sync,
{
    fn can_enter(&self, blackboard: &B) -> bool {
        (self.condition)(blackboard)
    }

    fn can_exit(&self, blackboard: &B) -> bool {
        !(self.condition)(blackboard)
    }

    fn abort_result(&self) -> AbortResult {
        self.abort
    }
}

/// Runs the node `count` times per entry, or forever when `count` is -1.
#[derive(Debug)]
pub struct Loop {
    count: i32,
    remaining: AtomicI32,
}

impl Loop {
    pub const INFINITE: i32 = -1;

    /// # Errors
    ///
    /// [`InvalidLoopCount`](GraphError::InvalidLoopCount) unless `count` is
    /// -1 or at least 1.
    pub fn new(count: i32) -> Result<Self> {
        if count != Self::INFINITE && count < 1 {
            return Err(GraphError::InvalidLoopCount(count));
        }
        Ok(Self {
            count,
            remaining: AtomicI32::new(count),
        })
    }

    pub fn infinite() -> Self {
        Self {
            count: Self::INFINITE,
            remaining: AtomicI32::new(Self::INFINITE),
        }
    }
}

impl<B> Decorator<B> for Loop {
    fn can_enter(&self, _blackboard: &B) -> bool {
        let remaining = self.remaining.load(Ordering::SeqCst);
        remaining == Self::INFINITE || remaining > 0
    }

    fn can_exit(&self, _blackboard: &B) -> bool {
        self.remaining.load(Ordering::SeqCst) == 0
    }

    fn on_pre_execute(&self, _blackboard: &mut B) {
        let _ = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n > 0).then_some(n - 1)
            });
    }

    fn on_exit(&self, _blackboard: &mut B) {
        self.remaining.store(self.count, Ordering::SeqCst);
    }
}

/// Calls `hook` each time the node is entered.
pub struct OnEnter<F>(pub F);

impl<B, F> Decorator<B> for OnEnter<F>
where
    F: Fn(&mut B) + Send + Sync,
{
    fn on_enter(&self, blackboard: &mut B, _node: &NodeHandle) {
        (self.0)(blackboard)
    }
}

/// Calls `hook` each time the node exits, whatever its result.
pub struct OnExit<F>(pub F);

impl<B, F> Decorator<B> for OnExit<F>
where
    F: Fn(&mut B) + Send + Sync,
{
    fn on_exit(&self, blackboard: &mut B) {
        (self.0)(blackboard)
    }
}

/// Forces the node out with `result` once `limit` has elapsed since entry.
#[derive(Debug, Clone, Copy)]
pub struct TimeLimit {
    limit: Duration,
    result: AbortResult,
}

impl TimeLimit {
    pub fn new(limit: Duration, result: AbortResult) -> Self {
        Self { limit, result }
    }
}

impl<B> Decorator<B> for TimeLimit {
    fn on_enter(&self, _blackboard: &mut B, node: &NodeHandle) {
        let limit = self.limit;
        let result = self.result;
        let target = node.clone();
        node.spawn_scoped(async move {
            tokio::time::sleep(limit).await;
            target.request_force_exit(result);
        });
    }
}

/// Admits the node with the given probability.
#[derive(Debug)]
pub struct Random {
    probability: f64,
    rng: Mutex<StdRng>,
    abort: AbortResult,
}

impl Random {
    pub const DEFAULT_SEED: u64 = 0;

    /// # Errors
    ///
    /// [`InvalidProbability`](GraphError::InvalidProbability) outside `[0, 1]`.
    pub fn new(probability: f64, seed: u64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(GraphError::InvalidProbability(probability));
        }
        Ok(Self {
            probability,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            abort: AbortResult::Failed,
        })
    }

    pub fn abort_with(mut self, abort: AbortResult) -> Self {
        self.abort = abort;
        self
    }
}

impl<B> Decorator<B> for Random {
    fn can_enter(&self, _blackboard: &B) -> bool {
        self.rng.lock().gen_bool(self.probability)
    }

    fn abort_result(&self) -> AbortResult {
        self.abort
    }
}

/// Rejects the node until `period` has passed since it last exited.
#[derive(Debug)]
pub struct Cooldown {
    period: Duration,
    last_exit: Mutex<Option<Instant>>,
    abort: AbortResult,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_exit: Mutex::new(None),
            abort: AbortResult::Failed,
        }
    }

    pub fn abort_with(mut self, abort: AbortResult) -> Self {
        self.abort = abort;
        self
    }
}

impl<B> Decorator<B> for Cooldown {
    fn can_enter(&self, _blackboard: &B) -> bool {
        self.last_exit
            .lock()
            .is_none_or(|exited| exited.elapsed() >= self.period)
    }

    fn on_exit(&self, _blackboard: &mut B) {
        *self.last_exit.lock() = Some(Instant::now());
    }

    fn abort_result(&self) -> AbortResult {
        self.abort
    }
}
