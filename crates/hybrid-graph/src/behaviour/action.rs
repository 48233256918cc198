//! Action nodes: the leaves of a behaviour tree that do the actual work.
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::node::Env;
use super::status::NodeResult;
use super::tree::TreeInstance;
use crate::blackboard::Blackboard;
use crate::cancel::CancelScope;
use crate::graph::Graph;
use crate::state::arena::Blueprint;
use crate::trigger::{Trigger, TriggerSender};

/// The work of an action node.
///
/// The returned future is raced against the node's cancellation scope and
/// dropped when the scope is cancelled, unless the action says it observes
/// cancellation itself.
pub trait Action<B>: Send + Sync {
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult>;

    fn observes_cancellation(&self) -> bool {
        false
    }
}

/// What an action can reach while it runs.
pub struct ActionContext<B> {
    env: Env<B>,
    scope: CancelScope,
}

impl<B: Send + 'static> ActionContext<B> {
    pub(crate) fn new(env: Env<B>, scope: CancelScope) -> Self {
        Self { env, scope }
    }

    pub fn blackboard(&self) -> &Blackboard<B> {
        &self.env.blackboard
    }

    /// Scope cancelled when the node exits or is forced out.
    pub fn scope(&self) -> &CancelScope {
        &self.scope
    }

    pub fn post_trigger(&self, trigger: impl Into<Trigger>) -> bool {
        self.env.triggers.post(trigger)
    }

    pub fn trigger_sender(&self) -> TriggerSender {
        self.env.triggers.clone()
    }

    /// Waits for `ticks` driver updates. Returns `false` if the driver went
    /// away first.
    pub async fn wait_ticks(&self, ticks: u64) -> bool {
        let mut rx = self.env.ticks.clone();
        let target = *rx.borrow_and_update() + ticks;
        loop {
            if *rx.borrow_and_update() >= target {
                return true;
            }
            if rx.changed().await.is_err() {
                return false;
            }
        }
    }
}

/// Synchronous action; `true` means succeeded.
pub struct SyncAction<F> {
    action: F,
}

impl<F> SyncAction<F> {
    pub fn new(action: F) -> Self {
        Self { action }
    }
}

impl<B, F> Action<B> for SyncAction<F>
where
    B: Send + 'static,
    F: Fn(&mut B) -> bool + Send + Sync,
{
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        Box::pin(async move { ctx.env.blackboard.with(|bb| (self.action)(bb)).into() })
    }
}

/// Asynchronous action; the future resolves to `true` on success.
pub struct AsyncAction<F, Fut> {
    action: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncAction<F, Fut> {
    pub fn new(action: F) -> Self {
        Self {
            action,
            _future: PhantomData,
        }
    }
}

impl<B, F, Fut> Action<B> for AsyncAction<F, Fut>
where
    B: Send + 'static,
    F: Fn(ActionContext<B>) -> Fut + Send + Sync,
    Fut: Future<Output = bool> + Send + 'static,
{
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        Box::pin(async move { (self.action)(ctx).await.into() })
    }
}

/// Succeeds after a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct Wait(pub Duration);

impl<B: Send + 'static> Action<B> for Wait {
    fn execute(&self, _ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        let delay = self.0;
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            NodeResult::Succeeded
        })
    }
}

/// Succeeds after a number of driver updates.
#[derive(Debug, Clone, Copy)]
pub struct WaitTicks(pub u64);

impl<B: Send + 'static> Action<B> for WaitTicks {
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        let ticks = self.0;
        Box::pin(async move {
            if ctx.wait_ticks(ticks).await {
                NodeResult::Succeeded
            } else {
                NodeResult::Cancelled
            }
        })
    }
}

/// Another behaviour tree run as an action.
pub(crate) struct SubTree<B> {
    tree: Arc<TreeInstance<B>>,
}

impl<B> SubTree<B> {
    pub fn new(tree: TreeInstance<B>) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }
}

impl<B: Send + 'static> Action<B> for SubTree<B> {
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        Box::pin(async move { self.tree.run_embedded(&ctx.env, &ctx.scope).await })
    }

    fn observes_cancellation(&self) -> bool {
        true
    }
}

/// A state machine run as an action.
///
/// Each execution starts a fresh driver over the prebuilt machine, forwards
/// the host's ticks to it and ends when a state calls
/// [`StateContext::complete`](crate::StateContext::complete).
pub(crate) struct SubMachine<B> {
    blueprint: Blueprint<B>,
}

impl<B> SubMachine<B> {
    pub fn new(blueprint: Blueprint<B>) -> Self {
        Self { blueprint }
    }
}

impl<B: Send + 'static> Action<B> for SubMachine<B> {
    fn execute(&self, ctx: ActionContext<B>) -> BoxFuture<'_, NodeResult> {
        Box::pin(async move {
            let env = &ctx.env;
            let mut graph = match Graph::start(
                self.blueprint.clone(),
                env.blackboard.clone(),
                env.config.clone(),
                Some(env.runtime.clone()),
            ) {
                Ok(graph) => graph,
                Err(err) => {
                    warn!("nested state machine failed to start: {err}");
                    return NodeResult::Failed;
                }
            };

            let mut ticks = env.ticks.clone();
            let mut seen = *ticks.borrow_and_update();
            let result = loop {
                if let Some(result) = graph.completion() {
                    break result;
                }
                tokio::select! {
                    biased;
                    _ = ctx.scope.cancelled() => break NodeResult::Cancelled,
                    changed = ticks.changed() => {
                        if changed.is_err() {
                            break NodeResult::Cancelled;
                        }
                        let now = *ticks.borrow_and_update();
                        let mut failed = false;
                        for _ in seen..now {
                            if let Err(err) = graph.update() {
                                warn!("nested state machine update failed: {err}");
                                failed = true;
                                break;
                            }
                            if graph.completion().is_some() {
                                break;
                            }
                        }
                        seen = now;
                        if failed {
                            break NodeResult::Failed;
                        }
                    }
                }
            };

            debug!(
                state = graph.current_state_name(),
                ?result,
                "nested state machine finished"
            );
            graph.shutdown();
            result
        })
    }

    fn observes_cancellation(&self) -> bool {
        true
    }
}
