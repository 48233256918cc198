//! Executable nodes: the unit of work in a behaviour tree.
//!
//! One execution of a node goes through these steps:
//!
//! 1. every decorator's `on_enter` fires once
//! 2. `on_pre_execute` fires, then the node's work runs under a scope that
//!    is a child of the caller's scope
//! 3. if every decorator allows exit, the pass result is returned; otherwise
//!    the work repeats, waiting out the rest of the minimum loop time first
//! 4. every decorator's `on_exit` fires and the node scope is cancelled
//!
//! Entry gating (`can_enter`) is not part of `execute`: the caller (a parent
//! composite, or a tree root) asks [`ExecutableNode::check_entry`] first.
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::action::{Action, ActionContext};
use super::composite::{ChildSelector, Composite};
use super::decorator::Decorator;
use super::status::{AbortResult, NodeResult};
use crate::blackboard::Blackboard;
use crate::cancel::CancelScope;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::trigger::TriggerSender;

/// Everything a running activity needs from the driver that started it.
pub(crate) struct Env<B> {
    pub blackboard: Blackboard<B>,
    pub config: GraphConfig,
    pub ticks: watch::Receiver<u64>,
    pub triggers: TriggerSender,
    pub runtime: Handle,
}

impl<B> Clone for Env<B> {
    fn clone(&self) -> Self {
        Self {
            blackboard: self.blackboard.clone(),
            config: self.config.clone(),
            ticks: self.ticks.clone(),
            triggers: self.triggers.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

/// Handle to one running execution of a node, given to decorators.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    scope: CancelScope,
    forced: Arc<Mutex<Option<AbortResult>>>,
    runtime: Handle,
}

impl NodeHandle {
    fn new(scope: CancelScope, runtime: Handle) -> Self {
        Self {
            scope,
            forced: Arc::new(Mutex::new(None)),
            runtime,
        }
    }

    /// Ends the execution early with `result`.
    ///
    /// In-flight work is cancelled and the node reports `result` instead of
    /// whatever the work would have produced. The first request wins.
    pub fn request_force_exit(&self, result: AbortResult) {
        {
            let mut forced = self.forced.lock();
            if forced.is_some() || self.scope.is_cancelled() {
                return;
            }
            *forced = Some(result);
        }
        debug!(?result, "node force exit requested");
        self.scope.cancel();
    }

    pub fn is_exiting(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Runs `task` in the background until it finishes or the node exits.
    pub fn spawn_scoped<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let scope = self.scope.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = scope.cancelled() => {}
                _ = task => {}
            }
        });
    }

    /// Result to report once the node scope has been cancelled.
    fn cancelled_result(&self, outer: &CancelScope) -> NodeResult {
        match *self.forced.lock() {
            Some(forced) if !outer.is_cancelled() => forced.into(),
            _ => NodeResult::Cancelled,
        }
    }
}

pub(crate) enum NodeKind<B> {
    Action(Box<dyn Action<B>>),
    Composite(Composite<B>),
}

/// A behaviour-tree node with its decorators.
pub struct ExecutableNode<B> {
    name: Cow<'static, str>,
    decorators: Vec<Box<dyn Decorator<B>>>,
    kind: NodeKind<B>,
}

impl<B: Send + 'static> ExecutableNode<B> {
    pub fn action(name: impl Into<Cow<'static, str>>, action: impl Action<B> + 'static) -> Self {
        Self {
            name: name.into(),
            decorators: Vec::new(),
            kind: NodeKind::Action(Box::new(action)),
        }
    }

    pub fn composite(
        name: impl Into<Cow<'static, str>>,
        selector: impl ChildSelector + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            decorators: Vec::new(),
            kind: NodeKind::Composite(Composite::new(selector)),
        }
    }

    pub(crate) fn composite_with(
        name: &'static str,
        selector: impl ChildSelector + 'static,
        children: Vec<ExecutableNode<B>>,
    ) -> Self {
        let mut composite = Composite::new(selector);
        for child in children {
            composite.push(child);
        }
        Self {
            name: name.into(),
            decorators: Vec::new(),
            kind: NodeKind::Composite(composite),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, NodeKind::Composite(_))
    }

    pub fn add_decorator(&mut self, decorator: impl Decorator<B> + 'static) {
        self.decorators.push(Box::new(decorator));
    }

    /// Chaining form of [`add_decorator`](Self::add_decorator).
    pub fn with(mut self, decorator: impl Decorator<B> + 'static) -> Self {
        self.add_decorator(decorator);
        self
    }

    /// Appends a child to a composite node.
    ///
    /// # Errors
    ///
    /// [`NotComposite`](GraphError::NotComposite) for action nodes.
    pub fn add_child(&mut self, child: ExecutableNode<B>) -> Result<()> {
        match &mut self.kind {
            NodeKind::Composite(composite) => {
                composite.push(child);
                Ok(())
            }
            NodeKind::Action(_) => Err(GraphError::NotComposite {
                node: self.name.to_string(),
            }),
        }
    }

    /// Evaluates the entry gate.
    ///
    /// Returns `None` when every decorator admits the node, otherwise the
    /// abort result of the first decorator that rejects it.
    pub(crate) fn check_entry(&self, blackboard: &B) -> Option<NodeResult> {
        let rejected = self
            .decorators
            .iter()
            .find(|decorator| !decorator.can_enter(blackboard))?;
        trace!(node = %self.name, "entry rejected by decorator");
        Some(rejected.abort_result().into())
    }

    /// Runs the node until its decorators let it exit, it is forced out, or
    /// `outer` is cancelled.
    pub(crate) fn execute<'a>(
        &'a self,
        env: &'a Env<B>,
        outer: &'a CancelScope,
    ) -> BoxFuture<'a, NodeResult> {
        Box::pin(async move {
            let scope = outer.child();
            let handle = NodeHandle::new(scope.clone(), env.runtime.clone());

            env.blackboard.with(|bb| {
                for decorator in &self.decorators {
                    decorator.on_enter(bb, &handle);
                }
            });
            trace!(node = %self.name, "node entered");

            let result = loop {
                let started = Instant::now();
                env.blackboard.with(|bb| {
                    for decorator in &self.decorators {
                        decorator.on_pre_execute(bb);
                    }
                });

                let result = self.work(env, &scope).await;
                if scope.is_cancelled() {
                    break handle.cancelled_result(outer);
                }

                let can_exit = env
                    .blackboard
                    .read(|bb| self.decorators.iter().all(|d| d.can_exit(bb)));
                if can_exit {
                    break result;
                }

                // Every repeat suspends at least once, even when the pass
                // already used up the minimum loop time.
                let remaining = env.config.min_loop_time.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    trace!(node = %self.name, ?remaining, "throttling repeat");
                    tokio::select! {
                        biased;
                        _ = scope.cancelled() => {}
                        _ = tokio::time::sleep(remaining) => {}
                    }
                }
                if scope.is_cancelled() {
                    break handle.cancelled_result(outer);
                }
            };

            env.blackboard.with(|bb| {
                for decorator in &self.decorators {
                    decorator.on_exit(bb);
                }
            });
            scope.cancel();
            trace!(node = %self.name, ?result, "node exited");
            result
        })
    }

    async fn work(&self, env: &Env<B>, scope: &CancelScope) -> NodeResult {
        match &self.kind {
            NodeKind::Action(action) => {
                let ctx = ActionContext::new(env.clone(), scope.clone());
                if action.observes_cancellation() {
                    return action.execute(ctx).await;
                }
                tokio::select! {
                    biased;
                    _ = scope.cancelled() => NodeResult::Cancelled,
                    result = action.execute(ctx) => result,
                }
            }
            NodeKind::Composite(composite) => composite.run(env, scope).await,
        }
    }
}
