//! The graph driver.
//!
//! A [`Graph`] owns the current leaf, at most one pending transition and the
//! set of items that are currently entered. Hosts call
//! [`update`](Graph::update) once per tick; transitions requested through
//! triggers are applied there, exit before enter, in a loop, so a state may
//! chain straight into another from its own `on_enter`.
//!
//! Behaviour trees that become current run as detached activities on the
//! Tokio runtime. Their first poll happens synchronously while they are
//! entered, so a tree made only of synchronous actions has already finished
//! when `run` or `update` returns.
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;
use std::task::{Context, Waker};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::behaviour::NodeResult;
use crate::behaviour::node::Env;
use crate::behaviour::tree::TreeInstance;
use crate::blackboard::Blackboard;
use crate::cancel::CancelScope;
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::state::arena::{Blueprint, Body, ItemId};
use crate::state::{GraphItem, StateContext};
use crate::trigger::{Mailbox, Trigger};

/// Builder for [`Graph`] with non-default configuration.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
    runtime: Option<Handle>,
}

impl GraphBuilder {
    pub fn config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    pub fn min_loop_time(mut self, min_loop_time: Duration) -> Self {
        self.config.min_loop_time = min_loop_time;
        self
    }

    /// Runtime behaviour trees are spawned on. Defaults to the runtime the
    /// graph is started from.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds `T` and enters it.
    pub fn run<T, B>(self, blackboard: impl Into<Blackboard<B>>) -> Result<Graph<B>>
    where
        B: Send + 'static,
        T: GraphItem<B>,
    {
        let blueprint = Blueprint::build::<T>()?;
        Graph::start(blueprint, blackboard.into(), self.config, self.runtime)
    }
}

/// Running tree activation owned by the driver.
struct Activity {
    id: u64,
    item: ItemId,
    scope: CancelScope,
}

pub struct Graph<B> {
    blueprint: Blueprint<B>,
    blackboard: Blackboard<B>,
    config: GraphConfig,
    runtime: Option<Handle>,
    current: ItemId,
    pending: Option<ItemId>,
    active: HashSet<ItemId>,
    activity: Option<Activity>,
    scope: CancelScope,
    mailbox: Mailbox,
    next_activation: u64,
    ticks: watch::Sender<u64>,
    completion: Option<NodeResult>,
    disposed: bool,
}

impl Graph<()> {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }
}

impl<B: Send + 'static> Graph<B> {
    /// Builds `T` with default configuration and enters it.
    ///
    /// Any transition requested while entering is applied before returning.
    ///
    /// # Errors
    ///
    /// Setup errors of `T` or anything below it, and
    /// [`RuntimeUnavailable`](GraphError::RuntimeUnavailable) when a behaviour
    /// tree has to start outside a Tokio runtime.
    pub fn run<T: GraphItem<B>>(blackboard: impl Into<Blackboard<B>>) -> Result<Self> {
        GraphBuilder::default().run::<T, B>(blackboard)
    }

    pub(crate) fn start(
        blueprint: Blueprint<B>,
        blackboard: Blackboard<B>,
        config: GraphConfig,
        runtime: Option<Handle>,
    ) -> Result<Self> {
        let runtime = runtime.or_else(|| Handle::try_current().ok());
        let entry = blueprint.arena.entry_node(blueprint.root)?;
        let (ticks, _) = watch::channel(0);
        let mailbox = Mailbox::new(config.trigger_buffer);

        let mut graph = Self {
            blueprint,
            blackboard,
            config,
            runtime,
            current: entry,
            pending: None,
            active: HashSet::new(),
            activity: None,
            scope: CancelScope::new(),
            mailbox,
            next_activation: 0,
            ticks,
            completion: None,
            disposed: false,
        };

        debug!(state = graph.current_state_name(), "graph started");
        graph.enter_internal(entry)?;
        graph.settle()?;
        Ok(graph)
    }

    /// Requests the transition connected to `trigger` from the current leaf.
    ///
    /// Nothing changes until the next [`update`](Self::update). Returns
    /// `false` when the current leaf has no such transition. A later trigger
    /// replaces an earlier pending one.
    pub fn send_trigger(&mut self, trigger: impl Into<Trigger>) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.route(trigger.into()))
    }

    /// Advances the graph by one tick.
    ///
    /// Applies triggers posted by behaviour trees, calls the current leaf's
    /// `on_update` if no transition is pending, then applies pending
    /// transitions until none is left.
    ///
    /// # Errors
    ///
    /// [`Disposed`](GraphError::Disposed) after disposal. If entering a state
    /// fails, the error is returned and the graph is disposed.
    pub fn update(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.ticks.send_modify(|tick| *tick += 1);
        self.drain_mailbox();

        if self.pending.is_none() {
            let arena = Arc::clone(&self.blueprint.arena);
            if let Body::Leaf(state) = &arena.slot(self.current).body {
                self.with_context(|ctx| state.on_update(ctx));
            }
        }

        self.settle()
    }

    /// Cancels every running activity and makes the graph unusable.
    ///
    /// Exit hooks are not called.
    pub fn dispose(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.disposed = true;
        self.activity = None;
        self.scope.cancel();
        debug!(state = self.current_state_name(), "graph disposed");
        Ok(())
    }

    /// Exits the whole active chain, then disposes.
    pub(crate) fn shutdown(&mut self) {
        if self.disposed {
            return;
        }
        let current = self.current;
        if self.active.contains(&current) {
            self.exit_internal(current, None);
        }
        self.disposed = true;
        self.activity = None;
        self.scope.cancel();
    }

    pub fn current_state_name(&self) -> &'static str {
        self.blueprint.arena.name(self.current)
    }

    /// True when the current leaf is of type `T`.
    pub fn is_current<T: 'static>(&self) -> bool {
        self.blueprint.arena.slot(self.current).type_id == TypeId::of::<T>()
    }

    /// True when an item of type `T` (leaf or container) is entered.
    pub fn is_active<T: 'static>(&self) -> bool {
        let arena = &self.blueprint.arena;
        self.active
            .iter()
            .any(|&id| arena.slot(id).type_id == TypeId::of::<T>())
    }

    /// Result passed to [`StateContext::complete`], if any state called it.
    pub fn completion(&self) -> Option<NodeResult> {
        self.completion
    }

    pub fn blackboard(&self) -> &Blackboard<B> {
        &self.blackboard
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Number of `update` calls so far.
    pub fn tick(&self) -> u64 {
        *self.ticks.borrow()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(GraphError::Disposed);
        }
        Ok(())
    }

    fn route(&mut self, trigger: Trigger) -> bool {
        let arena = &self.blueprint.arena;
        match arena.slot(self.current).transitions.get(&trigger) {
            Some(&next) => {
                trace!(%trigger, to = arena.name(next), "transition pending");
                self.pending = Some(next);
                true
            }
            None => false,
        }
    }

    fn drain_mailbox(&mut self) {
        for posted in self.mailbox.drain() {
            let live = self
                .activity
                .as_ref()
                .is_some_and(|activity| activity.id == posted.activation);
            if live {
                self.route(posted.trigger);
            } else {
                warn!(
                    trigger = %posted.trigger,
                    activation = posted.activation,
                    "dropping trigger posted by a finished activation"
                );
            }
        }
    }

    fn settle(&mut self) -> Result<()> {
        self.drain_mailbox();
        while let Some(next) = self.pending.take() {
            let prev = self.current;
            debug!(
                from = self.blueprint.arena.name(prev),
                to = self.blueprint.arena.name(next),
                "state transition"
            );
            self.exit_internal(prev, Some(next));
            self.current = next;
            if let Err(err) = self.enter_internal(next) {
                // The chain is half entered; no later update can repair it.
                warn!(
                    state = self.blueprint.arena.name(next),
                    %err,
                    "entry failed, disposing graph"
                );
                self.pending = None;
                self.disposed = true;
                self.activity = None;
                self.scope.cancel();
                return Err(err);
            }
            self.drain_mailbox();
        }
        Ok(())
    }

    fn with_context<R>(&mut self, f: impl FnOnce(&mut StateContext<'_, B>) -> R) -> R {
        let mut guard = self.blackboard.lock();
        let transitions = &self.blueprint.arena.slot(self.current).transitions;
        let mut ctx = StateContext::new(
            &mut *guard,
            transitions,
            &mut self.pending,
            &mut self.completion,
        );
        f(&mut ctx)
    }

    /// Enters `id`, entering its parent first unless it is already entered.
    fn enter_internal(&mut self, id: ItemId) -> Result<()> {
        let arena = Arc::clone(&self.blueprint.arena);
        let slot = arena.slot(id);

        if let Some(parent) = slot.parent
            && !self.active.contains(&parent)
        {
            self.enter_internal(parent)?;
        }

        self.active.insert(id);
        trace!(state = slot.name, "state entered");
        match &slot.body {
            Body::Leaf(state) => self.with_context(|ctx| state.on_enter(ctx)),
            Body::Machine { state, .. } => self.with_context(|ctx| state.on_enter(ctx)),
            Body::Tree(tree) => self.start_tree(id, tree)?,
        }
        Ok(())
    }

    /// Exits `id`, then its parent unless `next` stays inside the parent.
    fn exit_internal(&mut self, id: ItemId, next: Option<ItemId>) {
        let arena = Arc::clone(&self.blueprint.arena);
        let slot = arena.slot(id);

        match &slot.body {
            Body::Leaf(state) => self.blackboard.with(|bb| state.on_exit(bb)),
            Body::Machine { state, .. } => self.blackboard.with(|bb| state.on_exit(bb)),
            Body::Tree(tree) => self.stop_tree(id, tree),
        }
        self.active.remove(&id);
        trace!(state = slot.name, "state exited");

        if let Some(parent) = slot.parent
            && self.active.contains(&parent)
            && !next.is_some_and(|next| arena.is_descendant(parent, next))
        {
            self.exit_internal(parent, next);
        }
    }

    fn start_tree(&mut self, id: ItemId, tree: &Arc<TreeInstance<B>>) -> Result<()> {
        let Some(runtime) = self.runtime.clone() else {
            return Err(GraphError::RuntimeUnavailable { tree: tree.name });
        };

        self.blackboard.with(|bb| {
            tree.behaviour.on_enter(bb);
            tree.behaviour.on_enter_as_leaf_state(bb);
        });

        let activation = self.next_activation;
        self.next_activation += 1;
        let scope = self.scope.child();
        let env = Env {
            blackboard: self.blackboard.clone(),
            config: self.config.clone(),
            ticks: self.ticks.subscribe(),
            triggers: self.mailbox.sender(activation),
            runtime: runtime.clone(),
        };
        self.activity = Some(Activity {
            id: activation,
            item: id,
            scope: scope.clone(),
        });

        debug!(tree = tree.name, activation, "behaviour tree started");
        let tree = Arc::clone(tree);
        launch(
            &runtime,
            Box::pin(async move {
                tree.run_root(&env, &scope).await;
            }),
        );
        Ok(())
    }

    fn stop_tree(&mut self, id: ItemId, tree: &Arc<TreeInstance<B>>) {
        if let Some(activity) = self.activity.take_if(|activity| activity.item == id) {
            debug!(tree = tree.name, activation = activity.id, "behaviour tree cancelled");
            activity.scope.cancel();
        }
        self.blackboard.with(|bb| {
            tree.behaviour.on_exit_as_leaf_state(bb);
            tree.behaviour.on_exit(bb);
        });
    }
}

impl<B> Drop for Graph<B> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

/// Polls `activity` once in place and spawns it only if it suspends.
fn launch(runtime: &Handle, mut activity: BoxFuture<'static, ()>) {
    let _entered = runtime.enter();
    let mut cx = Context::from_waker(Waker::noop());
    if activity.as_mut().poll(&mut cx).is_pending() {
        runtime.spawn(activity);
    }
}
