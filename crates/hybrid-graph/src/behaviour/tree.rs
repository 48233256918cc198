//! Behaviour-tree roots.
//!
//! A [`BehaviourTree`] is usable two ways: as a leaf state of a state machine
//! (or as the root of a graph), and as an action node inside another tree.
//! The `*_as_leaf_state` hooks only fire in the first mode.
use std::any::TypeId;
use std::sync::Arc;

use tracing::debug;

use super::node::{Env, ExecutableNode};
use super::status::NodeResult;
use crate::cancel::CancelScope;
use crate::error::{GraphError, Result};
use crate::state::arena::BuildGuard;
use crate::trigger::{Trigger, TriggerSender};

pub trait BehaviourTree<B>: Send + Sync + 'static {
    /// Declares the single child of the root. Runs once, when the tree is
    /// first referenced.
    fn setup_behaviours(&self, root: &mut RootNode<B>) -> Result<()>;

    /// Fires every time the tree starts running.
    fn on_enter(&self, _blackboard: &mut B) {}

    /// Fires when the tree stops being the current state, or after each run
    /// when it is used as an action.
    fn on_exit(&self, _blackboard: &mut B) {}

    fn on_enter_as_leaf_state(&self, _blackboard: &mut B) {}

    fn on_exit_as_leaf_state(&self, _blackboard: &mut B) {}

    /// Fires once per run, when the root child returns or is cancelled.
    fn on_end_execute(&self, _blackboard: &mut B, _end: &TreeEnd<'_>) {}
}

/// Port through which a tree declares its root child.
pub struct RootNode<B> {
    tree: &'static str,
    child: Option<ExecutableNode<B>>,
}

impl<B: Send + 'static> RootNode<B> {
    fn new(tree: &'static str) -> Self {
        Self { tree, child: None }
    }

    /// # Errors
    ///
    /// [`RootAlreadyHasChild`](GraphError::RootAlreadyHasChild) on a second
    /// call.
    pub fn add(&mut self, child: ExecutableNode<B>) -> Result<()> {
        if self.child.is_some() {
            return Err(GraphError::RootAlreadyHasChild { tree: self.tree });
        }
        self.child = Some(child);
        Ok(())
    }
}

/// What `on_end_execute` learns about the finished run.
pub struct TreeEnd<'a> {
    result: NodeResult,
    triggers: &'a TriggerSender,
}

impl TreeEnd<'_> {
    pub fn result(&self) -> NodeResult {
        self.result
    }

    /// Posts a trigger to the driver running this tree. The driver applies it
    /// when it next settles transitions, if this activation is still current
    /// by then.
    pub fn post_trigger(&self, trigger: impl Into<Trigger>) -> bool {
        self.triggers.post(trigger)
    }
}

/// A tree with its root child built.
pub(crate) struct TreeInstance<B> {
    pub behaviour: Arc<dyn BehaviourTree<B>>,
    pub name: &'static str,
    root: ExecutableNode<B>,
}

impl<B: Send + 'static> TreeInstance<B> {
    pub fn build(
        behaviour: Arc<dyn BehaviourTree<B>>,
        type_id: TypeId,
        name: &'static str,
    ) -> Result<Self> {
        let _guard = BuildGuard::enter(type_id, name)?;
        let mut root = RootNode::new(name);
        behaviour.setup_behaviours(&mut root)?;
        let root = root.child.ok_or(GraphError::EmptyRoot { tree: name })?;

        Ok(Self {
            behaviour,
            name,
            root,
        })
    }

    /// One pass of the root child, gated by its decorators, followed by
    /// `on_end_execute`.
    pub async fn run_root(&self, env: &Env<B>, scope: &CancelScope) -> NodeResult {
        let gate = env.blackboard.read(|bb| self.root.check_entry(bb));
        let result = match gate {
            Some(abort) => abort,
            None => self.root.execute(env, scope).await,
        };

        debug!(tree = self.name, ?result, "behaviour tree finished");
        let end = TreeEnd {
            result,
            triggers: &env.triggers,
        };
        env.blackboard
            .with(|bb| self.behaviour.on_end_execute(bb, &end));
        result
    }

    /// Runs the tree as an action node of another tree.
    pub async fn run_embedded(&self, env: &Env<B>, scope: &CancelScope) -> NodeResult {
        env.blackboard.with(|bb| self.behaviour.on_enter(bb));
        let result = self.run_root(env, scope).await;
        env.blackboard.with(|bb| self.behaviour.on_exit(bb));
        result
    }
}
