//! Builder utilities for ergonomic behaviour tree construction.
//!
//! Instead of writing `ExecutableNode::composite("Sequence", Sequence)` and
//! pushing children one by one, you can write `sequence(vec![...])`.
use std::any::TypeId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::action::{ActionContext, AsyncAction, SubMachine, SubTree, SyncAction, Wait, WaitTicks};
use super::composite::{Selector, Sequence};
use super::node::ExecutableNode;
use super::tree::{BehaviourTree, TreeInstance};
use crate::error::Result;
use crate::state::arena::Blueprint;
use crate::state::{Machine, StateMachine, short_type_name};

/// Creates a sequence node with the given children.
pub fn sequence<B: Send + 'static>(children: Vec<ExecutableNode<B>>) -> ExecutableNode<B> {
    ExecutableNode::composite_with("Sequence", Sequence, children)
}

/// Creates a selector node with the given children.
pub fn selector<B: Send + 'static>(children: Vec<ExecutableNode<B>>) -> ExecutableNode<B> {
    ExecutableNode::composite_with("Selector", Selector, children)
}

/// Creates a synchronous action; `true` means succeeded.
pub fn action<B, F>(action: F) -> ExecutableNode<B>
where
    B: Send + 'static,
    F: Fn(&mut B) -> bool + Send + Sync + 'static,
{
    ExecutableNode::action("Action", SyncAction::new(action))
}

/// Creates an asynchronous action.
pub fn action_async<B, F, Fut>(action: F) -> ExecutableNode<B>
where
    B: Send + 'static,
    F: Fn(ActionContext<B>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    ExecutableNode::action("ActionAsync", AsyncAction::new(action))
}

pub fn wait<B: Send + 'static>(delay: Duration) -> ExecutableNode<B> {
    ExecutableNode::action("Wait", Wait(delay))
}

pub fn wait_ticks<B: Send + 'static>(ticks: u64) -> ExecutableNode<B> {
    ExecutableNode::action("WaitTicks", WaitTicks(ticks))
}

/// Embeds the behaviour tree `T` as an action node.
///
/// The tree is built right away, so its setup errors surface here.
pub fn subtree<B, T>() -> Result<ExecutableNode<B>>
where
    B: Send + 'static,
    T: BehaviourTree<B> + Default,
{
    let name = short_type_name::<T>();
    let tree = TreeInstance::build(Arc::new(T::default()), TypeId::of::<T>(), name)?;
    Ok(ExecutableNode::action(name, SubTree::new(tree)))
}

/// Embeds the state machine `T` as an action node.
///
/// The node finishes with the result a state passes to
/// [`StateContext::complete`](crate::StateContext::complete).
pub fn machine<B, T>() -> Result<ExecutableNode<B>>
where
    B: Send + 'static,
    T: StateMachine<B> + Default,
{
    let blueprint = Blueprint::build::<Machine<T>>()?;
    Ok(ExecutableNode::action(
        short_type_name::<T>(),
        SubMachine::new(blueprint),
    ))
}
