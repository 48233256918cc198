//! Hierarchical state machine building blocks.
//!
//! A graph is made of three kinds of items:
//! - [`LeafState`]: a terminal state that can become current
//! - [`StateMachine`]: a container of child items with a transition table
//! - [`BehaviourTree`](crate::behaviour::BehaviourTree): a tree that runs as an
//!   asynchronous activity while it is the current leaf
//!
//! Items are declared by type and instantiated lazily, once per container,
//! with `Default`. At the type level they are referred to through the
//! [`Leaf`], [`Machine`] and [`Tree`] markers, which tell the builder which
//! kind of item a type is.

pub(crate) mod arena;
pub mod builder;

use std::any::TypeId;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::behaviour::{BehaviourTree, NodeResult};
use crate::error::Result;
use crate::trigger::Trigger;

pub use builder::StateBuilder;

use arena::TransitionTable;

/// A terminal state.
///
/// All hooks default to no-ops. State values are shared, so per-state data
/// that changes at run time belongs on the blackboard.
pub trait LeafState<B>: Send + Sync + 'static {
    fn on_enter(&self, _ctx: &mut StateContext<'_, B>) {}

    /// Called once per driver `update()` while this state is current and no
    /// transition is pending.
    fn on_update(&self, _ctx: &mut StateContext<'_, B>) {}

    fn on_exit(&self, _blackboard: &mut B) {}
}

/// A container of child states.
///
/// `setup_states` runs once, the first time the container is referenced. It
/// must pick an initial state. Entering and exiting the container fire once
/// per visit, however many transitions happen between its children.
pub trait StateMachine<B>: Send + Sync + 'static {
    fn setup_states(&self, states: &mut StateBuilder<'_, B>) -> Result<()>;

    fn on_enter(&self, _ctx: &mut StateContext<'_, B>) {}

    fn on_exit(&self, _blackboard: &mut B) {}
}

/// Type-level handle for anything that can be placed in a graph.
///
/// Implemented by the [`Leaf`], [`Machine`] and [`Tree`] markers.
pub trait GraphItem<B>: 'static {
    #[doc(hidden)]
    fn state_type() -> TypeId;

    #[doc(hidden)]
    fn state_name() -> &'static str;

    #[doc(hidden)]
    fn instantiate() -> ItemKind<B>;
}

#[doc(hidden)]
pub enum ItemKind<B> {
    Leaf(Arc<dyn LeafState<B>>),
    Machine(Arc<dyn StateMachine<B>>),
    Tree(Arc<dyn BehaviourTree<B>>),
}

/// Marks `T` as a [`LeafState`].
pub struct Leaf<T>(PhantomData<fn() -> T>);

/// Marks `T` as a [`StateMachine`].
pub struct Machine<T>(PhantomData<fn() -> T>);

/// Marks `T` as a [`BehaviourTree`] used as a leaf state.
pub struct Tree<T>(PhantomData<fn() -> T>);

impl<B, T> GraphItem<B> for Leaf<T>
where
    B: 'static,
    T: LeafState<B> + Default,
{
    fn state_type() -> TypeId {
        TypeId::of::<T>()
    }

    fn state_name() -> &'static str {
        short_type_name::<T>()
    }

    fn instantiate() -> ItemKind<B> {
        ItemKind::Leaf(Arc::new(T::default()))
    }
}

impl<B, T> GraphItem<B> for Machine<T>
where
    B: 'static,
    T: StateMachine<B> + Default,
{
    fn state_type() -> TypeId {
        TypeId::of::<T>()
    }

    fn state_name() -> &'static str {
        short_type_name::<T>()
    }

    fn instantiate() -> ItemKind<B> {
        ItemKind::Machine(Arc::new(T::default()))
    }
}

impl<B, T> GraphItem<B> for Tree<T>
where
    B: 'static,
    T: BehaviourTree<B> + Default,
{
    fn state_type() -> TypeId {
        TypeId::of::<T>()
    }

    fn state_name() -> &'static str {
        short_type_name::<T>()
    }

    fn instantiate() -> ItemKind<B> {
        ItemKind::Tree(Arc::new(T::default()))
    }
}

/// Strips the module path (and generic arguments) from a type name.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// View handed to state hooks that may request transitions.
///
/// Dereferences to the blackboard. Triggers are resolved against the
/// transition table of the leaf that is current while the hook runs.
pub struct StateContext<'a, B> {
    blackboard: &'a mut B,
    transitions: &'a TransitionTable,
    pending: &'a mut Option<arena::ItemId>,
    completion: &'a mut Option<NodeResult>,
}

impl<'a, B> StateContext<'a, B> {
    pub(crate) fn new(
        blackboard: &'a mut B,
        transitions: &'a TransitionTable,
        pending: &'a mut Option<arena::ItemId>,
        completion: &'a mut Option<NodeResult>,
    ) -> Self {
        Self {
            blackboard,
            transitions,
            pending,
            completion,
        }
    }

    /// Requests the transition connected to `trigger`, if any.
    ///
    /// The transition is applied by the driver once the running hook
    /// returns. A later trigger overwrites an earlier one.
    pub fn send_trigger(&mut self, trigger: impl Into<Trigger>) -> bool {
        match self.transitions.get(&trigger.into()) {
            Some(&next) => {
                *self.pending = Some(next);
                true
            }
            None => false,
        }
    }

    /// Marks the whole graph as finished with `result`.
    ///
    /// A machine embedded as a behaviour-tree action ends with this result.
    pub fn complete(&mut self, result: NodeResult) {
        *self.completion = Some(result);
    }

    pub fn blackboard(&mut self) -> &mut B {
        self.blackboard
    }
}

impl<B> Deref for StateContext<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        self.blackboard
    }
}

impl<B> DerefMut for StateContext<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        self.blackboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Idle;

    #[test]
    fn short_type_name_drops_paths_and_generics() {
        assert_eq!(short_type_name::<Idle>(), "Idle");
        assert_eq!(short_type_name::<Vec<Idle>>(), "Vec");
    }
}
