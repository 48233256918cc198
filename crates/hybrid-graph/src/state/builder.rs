//! Setup-time port a [`StateMachine`](super::StateMachine) declares its
//! children and transitions through.
use tracing::debug;

use super::GraphItem;
use super::arena::{Arena, ItemId};
use crate::error::Result;
use crate::trigger::Trigger;

/// Declares the children of one container.
///
/// Children are created the first time they are named, once per container.
/// The builder only exists while `setup_states` runs, so a machine cannot be
/// reshaped once it has started.
pub struct StateBuilder<'a, B> {
    arena: &'a mut Arena<B>,
    container: ItemId,
}

impl<'a, B: Send + 'static> StateBuilder<'a, B> {
    pub(crate) fn new(arena: &'a mut Arena<B>, container: ItemId) -> Self {
        Self { arena, container }
    }

    /// Picks the child entered when this container is entered.
    ///
    /// # Errors
    ///
    /// - [`InitialStateAlreadySet`](crate::GraphError::InitialStateAlreadySet)
    ///   when called twice
    /// - [`RecursiveState`](crate::GraphError::RecursiveState) when `T` is this
    ///   container or one of its ancestors
    pub fn set_initial_state<T: GraphItem<B>>(&mut self) -> Result<&mut Self> {
        let child = self.arena.get_or_create::<T>(self.container)?;
        self.arena.set_initial_state(self.container, child)?;
        Ok(self)
    }

    /// Connects `trigger` from `Prev` to `Next`.
    ///
    /// When `Prev` is a container the trigger is registered on every leaf
    /// inside it. When `Next` is a container the transition lands on its
    /// initial leaf.
    ///
    /// # Errors
    ///
    /// [`DuplicateTrigger`](crate::GraphError::DuplicateTrigger) when a leaf of
    /// `Prev` already has a transition for `trigger`.
    pub fn add_transition<Prev, Next>(&mut self, trigger: impl Into<Trigger>) -> Result<&mut Self>
    where
        Prev: GraphItem<B>,
        Next: GraphItem<B>,
    {
        let trigger = trigger.into();
        let source = self.arena.get_or_create::<Prev>(self.container)?;
        let target = self.arena.get_or_create::<Next>(self.container)?;
        let entry = self.arena.entry_node(target)?;

        self.arena.connect(source, trigger, entry)?;
        debug!(
            machine = self.arena.name(self.container),
            %trigger,
            from = self.arena.name(source),
            to = self.arena.name(entry),
            "transition connected"
        );
        Ok(self)
    }
}
