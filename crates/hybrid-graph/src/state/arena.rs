//! Arena holding the static shape of a graph.
//!
//! Items are created during a single synchronous setup pass and never move
//! afterwards. Each slot stores its parent index, so ancestry questions are
//! answered by walking upwards instead of following references.
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use super::{GraphItem, ItemKind, LeafState, StateBuilder, StateMachine};
use crate::behaviour::tree::TreeInstance;
use crate::error::{GraphError, Result};
use crate::trigger::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(usize);

pub type TransitionTable = HashMap<Trigger, ItemId>;

pub enum Body<B> {
    Leaf(Arc<dyn LeafState<B>>),
    Machine {
        state: Arc<dyn StateMachine<B>>,
        children: Vec<ItemId>,
        initial: Option<ItemId>,
    },
    Tree(Arc<TreeInstance<B>>),
}

pub struct Slot<B> {
    pub parent: Option<ItemId>,
    pub type_id: TypeId,
    pub name: &'static str,
    pub body: Body<B>,
    pub transitions: TransitionTable,
}

pub struct Arena<B> {
    slots: Vec<Slot<B>>,
}

impl<B> Default for Arena<B> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<B: Send + 'static> Arena<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, id: ItemId) -> &Slot<B> {
        &self.slots[id.0]
    }

    pub fn name(&self, id: ItemId) -> &'static str {
        self.slots[id.0].name
    }

    /// Creates `T` under `parent`, running its setup if it has one.
    pub fn materialize<T: GraphItem<B>>(&mut self, parent: Option<ItemId>) -> Result<ItemId> {
        let type_id = T::state_type();
        let name = T::state_name();
        let id = ItemId(self.slots.len());

        match T::instantiate() {
            ItemKind::Leaf(state) => {
                self.push(parent, type_id, name, Body::Leaf(state));
            }
            ItemKind::Machine(state) => {
                let _guard = BuildGuard::enter(type_id, name)?;
                self.push(
                    parent,
                    type_id,
                    name,
                    Body::Machine {
                        state: Arc::clone(&state),
                        children: Vec::new(),
                        initial: None,
                    },
                );
                state.setup_states(&mut StateBuilder::new(self, id))?;

                if self.initial_state(id).is_none() {
                    return Err(GraphError::MissingInitialState { machine: name });
                }
            }
            ItemKind::Tree(behaviour) => {
                let tree = TreeInstance::build(behaviour, type_id, name)?;
                self.push(parent, type_id, name, Body::Tree(Arc::new(tree)));
            }
        }

        trace!(item = name, ?parent, "materialized graph item");
        Ok(id)
    }

    fn push(&mut self, parent: Option<ItemId>, type_id: TypeId, name: &'static str, body: Body<B>) {
        let id = ItemId(self.slots.len());
        self.slots.push(Slot {
            parent,
            type_id,
            name,
            body,
            transitions: TransitionTable::new(),
        });
        if let Some(parent) = parent
            && let Body::Machine { children, .. } = &mut self.slots[parent.0].body
        {
            children.push(id);
        }
    }

    /// Returns the child of `container` declared as `T`, creating it on first
    /// reference.
    pub fn get_or_create<T: GraphItem<B>>(&mut self, container: ItemId) -> Result<ItemId> {
        if let Some(existing) = self.child_of_type(container, T::state_type()) {
            return Ok(existing);
        }
        self.materialize::<T>(Some(container))
    }

    pub fn child_of_type(&self, container: ItemId, type_id: TypeId) -> Option<ItemId> {
        match &self.slots[container.0].body {
            Body::Machine { children, .. } => children
                .iter()
                .copied()
                .find(|child| self.slots[child.0].type_id == type_id),
            _ => None,
        }
    }

    pub fn initial_state(&self, container: ItemId) -> Option<ItemId> {
        match &self.slots[container.0].body {
            Body::Machine { initial, .. } => *initial,
            _ => None,
        }
    }

    pub fn set_initial_state(&mut self, container: ItemId, child: ItemId) -> Result<()> {
        let machine = self.slots[container.0].name;
        match &mut self.slots[container.0].body {
            Body::Machine { initial, .. } => {
                if initial.is_some() {
                    return Err(GraphError::InitialStateAlreadySet { machine });
                }
                *initial = Some(child);
                Ok(())
            }
            _ => Err(GraphError::MissingInitialState { machine }),
        }
    }

    /// Resolves `id` to the leaf that actually becomes current when `id` is
    /// entered. Containers resolve through their initial state.
    pub fn entry_node(&self, mut id: ItemId) -> Result<ItemId> {
        loop {
            match &self.slots[id.0].body {
                Body::Machine { initial, .. } => {
                    id = initial.ok_or(GraphError::MissingInitialState {
                        machine: self.slots[id.0].name,
                    })?;
                }
                _ => return Ok(id),
            }
        }
    }

    /// Every leaf (or tree) at or below `id`.
    pub fn leaves(&self, id: ItemId) -> Vec<ItemId> {
        let mut leaves = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            match &self.slots[next.0].body {
                Body::Machine { children, .. } => stack.extend(children.iter().rev()),
                _ => leaves.push(next),
            }
        }
        leaves
    }

    /// True when `id` sits strictly below `ancestor`.
    pub fn is_descendant(&self, ancestor: ItemId, id: ItemId) -> bool {
        let mut cursor = self.slots[id.0].parent;
        while let Some(parent) = cursor {
            if parent == ancestor {
                return true;
            }
            cursor = self.slots[parent.0].parent;
        }
        false
    }

    /// Registers `trigger -> target` on every leaf of `source`.
    ///
    /// Nothing is registered if any of those leaves already uses `trigger`.
    pub fn connect(&mut self, source: ItemId, trigger: Trigger, target: ItemId) -> Result<()> {
        let leaves = self.leaves(source);
        if let Some(&taken) = leaves
            .iter()
            .find(|leaf| self.slots[leaf.0].transitions.contains_key(&trigger))
        {
            return Err(GraphError::DuplicateTrigger {
                trigger,
                from: self.slots[taken.0].name,
                to: self.slots[target.0].name,
            });
        }

        for leaf in leaves {
            self.slots[leaf.0].transitions.insert(trigger, target);
        }
        Ok(())
    }
}

/// Fully built, immutable graph shape that drivers can be started from.
pub struct Blueprint<B> {
    pub arena: Arc<Arena<B>>,
    pub root: ItemId,
}

impl<B: Send + 'static> Blueprint<B> {
    pub fn build<T: GraphItem<B>>() -> Result<Self> {
        let mut arena = Arena::new();
        let root = arena.materialize::<T>(None)?;
        Ok(Self {
            arena: Arc::new(arena),
            root,
        })
    }
}

impl<B> Clone for Blueprint<B> {
    fn clone(&self) -> Self {
        Self {
            arena: Arc::clone(&self.arena),
            root: self.root,
        }
    }
}

thread_local! {
    static BUILD_STACK: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container or tree type as being set up on this thread.
///
/// Setup is synchronous and nests through lazy child creation, so a type
/// that is already on the stack would be its own ancestor.
pub struct BuildGuard;

impl BuildGuard {
    pub fn enter(type_id: TypeId, name: &'static str) -> Result<Self> {
        BUILD_STACK.with_borrow_mut(|stack| {
            if stack.contains(&type_id) {
                return Err(GraphError::RecursiveState { state: name });
            }
            stack.push(type_id);
            Ok(BuildGuard)
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILD_STACK.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}
