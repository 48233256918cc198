//! Behaviour-tree engine.
//!
//! - [`ExecutableNode`]: a unit of work with its decorators
//! - Composite policies: [`Sequence`], [`Selector`]
//! - Decorators: [`If`], [`While`], [`Loop`], [`OnEnter`], [`OnExit`],
//!   [`TimeLimit`], [`Random`], [`Cooldown`]
//! - Actions: synchronous and asynchronous closures, waits, nested trees and
//!   nested state machines (see [`builder`])

pub mod action;
pub mod builder;
pub mod composite;
pub mod decorator;
pub(crate) mod node;
pub mod status;
pub(crate) mod tree;

pub use action::{Action, ActionContext, AsyncAction, SyncAction, Wait, WaitTicks};
pub use composite::{ChildSelector, Selector, Sequence};
pub use decorator::{Condition, Cooldown, Decorator, If, Loop, OnEnter, OnExit, Random, TimeLimit, While};
pub use node::{ExecutableNode, NodeHandle};
pub use status::{AbortResult, NodeResult};
pub use tree::{BehaviourTree, RootNode, TreeEnd};
