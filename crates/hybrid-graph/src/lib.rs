//! Hierarchical state machines and behaviour trees behind one lifecycle.
//!
//! Any behaviour tree can be a leaf state of a state machine, any state
//! machine can be an action node of a behaviour tree, and both nest freely.
//! Every participant is entered, updated and exited through the same
//! protocol, so a group's enter and exit hooks fire exactly once however many
//! transitions happen inside it, and a behaviour tree that is running when
//! its state exits is cancelled mid-flight.
//!
//! # Architecture
//!
//! - [`Graph`]: the driver (`run`, `send_trigger`, `update`, `dispose`)
//! - [`state`]: [`LeafState`], [`StateMachine`] and the setup-time
//!   [`StateBuilder`]
//! - [`behaviour`]: nodes, composites, decorators, actions and the
//!   [`BehaviourTree`] root
//! - [`Blackboard`]: the context shared by everything in one graph
//! - [`CancelScope`]: hierarchical cancellation for running activities
//!
//! # Example
//!
//! ```rust,ignore
//! use hybrid_graph::{Graph, Leaf, LeafState, StateBuilder, StateMachine, Machine};
//!
//! #[derive(Default)]
//! struct Idle;
//! impl LeafState<Agent> for Idle {}
//!
//! #[derive(Default)]
//! struct Patrol;
//! impl LeafState<Agent> for Patrol {}
//!
//! #[derive(Default)]
//! struct Brain;
//! impl StateMachine<Agent> for Brain {
//!     fn setup_states(&self, states: &mut StateBuilder<'_, Agent>) -> hybrid_graph::Result<()> {
//!         states
//!             .set_initial_state::<Leaf<Idle>>()?
//!             .add_transition::<Leaf<Idle>, Leaf<Patrol>>(Trigger::Wake)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut graph = Graph::run::<Machine<Brain>>(Agent::default())?;
//! graph.send_trigger(Trigger::Wake)?;
//! graph.update()?;
//! ```

pub mod behaviour;
pub mod blackboard;
pub mod cancel;
pub mod config;
pub mod error;
pub mod graph;
pub mod state;
pub mod trigger;

pub use behaviour::builder::{
    action, action_async, machine, selector, sequence, subtree, wait, wait_ticks,
};
pub use behaviour::{
    AbortResult, ActionContext, BehaviourTree, Decorator, ExecutableNode, NodeHandle, NodeResult,
    RootNode, TreeEnd,
};
pub use blackboard::Blackboard;
pub use cancel::CancelScope;
pub use config::GraphConfig;
pub use error::{GraphError, Result};
pub use graph::{Graph, GraphBuilder};
pub use state::{GraphItem, Leaf, LeafState, Machine, StateBuilder, StateContext, StateMachine, Tree};
pub use trigger::{Trigger, TriggerSender};
