//! Configuration errors raised while building or driving a graph.
//!
//! Node results (succeeded, failed, cancelled) are ordinary values and never
//! show up here. Everything in [`GraphError`] is raised synchronously at
//! setup time, or when the driver is misused after disposal.
use thiserror::Error;

use crate::trigger::Trigger;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("trigger {trigger} is already connected from {from} (new target {to})")]
    DuplicateTrigger {
        trigger: Trigger,
        from: &'static str,
        to: &'static str,
    },

    #[error("initial state of {machine} is already set")]
    InitialStateAlreadySet { machine: &'static str },

    #[error("initial state of {machine} is not set")]
    MissingInitialState { machine: &'static str },

    #[error("{state} cannot be a child of itself or of one of its descendants")]
    RecursiveState { state: &'static str },

    #[error("root of behaviour tree {tree} already has a child")]
    RootAlreadyHasChild { tree: &'static str },

    #[error("root of behaviour tree {tree} must have exactly one child")]
    EmptyRoot { tree: &'static str },

    #[error("node {node} is not a composite and cannot have children")]
    NotComposite { node: String },

    #[error("loop count must be -1 (infinite) or at least 1, got {0}")]
    InvalidLoopCount(i32),

    #[error("probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("behaviour tree {tree} needs a tokio runtime to run")]
    RuntimeUnavailable { tree: &'static str },

    #[error("graph has already been disposed")]
    Disposed,
}
