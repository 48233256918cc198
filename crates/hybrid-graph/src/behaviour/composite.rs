//! Composite nodes.
//!
//! A composite owns an ordered list of children and a [`ChildSelector`]
//! deciding which child runs next. [`Sequence`] (AND logic) and [`Selector`]
//! (OR logic) are the two policies provided.

use tracing::trace;

use super::node::{Env, ExecutableNode};
use super::status::NodeResult;
use crate::cancel::CancelScope;

/// Child-selection policy of a composite node.
pub trait ChildSelector: Send + Sync {
    /// Index of the next child to run after `prev` finished with `last`.
    ///
    /// `prev` is `None` at the start of a pass. Returning `None` hands
    /// control back to the parent with `last` as the composite's result.
    fn next_child_index(&self, prev: Option<usize>, last: NodeResult, count: usize)
    -> Option<usize>;
}

/// Runs children left to right until one does not succeed.
///
/// - a `Succeeded` child advances to the next one
/// - any other result returns to the parent immediately
/// - if every child succeeds, the sequence succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequence;

impl ChildSelector for Sequence {
    fn next_child_index(
        &self,
        prev: Option<usize>,
        last: NodeResult,
        count: usize,
    ) -> Option<usize> {
        let next = match prev {
            None => 0,
            Some(index) if last.is_succeeded() => index + 1,
            Some(_) => return None,
        };
        (next < count).then_some(next)
    }
}

/// Runs children left to right until one does not fail.
///
/// - a `Failed` child advances to the next one
/// - any other result returns to the parent immediately
/// - if every child fails, the selector fails
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector;

impl ChildSelector for Selector {
    fn next_child_index(
        &self,
        prev: Option<usize>,
        last: NodeResult,
        count: usize,
    ) -> Option<usize> {
        let next = match prev {
            None => 0,
            Some(index) if last.is_failed() => index + 1,
            Some(_) => return None,
        };
        (next < count).then_some(next)
    }
}

pub(crate) struct Composite<B> {
    selector: Box<dyn ChildSelector>,
    children: Vec<ExecutableNode<B>>,
}

impl<B: Send + 'static> Composite<B> {
    pub fn new(selector: impl ChildSelector + 'static) -> Self {
        Self {
            selector: Box::new(selector),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, child: ExecutableNode<B>) {
        self.children.push(child);
    }

    /// One depth-first pass over the children. The cursor lives only for the
    /// duration of the pass.
    pub async fn run(&self, env: &Env<B>, scope: &CancelScope) -> NodeResult {
        let mut last = NodeResult::Failed;
        let mut cursor = self.find_child_to_execute(env, None, &mut last);

        while let Some(index) = cursor {
            last = self.children[index].execute(env, scope).await;
            if scope.is_cancelled() {
                break;
            }
            cursor = self.find_child_to_execute(env, Some(index), &mut last);
        }

        last
    }

    /// Advances the policy, skipping children whose entry gate rejects them.
    /// A skipped child counts as having finished with its abort result.
    fn find_child_to_execute(
        &self,
        env: &Env<B>,
        prev: Option<usize>,
        last: &mut NodeResult,
    ) -> Option<usize> {
        let count = self.children.len();
        let mut candidate = self.selector.next_child_index(prev, *last, count);

        while let Some(index) = candidate {
            let child = &self.children[index];
            match env.blackboard.read(|bb| child.check_entry(bb)) {
                None => return Some(index),
                Some(abort) => {
                    trace!(child = child.name(), ?abort, "child skipped");
                    *last = abort;
                    candidate = self.selector.next_child_index(Some(index), abort, count);
                }
            }
        }

        None
    }
}
