//! Results produced by behaviour-tree nodes.

/// The outcome of one node execution.
///
/// Results are ordinary control-flow values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeResult {
    /// The node finished its work successfully.
    Succeeded,

    /// The node finished its work without success, or was rejected by an
    /// entry gate.
    Failed,

    /// The node was unwound because its owner went away (a state exit or the
    /// driver being disposed).
    Cancelled,
}

impl NodeResult {
    #[inline]
    pub fn is_succeeded(self) -> bool {
        matches!(self, NodeResult::Succeeded)
    }

    #[inline]
    pub fn is_failed(self) -> bool {
        matches!(self, NodeResult::Failed)
    }

    #[inline]
    pub fn is_cancelled(self) -> bool {
        matches!(self, NodeResult::Cancelled)
    }
}

impl From<bool> for NodeResult {
    #[inline]
    fn from(succeeded: bool) -> Self {
        if succeeded {
            NodeResult::Succeeded
        } else {
            NodeResult::Failed
        }
    }
}

/// Result substituted for a node that did not finish on its own: either it
/// was rejected at entry or forced out early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AbortResult {
    Succeeded,
    #[default]
    Failed,
}

impl From<AbortResult> for NodeResult {
    #[inline]
    fn from(result: AbortResult) -> Self {
        match result {
            AbortResult::Succeeded => NodeResult::Succeeded,
            AbortResult::Failed => NodeResult::Failed,
        }
    }
}
