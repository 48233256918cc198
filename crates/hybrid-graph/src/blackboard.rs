//! Shared context handed to every node of one graph.
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Externally owned state shared by all states and nodes of one graph.
///
/// Cloning is cheap and yields another handle to the same value. Hooks get
/// `&mut B` for the duration of one call; the lock is never held across a
/// suspension point.
pub struct Blackboard<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> Blackboard<B> {
    pub fn new(value: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, B> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the value.
    pub fn with<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Runs `f` with shared access to the value.
    pub fn read<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        f(&self.inner.lock())
    }
}

impl<B> Clone for Blackboard<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> From<B> for Blackboard<B> {
    fn from(value: B) -> Self {
        Self::new(value)
    }
}

impl<B: fmt::Debug> fmt::Debug for Blackboard<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(value) => f.debug_tuple("Blackboard").field(&*value).finish(),
            None => f.write_str("Blackboard(<locked>)"),
        }
    }
}
