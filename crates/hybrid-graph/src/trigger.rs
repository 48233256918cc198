//! Triggers and the mailbox that lets asynchronous activities post them.
use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

/// Integer event identifier looked up in a transition table.
///
/// Game code usually declares its triggers as a `#[repr(i32)]` enum and
/// implements `From<MyTrigger> for Trigger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Trigger(pub i32);

impl From<i32> for Trigger {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Posted {
    pub activation: u64,
    pub trigger: Trigger,
}

/// Posts triggers back to the driver from inside a running behaviour tree.
///
/// A sender is bound to the activation that created it. The driver applies
/// posted triggers at its next `update()` and drops the ones whose activation
/// has ended in the meantime.
#[derive(Debug, Clone)]
pub struct TriggerSender {
    activation: u64,
    tx: mpsc::Sender<Posted>,
}

impl TriggerSender {
    /// Queues `trigger`. Returns `false` when the mailbox is full or the
    /// driver is gone.
    pub fn post(&self, trigger: impl Into<Trigger>) -> bool {
        let trigger = trigger.into();
        match self.tx.try_send(Posted {
            activation: self.activation,
            trigger,
        }) {
            Ok(()) => true,
            Err(err) => {
                warn!(%trigger, activation = self.activation, "trigger dropped: {err}");
                false
            }
        }
    }
}

/// Receiving half owned by the driver.
#[derive(Debug)]
pub(crate) struct Mailbox {
    tx: mpsc::Sender<Posted>,
    rx: mpsc::Receiver<Posted>,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self { tx, rx }
    }

    pub fn sender(&self, activation: u64) -> TriggerSender {
        TriggerSender {
            activation,
            tx: self.tx.clone(),
        }
    }

    /// Everything posted so far, oldest first.
    pub fn drain(&mut self) -> Vec<Posted> {
        let mut posted = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            posted.push(item);
        }
        posted
    }
}
