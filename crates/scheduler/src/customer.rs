use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

/// Urgency a customer can signal. Lower value = more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Wants to run next; moves the customer to the front of the queue.
    Soon = 0,
    /// Regular round-robin participation.
    Normal = 1,
    /// Happy to wait.
    Later = 2,
}

impl Priority {
    /// Whether this level triggers promotion.
    pub fn is_urgent(self) -> bool {
        self == Priority::Soon
    }
}

/// Identifies one activation of a customer. A fresh id is minted on every
/// `activate`, so notifications from an earlier activation can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A priority-change notification as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityChange {
    pub subscription: SubscriptionId,
    pub priority: Priority,
}

/// Sending half of a customer's priority subscription.
#[derive(Debug, Clone)]
pub struct PrioritySender {
    subscription: SubscriptionId,
    tx: UnboundedSender<PriorityChange>,
}

impl PrioritySender {
    pub(crate) fn new(subscription: SubscriptionId, tx: UnboundedSender<PriorityChange>) -> Self {
        Self { subscription, tx }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Returns false if the scheduler has been dropped.
    pub fn notify(&self, priority: Priority) -> bool {
        self.tx
            .send(PriorityChange {
                subscription: self.subscription,
                priority,
            })
            .is_ok()
    }
}

/// Scheduler-visible state every customer embeds.
///
/// `managed` is owned by the scheduler. `paused` is owned by the customer,
/// which is expected to set it from `pause_task`/`resume_task`.
#[derive(Debug, Default)]
pub struct CustomerState {
    managed: AtomicBool,
    paused: AtomicBool,
    subscription: Mutex<Option<PrioritySender>>,
}

impl CustomerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the customer sits in the scheduler's active queue.
    pub fn is_managed(&self) -> bool {
        self.managed.load(Ordering::Relaxed)
    }

    pub(crate) fn set_managed(&self, managed: bool) {
        self.managed.store(managed, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Emit a priority-change notification to the scheduler.
    ///
    /// Returns false when the customer is not subscribed (not active) or the
    /// scheduler is gone.
    pub fn raise_priority(&self, priority: Priority) -> bool {
        match self.subscription.lock() {
            Ok(slot) => slot.as_ref().is_some_and(|tx| tx.notify(priority)),
            Err(_) => false,
        }
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(PrioritySender::subscription))
    }

    pub(crate) fn subscribe(&self, sender: PrioritySender) {
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(sender);
        }
    }

    pub(crate) fn unsubscribe(&self) {
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = None;
        }
    }
}

/// A producer of background work, driven one increment at a time.
///
/// Implementations own their work; the scheduler only decides when the next
/// increment runs. None of these methods may block for long: they execute on
/// the host's frame loop.
pub trait Customer: Send + Sync {
    /// Run one increment of work.
    fn run_task(&self);

    /// Suspend work. Implementations should set `state().set_paused(true)`.
    fn pause_task(&self);

    /// Resume work. Implementations should set `state().set_paused(false)`.
    fn resume_task(&self);

    /// Abandon any in-flight work.
    fn cancel_task(&self);

    fn state(&self) -> &CustomerState;
}
