use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use lull_core::{LullError, SchedulerConfig};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::customer::{Customer, PriorityChange, PrioritySender, SubscriptionId};
use crate::gate::FrameGate;
use crate::host::{FrameRequester, IdleMonitor};
use crate::metrics::SchedulerMetrics;

/// One slot of the active queue.
pub(super) struct QueueEntry {
    pub(super) name: String,
    pub(super) customer: Arc<dyn Customer>,
}

/// Identity comparison on the customer object, ignoring vtable metadata.
pub(super) fn same_customer(a: &Arc<dyn Customer>, b: &Arc<dyn Customer>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Multiplexes background customers onto the host's frame loop.
///
/// At most one task increment runs per tick, and only after the host has
/// sustained the target frame rate for `tick_threshold` consecutive frames
/// while the user is idle. All methods are expected to be called from the
/// thread that drives [`Scheduler::tick`].
pub struct Scheduler {
    pub(super) config: SchedulerConfig,
    /// Named customers, active or not.
    pub(super) registry: HashMap<String, Arc<dyn Customer>>,
    /// Customers eligible for dispatch, front runs next.
    pub(super) queue: VecDeque<QueueEntry>,
    /// Live priority subscriptions.
    pub(super) subscriptions: HashMap<SubscriptionId, Arc<dyn Customer>>,
    pub(super) next_subscription: u64,
    pub(super) priority_tx: UnboundedSender<PriorityChange>,
    pub(super) priority_rx: UnboundedReceiver<PriorityChange>,
    pub(super) gate: FrameGate,
    pub(super) frames: Box<dyn FrameRequester>,
    pub(super) idle: Box<dyn IdleMonitor>,
    /// A frame has been requested and not yet delivered.
    pub(super) armed: bool,
    pub(super) paused: bool,
    pub(super) metrics: SchedulerMetrics,
}

impl Scheduler {
    /// Create a scheduler bound to the host's frame source and idle monitor.
    pub fn new(
        config: SchedulerConfig,
        frames: impl FrameRequester + 'static,
        idle: impl IdleMonitor + 'static,
    ) -> Result<Self, LullError> {
        config.validate()?;
        let (priority_tx, priority_rx) = mpsc::unbounded_channel();
        let gate = FrameGate::new(&config);
        info!(
            budget = ?gate.budget(),
            threshold = gate.threshold(),
            "scheduler created"
        );
        Ok(Self {
            gate,
            config,
            registry: HashMap::new(),
            queue: VecDeque::new(),
            subscriptions: HashMap::new(),
            next_subscription: 0,
            priority_tx,
            priority_rx,
            frames: Box::new(frames),
            idle: Box::new(idle),
            armed: false,
            paused: false,
            metrics: SchedulerMetrics::default(),
        })
    }

    /// Register `customer` under `name`, replacing any previous entry.
    ///
    /// Unless `deferred`, the customer is activated immediately. A replaced
    /// customer that was active stays in the queue.
    pub fn add(&mut self, customer: Arc<dyn Customer>, name: &str, deferred: bool) {
        if self.registry.insert(name.to_string(), Arc::clone(&customer)).is_some() {
            debug!(customer = name, "registry entry replaced");
        }
        info!(customer = name, deferred, "customer registered");
        if !deferred {
            self.activate(customer, name);
        }
    }

    /// Append `customer` to the active queue and subscribe to its priority changes.
    ///
    /// Callers must not activate a customer that is already queued.
    pub fn activate(&mut self, customer: Arc<dyn Customer>, name: &str) {
        let state = customer.state();
        if let Some(stale) = state.subscription() {
            self.subscriptions.remove(&stale);
        }

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        state.subscribe(PrioritySender::new(id, self.priority_tx.clone()));
        state.set_managed(true);

        self.subscriptions.insert(id, Arc::clone(&customer));
        self.queue.push_back(QueueEntry {
            name: name.to_string(),
            customer,
        });
        debug!(customer = name, subscription = %id, queued = self.queue.len(), "customer activated");
        self.rearm();
    }

    /// Deactivate the customer registered as `name` and cancel its in-flight task.
    ///
    /// With `preserve` the registry entry survives so the customer can be
    /// re-activated later. Unknown names are ignored.
    pub fn remove(&mut self, name: &str, preserve: bool) {
        let customer = if preserve {
            self.registry.get(name).cloned()
        } else {
            self.registry.remove(name)
        };

        match customer {
            Some(customer) => {
                self.subscriptions.retain(|_, c| !same_customer(c, &customer));
                customer.state().unsubscribe();
                customer.cancel_task();
                customer.state().set_managed(false);
                self.queue.retain(|e| !same_customer(&e.customer, &customer));
                if self.queue.is_empty() {
                    self.gate.reset();
                }
                info!(customer = name, preserve, "customer removed");
            }
            None => debug!(customer = name, "remove: no such customer"),
        }
        self.rearm();
    }

    /// Look up a registered customer, active or not.
    pub fn get_customer(&self, name: &str) -> Option<Arc<dyn Customer>> {
        self.registry.get(name).cloned()
    }

    /// Cancel every active customer and forget all customers.
    pub fn clear(&mut self) {
        for entry in &self.queue {
            entry.customer.state().unsubscribe();
            entry.customer.cancel_task();
            entry.customer.state().set_managed(false);
        }
        info!(
            cancelled = self.queue.len(),
            registered = self.registry.len(),
            "scheduler cleared"
        );
        self.queue.clear();
        self.registry.clear();
        self.subscriptions.clear();
        self.gate.reset();
    }

    /// Ask every active customer to pause.
    pub fn pause(&mut self) {
        self.paused = true;
        for entry in &self.queue {
            entry.customer.pause_task();
        }
        info!(customers = self.queue.len(), "scheduler paused");
    }

    /// Ask every active customer to resume, then poll again.
    pub fn resume(&mut self) {
        self.paused = false;
        for entry in &self.queue {
            entry.customer.resume_task();
        }
        info!(customers = self.queue.len(), "scheduler resumed");
        self.rearm();
    }

    /// Names of the active customers in dispatch order.
    pub fn queue_names(&self) -> Vec<String> {
        self.queue.iter().map(|e| e.name.clone()).collect()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn registered_len(&self) -> usize {
        self.registry.len()
    }

    /// Whether `pause` was called more recently than `resume`.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a frame is pending.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.clone()
    }
}
