use std::sync::Arc;

use tracing::{debug, trace};

use crate::customer::PriorityChange;

use super::core::same_customer;
use super::Scheduler;

impl Scheduler {
    /// Run one task increment for the front customer and rotate it to the back.
    ///
    /// A paused front customer blocks dispatch; the loop keeps polling.
    pub(super) fn run(&mut self) {
        let runnable = self
            .queue
            .front()
            .is_some_and(|e| !e.customer.state().is_paused());

        if runnable {
            self.queue.rotate_left(1);
            if let Some(entry) = self.queue.back() {
                let customer = Arc::clone(&entry.customer);
                let name = entry.name.clone();
                debug!(customer = %name, "dispatching task");
                customer.run_task();
                self.metrics.record_dispatch(&name);
            }
        } else if let Some(front) = self.queue.front() {
            self.metrics.paused_skips += 1;
            trace!(customer = %front.name, "front customer paused, skipping");
        }
        self.rearm();
    }

    /// Apply every pending priority-change notification.
    ///
    /// Also runs at the start of each tick, so promotions are always in place
    /// before the next dispatch decision.
    pub fn deliver_priority_changes(&mut self) {
        while let Ok(change) = self.priority_rx.try_recv() {
            self.on_priority_change(change);
        }
    }

    fn on_priority_change(&mut self, change: PriorityChange) {
        if !change.priority.is_urgent() {
            return;
        }
        let Some(customer) = self.subscriptions.get(&change.subscription) else {
            trace!(subscription = %change.subscription, "priority change from stale subscription");
            return;
        };

        let position = self
            .queue
            .iter()
            .position(|e| same_customer(&e.customer, customer));
        if let Some(pos) = position.filter(|&pos| pos > 0) {
            if let Some(entry) = self.queue.remove(pos) {
                debug!(customer = %entry.name, from = pos, "customer promoted");
                self.queue.push_front(entry);
                self.metrics.promotions += 1;
            }
        }
    }
}
