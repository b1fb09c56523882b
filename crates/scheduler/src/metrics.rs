use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Ticks processed, including ones that found the queue empty.
    pub ticks: u64,
    /// Task increments run, by customer name.
    pub dispatches: HashMap<String, u64>,
    /// Last dispatch time by customer name.
    pub last_dispatch: HashMap<String, DateTime<Utc>>,
    /// Frames that exceeded the budget and reset the on-time counter.
    pub late_frames: u64,
    /// Stable windows that were discarded because the user was active.
    pub idle_deferrals: u64,
    /// Dispatch attempts that found a paused customer at the front.
    pub paused_skips: u64,
    /// Customers moved to the front by an urgent priority change.
    pub promotions: u64,
}

impl SchedulerMetrics {
    /// Record one task increment for `customer`.
    pub fn record_dispatch(&mut self, customer: &str) {
        *self.dispatches.entry(customer.to_string()).or_default() += 1;
        self.last_dispatch.insert(customer.to_string(), Utc::now());
    }

    pub fn total_dispatches(&self) -> u64 {
        self.dispatches.values().sum()
    }
}
