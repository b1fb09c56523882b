//! Activity-based idle monitor.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::host::IdleMonitor;

/// Input side of an [`ActivityMonitor`]: the host reports user activity here.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    last_activity: Arc<Mutex<Instant>>,
}

impl ActivityHandle {
    /// Note that the user just did something.
    pub fn record_activity(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    fn since_last_activity(&self) -> Duration {
        self.last_activity
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }
}

/// Reports idle once no activity has been recorded for `idle_after`.
///
/// Starting the monitor counts as activity, so a freshly triggered monitor
/// waits a full quiet period before reporting idle.
#[derive(Debug)]
pub struct ActivityMonitor {
    handle: ActivityHandle,
    idle_after: Duration,
    active: bool,
}

impl ActivityMonitor {
    pub fn new(idle_after: Duration) -> Self {
        Self {
            handle: ActivityHandle {
                last_activity: Arc::new(Mutex::new(Instant::now())),
            },
            idle_after,
            active: false,
        }
    }

    pub fn handle(&self) -> ActivityHandle {
        self.handle.clone()
    }
}

impl IdleMonitor for ActivityMonitor {
    fn is_active(&self) -> bool {
        self.active
    }

    fn trigger(&mut self) {
        self.active = true;
        self.handle.record_activity();
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_idle(&self) -> bool {
        self.active && self.handle.since_last_activity() >= self.idle_after
    }
}
