//! Tokio frame driver: turns frame requests into paced `Scheduler::tick` calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::host::FrameRequester;
use crate::scheduler::Scheduler;

/// Coalescing frame request flag shared between a scheduler and its driver.
#[derive(Debug, Clone, Default)]
pub struct FrameSignal {
    pending: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl FrameSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame has been requested and not yet delivered.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Consume the pending request, if any.
    fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    async fn requested(&self) {
        self.wake.notified().await
    }
}

impl FrameRequester for FrameSignal {
    fn request_frame(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }
}

/// Delivers requested frames to a shared scheduler at a fixed frame interval.
///
/// The driver sleeps while no frame is requested, so a scheduler with an
/// empty queue costs nothing.
pub struct FrameDriver {
    scheduler: Arc<Mutex<Scheduler>>,
    signal: FrameSignal,
    frame_interval: Duration,
    shutdown: Arc<Notify>,
}

impl FrameDriver {
    /// `signal` must be the requester the scheduler was built with.
    pub fn new(scheduler: Arc<Mutex<Scheduler>>, signal: FrameSignal, frame_interval: Duration) -> Self {
        Self {
            scheduler,
            signal,
            frame_interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle for stopping the driver from another task.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Stop the driver. Safe to call before `run` starts waiting.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run until shutdown is signalled.
    pub async fn run(&self) {
        info!(frame_interval = ?self.frame_interval, "frame driver started");
        let mut frames = interval(self.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = self.signal.requested() => {}
            }

            // Align to the next frame boundary.
            tokio::select! {
                _ = self.shutdown.notified() => break,
                _ = frames.tick() => {}
            }

            if self.signal.take() {
                let mut scheduler = self.scheduler.lock().await;
                // Real arrival time, not the interval deadline: a stalled
                // frame must reach the gate as late.
                scheduler.tick(Instant::now());
                if !scheduler.is_armed() {
                    debug!("scheduler dormant, waiting for work");
                }
            }
        }
        info!("frame driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_coalesces_requests() {
        let signal = FrameSignal::new();
        assert!(!signal.is_pending());

        signal.request_frame();
        signal.request_frame();
        assert!(signal.is_pending());

        assert!(signal.take());
        assert!(!signal.take());
        assert!(!signal.is_pending());
    }

    #[tokio::test]
    async fn request_wakes_waiter() {
        let signal = FrameSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.requested().await });

        signal.request_frame();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
