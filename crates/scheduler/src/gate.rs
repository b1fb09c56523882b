//! Frame-timing gate: counts consecutive on-time frames.

use std::time::{Duration, Instant};

use lull_core::SchedulerConfig;

/// Outcome of feeding one frame timestamp into the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Below threshold; keep polling.
    Wait,
    /// The interval since the previous frame blew the budget. Counter reset.
    Late,
    /// Threshold reached. The gate has already reset itself for the next window.
    Ready,
}

#[derive(Debug, Clone)]
pub struct FrameGate {
    budget: Duration,
    threshold: u32,
    /// Timestamp of the most recent frame in the current window.
    latest: Option<Instant>,
    on_time: u32,
}

impl FrameGate {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            budget: config.frame_budget(),
            threshold: config.tick_threshold,
            latest: None,
            on_time: 0,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Consecutive on-time frames in the current window.
    pub fn on_time(&self) -> u32 {
        self.on_time
    }

    /// Forget the window: last sample and counter.
    pub fn reset(&mut self) {
        self.latest = None;
        self.on_time = 0;
    }

    /// Record a frame observed at `now`.
    ///
    /// The first sample after a reset only seeds the window.
    pub fn observe(&mut self, now: Instant) -> GateDecision {
        let mut decision = GateDecision::Wait;
        if let Some(last) = self.latest {
            if now.saturating_duration_since(last) < self.budget {
                self.on_time += 1;
            } else {
                self.on_time = 0;
                decision = GateDecision::Late;
            }
        }
        self.latest = Some(now);

        if self.on_time == self.threshold {
            self.reset();
            return GateDecision::Ready;
        }
        decision
    }
}
