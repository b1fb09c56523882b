use std::time::Instant;

use tracing::{debug, trace};

use crate::gate::GateDecision;

use super::Scheduler;

impl Scheduler {
    /// Handle one frame delivered by the host at `now`.
    ///
    /// With an empty queue the idle monitor is stopped and no further frame is
    /// requested; the loop stays dormant until the next `add`/`activate`.
    pub fn tick(&mut self, now: Instant) {
        self.armed = false;
        self.metrics.ticks += 1;
        self.deliver_priority_changes();

        if self.queue.is_empty() {
            if self.idle.is_active() {
                self.idle.stop();
                debug!("queue drained, idle monitor stopped");
            }
            self.gate.reset();
            return;
        }

        if !self.idle.is_active() {
            self.idle.trigger();
            debug!("idle monitor started");
        }

        match self.gate.observe(now) {
            GateDecision::Ready if self.idle.is_idle() => self.run(),
            GateDecision::Ready => {
                self.metrics.idle_deferrals += 1;
                trace!("stable window discarded, host not idle");
            }
            GateDecision::Late => {
                self.metrics.late_frames += 1;
                trace!("late frame, on-time counter reset");
            }
            GateDecision::Wait => {
                trace!(on_time = self.gate.on_time(), "waiting for stable frames");
            }
        }
        self.rearm();
    }

    /// Request the next frame unless one is already pending.
    pub(super) fn rearm(&mut self) {
        if !self.armed {
            self.armed = true;
            self.frames.request_frame();
        }
    }
}
