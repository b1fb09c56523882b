//! Contracts the scheduler consumes from its host.

/// Schedules one scheduler tick at the next display frame.
///
/// Each request yields at most one `Scheduler::tick` call; the scheduler asks
/// again after every tick it wants to be followed by another.
pub trait FrameRequester: Send + Sync {
    fn request_frame(&self);
}

/// Reports whether the user is currently interacting with the host.
///
/// The scheduler keeps the monitor running only while it has queued work.
pub trait IdleMonitor: Send {
    /// Whether monitoring is currently running.
    fn is_active(&self) -> bool;

    /// Start monitoring.
    fn trigger(&mut self);

    /// Stop monitoring.
    fn stop(&mut self);

    /// True if no user activity has been observed recently.
    fn is_idle(&self) -> bool;
}
