//! Frame-paced round-robin scheduler for background customers.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, registry/queue mutation, pause/resume
//! - `tick`: per-frame gate evaluation and loop re-arming
//! - `dispatch`: round-robin execution and priority promotion

mod core;
mod dispatch;
mod tick;

pub use self::core::Scheduler;
