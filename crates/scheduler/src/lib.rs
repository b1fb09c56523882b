pub mod customer;
pub mod driver;
pub mod gate;
pub mod host;
pub mod idle;
pub mod metrics;
pub mod scheduler;

pub use customer::{Customer, CustomerState, Priority, PriorityChange, PrioritySender, SubscriptionId};
pub use driver::{FrameDriver, FrameSignal};
pub use gate::{FrameGate, GateDecision};
pub use host::{FrameRequester, IdleMonitor};
pub use idle::{ActivityHandle, ActivityMonitor};
pub use lull_core::{Config, DriverConfig, LullError, SchedulerConfig};
pub use metrics::SchedulerMetrics;
pub use scheduler::Scheduler;
