pub mod config;
pub mod error;

pub use config::{Config, DriverConfig, SchedulerConfig};
pub use error::*;
