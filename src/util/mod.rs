//! Utility types and functions

pub mod config;
pub mod logger;
pub mod math;
pub mod rate_limiter;
pub mod timer;

pub use config::{ConfigError, EngineConfig};
pub use rate_limiter::RateLimiter;
pub use timer::{Clock, ManualClock, SharedClock, SystemClock, Timer};
