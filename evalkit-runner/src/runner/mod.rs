//! Evaluation execution engine

pub mod executor;
pub mod rate_limiter;

pub use executor::{Executor, ExecutorConfig, ItemResult};
pub use rate_limiter::RateLimiter;
