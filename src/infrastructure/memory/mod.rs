//! Memory Layer - In-Memory State Management
//!
//! 进程内的限流窗口

mod rate_limiter;

pub use rate_limiter::{InMemoryRateLimiter, RateLimitConfig, RateScope};
