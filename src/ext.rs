//! Public extension contracts.
//!
//! Downstream services implement these traits to plug their own budgeting strategy in front of
//! credential checks; [`crate::limiter::LoginRateLimiter`] is the built-in implementation.

pub mod rate_limit;

pub use rate_limit::*;
