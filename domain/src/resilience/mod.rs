//! Fault isolation for tools backed by external dependencies.

pub mod breaker;

pub use breaker::{Admission, BreakerPolicy, BreakerSnapshot, CircuitBreaker, CircuitState};
