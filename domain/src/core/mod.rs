//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ToolError`] - classified failure of a tool invocation
//! - [`error::ErrorKind`] - discriminant used for retry and breaker decisions
//! - [`error::RegistryError`] - catalog population errors

pub mod error;
