//! Presentation layer for conductor
//!
//! This crate contains the CLI definition and the console/JSON formatters
//! for execution results, chain results and the operational snapshot.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, Command, OutputFormat};
pub use output::console::ConsoleFormatter;
