//! Logging infrastructure - execution audit trail.
//!
//! Provides [`JsonlExecutionSink`], a JSONL file writer that implements
//! the [`ExecutionSink`](conductor_application::ExecutionSink) port.

mod jsonl_sink;

pub use jsonl_sink::JsonlExecutionSink;
