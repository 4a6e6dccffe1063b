//! Tool chains
//!
//! A chain runs tools in order, threading each successful output into the
//! next step's parameters. The domain side only describes chains and their
//! results; running them is the application layer's job.

pub mod definition;
pub mod outcome;

pub use definition::{ChainDefinition, ChainStepSpec};
pub use outcome::{
    CONFIDENCE_FIELD, ChainFailure, ChainOutcome, ChainSynthesis, StepRecord, StepStatus,
};
