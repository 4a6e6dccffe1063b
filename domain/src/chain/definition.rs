//! Chain definitions - the ordered list of tools a chain runs.

use serde::{Deserialize, Serialize};

/// One step of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStepSpec {
    pub tool_id: String,
    /// A required step cannot be skipped by recovery: its failure ends the chain.
    #[serde(default)]
    pub required: bool,
}

impl ChainStepSpec {
    pub fn new(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            required: false,
        }
    }

    pub fn required(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            required: true,
        }
    }
}

/// Ordered sequence of tool invocations.
///
/// Each step receives the previous successful step's output under
/// `previousResult`; steps always run in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDefinition {
    pub steps: Vec<ChainStepSpec>,
}

impl ChainDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain of optional steps, one per tool id.
    pub fn from_ids<I, S>(tool_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: tool_ids.into_iter().map(ChainStepSpec::new).collect(),
        }
    }

    pub fn step(mut self, tool_id: impl Into<String>) -> Self {
        self.steps.push(ChainStepSpec::new(tool_id));
        self
    }

    pub fn required_step(mut self, tool_id: impl Into<String>) -> Self {
        self.steps.push(ChainStepSpec::required(tool_id));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn tool_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.tool_id.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for ChainDefinition {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}
