//! Parameter validation
//!
//! Pure domain logic: checks a parameter set against a descriptor's schema
//! without any I/O. All offending fields are reported at once.

use super::descriptor::{ParamType, ToolDescriptor};
use super::params::{PREVIOUS_RESULT, ToolParams};
use serde::{Deserialize, Serialize};

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ViolationReason {
    Missing,
    Unknown,
    WrongType { expected: ParamType },
    Invalid { message: String },
}

/// A single offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    #[serde(flatten)]
    pub reason: ViolationReason,
}

impl FieldViolation {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::Missing,
        }
    }

    pub fn unknown(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::Unknown,
        }
    }

    pub fn wrong_type(field: impl Into<String>, expected: ParamType) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::WrongType { expected },
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: ViolationReason::Invalid {
                message: message.into(),
            },
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            ViolationReason::Missing => write!(f, "'{}' is required", self.field),
            ViolationReason::Unknown => write!(f, "'{}' is not a known parameter", self.field),
            ViolationReason::WrongType { expected } => {
                write!(f, "'{}' must be of type {}", self.field, expected)
            }
            ViolationReason::Invalid { message } => write!(f, "'{}' {}", self.field, message),
        }
    }
}

/// Validator for tool parameters
///
/// This is a pure domain trait that validates parameters
/// against their descriptors without any I/O operations.
pub trait ParamValidator {
    /// Validate parameters, returning every offending field on failure
    fn validate(
        &self,
        params: &ToolParams,
        descriptor: &ToolDescriptor,
    ) -> Result<(), Vec<FieldViolation>>;
}

/// Schema-driven implementation of [`ParamValidator`].
///
/// - required parameters must be present and non-null
/// - present parameters must match their declared type
/// - undeclared parameters are rejected only for strict descriptors;
///   the chain field `previousResult` is always accepted
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator;

impl ParamValidator for SchemaValidator {
    fn validate(
        &self,
        params: &ToolParams,
        descriptor: &ToolDescriptor,
    ) -> Result<(), Vec<FieldViolation>> {
        let mut violations = Vec::new();

        for spec in &descriptor.params {
            match params.get(&spec.name) {
                None | Some(serde_json::Value::Null) if spec.required => {
                    violations.push(FieldViolation::missing(&spec.name));
                }
                Some(value) if !value.is_null() && !spec.param_type.accepts(value) => {
                    violations.push(FieldViolation::wrong_type(&spec.name, spec.param_type));
                }
                _ => {}
            }
        }

        if descriptor.strict_params {
            for name in params.keys() {
                if name != PREVIOUS_RESULT && descriptor.param(name).is_none() {
                    violations.push(FieldViolation::unknown(name));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}
