//! Builtin tool handlers and their descriptors.

use async_trait::async_trait;
use conductor_application::{ExecutionContext, HandlerError, ToolCatalog, ToolHandler};
use conductor_domain::{
    Complexity, FieldViolation, PREVIOUS_RESULT, ParamSpec, ParamType, RegistryError,
    ToolCategory, ToolDescriptor, ToolParams,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Dependency group of [`UnstableUpstream`].
pub const DEMO_GROUP: &str = "demo-upstream";

pub const ECHO: &str = "echo";
pub const PICK: &str = "pick";
pub const SUMMARIZE: &str = "summarize";
pub const UNSTABLE_UPSTREAM: &str = "unstable_upstream";

/// Explicit `value` parameter, or the previous step's output.
fn input_value(params: &ToolParams) -> Option<&Value> {
    params.get("value").or_else(|| params.get(PREVIOUS_RESULT))
}

fn optional_bool(params: &ToolParams, name: &str) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(false)
}

// ==================== echo ====================

/// Returns its parameters unchanged.
#[derive(Debug, Default)]
pub struct Echo;

impl Echo {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(ECHO, "Echo", ToolCategory::Automation)
            .with_complexity(Complexity::Simple)
            .cacheable()
    }
}

#[async_trait]
impl ToolHandler for Echo {
    async fn invoke(
        &self,
        params: &ToolParams,
        _ctx: &ExecutionContext,
    ) -> Result<Value, HandlerError> {
        Ok(Value::Object(params.clone()))
    }
}

// ==================== pick ====================

/// Selects one field from an object.
#[derive(Debug, Default)]
pub struct Pick;

impl Pick {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(PICK, "Pick field", ToolCategory::Data)
            .with_complexity(Complexity::Simple)
            .with_param(
                ParamSpec::new("field", "Name of the field to select", true)
                    .with_type(ParamType::String),
            )
            .with_param(
                ParamSpec::new(
                    "value",
                    "Object to select from (defaults to the previous step's output)",
                    false,
                )
                .with_type(ParamType::Object),
            )
            .cacheable()
            .strict()
    }
}

#[async_trait]
impl ToolHandler for Pick {
    async fn invoke(
        &self,
        params: &ToolParams,
        _ctx: &ExecutionContext,
    ) -> Result<Value, HandlerError> {
        let field = params
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::invalid_input(vec![FieldViolation::missing("field")]))?;

        let source = input_value(params).ok_or_else(|| {
            HandlerError::invalid_input(vec![FieldViolation::missing(PREVIOUS_RESULT)])
        })?;
        let Value::Object(object) = source else {
            return Err(HandlerError::invalid_input(vec![FieldViolation::wrong_type(
                PREVIOUS_RESULT,
                ParamType::Object,
            )]));
        };

        let value = object.get(field).ok_or_else(|| {
            HandlerError::invalid_input(vec![FieldViolation::invalid(
                field,
                "not present in input",
            )])
        })?;

        Ok(json!({ "field": field, "value": value }))
    }
}

// ==================== summarize ====================

/// Describes the shape of its input and how much it trusts it.
#[derive(Debug, Default)]
pub struct Summarize;

impl Summarize {
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(SUMMARIZE, "Summarize", ToolCategory::Analysis)
            .with_complexity(Complexity::Standard)
            .with_param(
                ParamSpec::new(
                    "value",
                    "Value to summarize (defaults to the previous step's output)",
                    false,
                )
                .with_type(ParamType::Any),
            )
    }

    fn summarize(value: &Value) -> (String, usize, f64) {
        match value {
            Value::Null => ("nothing".to_string(), 0, 0.0),
            Value::Object(map) if map.is_empty() => ("empty object".to_string(), 0, 0.2),
            Value::Object(map) => {
                let keys: Vec<&str> = map.keys().map(String::as_str).collect();
                (format!("object with keys {}", keys.join(", ")), keys.len(), 0.9)
            }
            Value::Array(items) if items.is_empty() => ("empty list".to_string(), 0, 0.2),
            Value::Array(items) => (format!("list of {} items", items.len()), items.len(), 0.9),
            Value::String(s) => (
                format!("text of {} chars", s.chars().count()),
                s.chars().count(),
                0.6,
            ),
            scalar => (format!("scalar {}", scalar), 1, 0.6),
        }
    }
}

#[async_trait]
impl ToolHandler for Summarize {
    async fn invoke(
        &self,
        params: &ToolParams,
        _ctx: &ExecutionContext,
    ) -> Result<Value, HandlerError> {
        let input = input_value(params).unwrap_or(&Value::Null);
        let (summary, size, confidence) = Self::summarize(input);
        Ok(json!({
            "summary": summary,
            "size": size,
            "confidence": confidence,
        }))
    }
}

// ==================== unstable_upstream ====================

/// Stand-in for a remote collaborator.
///
/// Fails on request (`fail`, `fail_permanently`), can stall (`delay_ms`), and
/// optionally fails every `fail_every`-th call on its own.
#[derive(Debug, Default)]
pub struct UnstableUpstream {
    calls: AtomicU64,
    fail_every: u64,
}

impl UnstableUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `n`th call with a transient error (0 disables).
    pub fn failing_every(n: u64) -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail_every: n,
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(UNSTABLE_UPSTREAM, "Unstable upstream", ToolCategory::Integration)
            .with_complexity(Complexity::Standard)
            .depends_on(DEMO_GROUP)
            .with_fallback(ECHO)
            .with_param(
                ParamSpec::new("fail", "Fail with a transient error", false)
                    .with_type(ParamType::Boolean),
            )
            .with_param(
                ParamSpec::new("fail_permanently", "Fail with a permanent error", false)
                    .with_type(ParamType::Boolean),
            )
            .with_param(
                ParamSpec::new("delay_ms", "Stall this long before answering", false)
                    .with_type(ParamType::Integer),
            )
    }
}

#[async_trait]
impl ToolHandler for UnstableUpstream {
    async fn invoke(
        &self,
        params: &ToolParams,
        ctx: &ExecutionContext,
    ) -> Result<Value, HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(delay_ms) = params.get("delay_ms").and_then(Value::as_u64) {
            let stall = tokio::time::sleep(Duration::from_millis(delay_ms));
            match &ctx.cancellation {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => {
                        return Err(HandlerError::transient("request aborted"));
                    }
                    _ = stall => {}
                },
                None => stall.await,
            }
        }

        if optional_bool(params, "fail_permanently") {
            return Err(HandlerError::permanent("upstream rejected the request"));
        }
        if optional_bool(params, "fail") || (self.fail_every > 0 && call % self.fail_every == 0) {
            return Err(HandlerError::transient(format!(
                "upstream unavailable (call {})",
                call
            )));
        }

        Ok(json!({
            "upstream": DEMO_GROUP,
            "call": call,
            "confidence": 0.8,
        }))
    }
}

// ==================== catalog ====================

/// Register every builtin tool.
pub fn register_builtins(catalog: &mut ToolCatalog) -> Result<(), RegistryError> {
    catalog.register(Echo::descriptor(), Arc::new(Echo))?;
    catalog.register(Pick::descriptor(), Arc::new(Pick))?;
    catalog.register(Summarize::descriptor(), Arc::new(Summarize))?;
    catalog.register(UnstableUpstream::descriptor(), Arc::new(UnstableUpstream::new()))?;
    Ok(())
}

/// A catalog holding only the builtin tools.
pub fn builtin_catalog() -> Result<ToolCatalog, RegistryError> {
    let mut catalog = ToolCatalog::new();
    register_builtins(&mut catalog)?;
    Ok(catalog)
}
