//! Tool descriptors - the immutable definition of a callable tool.

use crate::health::GroupId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Functional category of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// Data lookups (listings, demographics, statistics)
    Data,
    /// Analyses computed over looked-up data
    Analysis,
    /// Messaging and summarisation
    Communication,
    /// Scheduled or memory operations
    Automation,
    /// Bridges to third-party systems
    Integration,
}

impl ToolCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ToolCategory::Data => "data",
            ToolCategory::Analysis => "analysis",
            ToolCategory::Communication => "communication",
            ToolCategory::Automation => "automation",
            ToolCategory::Integration => "integration",
        }
    }

    pub fn all() -> [ToolCategory; 5] {
        [
            ToolCategory::Data,
            ToolCategory::Analysis,
            ToolCategory::Communication,
            ToolCategory::Automation,
            ToolCategory::Integration,
        ]
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "data" => Ok(ToolCategory::Data),
            "analysis" => Ok(ToolCategory::Analysis),
            "communication" => Ok(ToolCategory::Communication),
            "automation" => Ok(ToolCategory::Automation),
            "integration" => Ok(ToolCategory::Integration),
            other => Err(format!("unknown tool category: {}", other)),
        }
    }
}

/// How expensive a tool is to run.
///
/// Drives the default timeout and fallback ranking; never correctness.
///
/// | Complexity | Weight | Default timeout |
/// |------------|:------:|:---------------:|
/// | `Simple`   | 1 | 3s  |
/// | `Standard` | 2 | 15s |
/// | `Research` | 3 | 30s |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Standard,
    Research,
}

impl Complexity {
    pub fn as_str(&self) -> &str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Standard => "standard",
            Complexity::Research => "research",
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            Complexity::Simple => 1,
            Complexity::Standard => 2,
            Complexity::Research => 3,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            Complexity::Simple => Duration::from_secs(3),
            Complexity::Standard => Duration::from_secs(15),
            Complexity::Research => Duration::from_secs(30),
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Expected JSON type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Any,
}

impl ParamType {
    pub fn as_str(&self) -> &str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
            ParamType::Any => "any",
        }
    }

    /// Check whether a JSON value satisfies this type.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
            ParamType::Any => true,
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// Expected JSON type
    pub param_type: ParamType,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParamType::String,
        }
    }

    pub fn with_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }
}

/// Immutable definition of a tool.
///
/// Built once from the static catalog at startup, then shared read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique id (e.g., "property_lookup")
    pub id: String,
    /// Human-readable name
    pub display_name: String,
    pub category: ToolCategory,
    /// Parameter schema, in declaration order
    pub params: Vec<ParamSpec>,
    /// Dependency groups that must be healthy before the tool runs
    pub dependencies: Vec<GroupId>,
    /// Whether successful results may be served from the cache
    pub cacheable: bool,
    /// Explicit timeout; falls back to the complexity default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    pub complexity: Complexity,
    /// Explicit cache TTL; falls back to the cache default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<Duration>,
    /// Preferred alternative when this tool is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Reject parameters that are not declared in the schema
    #[serde(default)]
    pub strict_params: bool,
}

impl ToolDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            category,
            params: Vec::new(),
            dependencies: Vec::new(),
            cacheable: false,
            timeout: None,
            complexity: Complexity::default(),
            cache_ttl: None,
            fallback: None,
            strict_params: false,
        }
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn depends_on(mut self, group: impl Into<GroupId>) -> Self {
        self.dependencies.push(group.into());
        self
    }

    pub fn cacheable(mut self) -> Self {
        self.cacheable = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn with_fallback(mut self, tool_id: impl Into<String>) -> Self {
        self.fallback = Some(tool_id.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_params = true;
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn depends_on_group(&self, group: &GroupId) -> bool {
        self.dependencies.contains(group)
    }

    /// Timeout to apply, given the configured per-complexity default.
    pub fn timeout_or(&self, complexity_default: Duration) -> Duration {
        self.timeout.unwrap_or(complexity_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_builder() {
        let tool = ToolDescriptor::new("property_lookup", "Property Lookup", ToolCategory::Data)
            .with_param(ParamSpec::new("address", "Street address", true))
            .with_param(ParamSpec::new("radius", "Search radius", false).with_type(ParamType::Number))
            .depends_on("listings-api")
            .cacheable()
            .with_complexity(Complexity::Simple);

        assert_eq!(tool.id, "property_lookup");
        assert!(tool.cacheable);
        assert_eq!(tool.params.len(), 2);
        assert_eq!(tool.param("radius").unwrap().param_type, ParamType::Number);
        assert!(tool.depends_on_group(&GroupId::new("listings-api")));
        assert_eq!(tool.timeout_or(Complexity::Simple.default_timeout()), Duration::from_secs(3));
    }

    #[test]
    fn test_explicit_timeout_wins() {
        let tool = ToolDescriptor::new("slow", "Slow", ToolCategory::Analysis)
            .with_timeout(Duration::from_secs(7));
        assert_eq!(tool.timeout_or(Duration::from_secs(15)), Duration::from_secs(7));
    }

    #[test]
    fn test_complexity_defaults() {
        assert_eq!(Complexity::Simple.default_timeout(), Duration::from_secs(3));
        assert_eq!(Complexity::Standard.default_timeout(), Duration::from_secs(15));
        assert_eq!(Complexity::Research.default_timeout(), Duration::from_secs(30));
        assert!(Complexity::Simple.weight() < Complexity::Research.weight());
    }

    #[test]
    fn test_param_type_accepts() {
        assert!(ParamType::String.accepts(&json!("x")));
        assert!(!ParamType::String.accepts(&json!(1)));
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Number.accepts(&json!(3.5)));
        assert!(ParamType::Any.accepts(&json!(null)));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Analysis".parse::<ToolCategory>().unwrap(), ToolCategory::Analysis);
        assert!("quantum".parse::<ToolCategory>().is_err());
    }
}
