//! Tool Registry
//!
//! The [`ToolRegistry`] is the catalog of [`ToolDescriptor`]s. It is populated
//! once at startup and read-only afterwards, so it is shared behind an `Arc`
//! without any locking.
//!
//! Lookups by id are O(1); listing preserves registration order.

use std::collections::HashMap;

use super::descriptor::{ToolCategory, ToolDescriptor};
use crate::core::error::{RegistryError, ToolError};
use crate::health::GroupId;

/// Catalog of tool descriptors, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Fails with [`RegistryError::DuplicateTool`] if the id is taken, or
    /// [`RegistryError::InvalidDescriptor`] if the descriptor is malformed.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        Self::check_descriptor(&descriptor)?;
        if self.index.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateTool(descriptor.id));
        }
        self.index.insert(descriptor.id.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Register a descriptor (builder pattern)
    pub fn with_tool(mut self, descriptor: ToolDescriptor) -> Result<Self, RegistryError> {
        self.register(descriptor)?;
        Ok(self)
    }

    fn check_descriptor(descriptor: &ToolDescriptor) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidDescriptor {
            id: descriptor.id.clone(),
            reason: reason.to_string(),
        };

        if descriptor.id.trim().is_empty() {
            return Err(invalid("id cannot be empty"));
        }
        if descriptor.fallback.as_deref() == Some(descriptor.id.as_str()) {
            return Err(invalid("a tool cannot be its own fallback"));
        }
        let mut seen = std::collections::HashSet::new();
        for param in &descriptor.params {
            if !seen.insert(param.name.as_str()) {
                return Err(invalid(&format!("duplicate parameter '{}'", param.name)));
            }
        }
        Ok(())
    }

    /// Get a descriptor by id, or [`ToolError::UnknownTool`].
    pub fn get(&self, tool_id: &str) -> Result<&ToolDescriptor, ToolError> {
        self.index
            .get(tool_id)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::unknown_tool(tool_id))
    }

    pub fn contains(&self, tool_id: &str) -> bool {
        self.index.contains_key(tool_id)
    }

    /// All descriptors in registration order
    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.id.as_str())
    }

    /// Descriptors of one category, in registration order
    pub fn list_by_category(&self, category: ToolCategory) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().filter(move |t| t.category == category)
    }

    /// Descriptors that declare a dependency on `group`
    pub fn tools_in_group<'a>(
        &'a self,
        group: &'a GroupId,
    ) -> impl Iterator<Item = &'a ToolDescriptor> + 'a {
        self.tools.iter().filter(move |t| t.depends_on_group(group))
    }

    /// Every dependency group referenced by at least one tool, first-seen order.
    pub fn dependency_groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = Vec::new();
        for group in self.tools.iter().flat_map(|t| t.dependencies.iter()) {
            if !groups.contains(group) {
                groups.push(group.clone());
            }
        }
        groups
    }

    /// Suggest an alternative for a failing tool.
    ///
    /// The descriptor's explicit fallback wins when it is registered.
    /// Otherwise the lightest tool in the same category whose complexity is
    /// strictly lower is suggested (ties resolved by registration order).
    pub fn suggest_fallback(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        let tool = self.get(tool_id).ok()?;

        if let Some(explicit) = &tool.fallback
            && let Ok(fallback) = self.get(explicit)
        {
            return Some(fallback);
        }

        self.list_by_category(tool.category)
            .filter(|candidate| {
                candidate.id != tool.id
                    && candidate.complexity.weight() < tool.complexity.weight()
            })
            .min_by_key(|candidate| candidate.complexity.weight())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::descriptor::{Complexity, ParamSpec};

    fn tool(id: &str, category: ToolCategory, complexity: Complexity) -> ToolDescriptor {
        ToolDescriptor::new(id, id, category).with_complexity(complexity)
    }

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new()
            .with_tool(tool("lookup", ToolCategory::Data, Complexity::Simple))
            .unwrap();

        assert_eq!(registry.get("lookup").unwrap().id, "lookup");
        assert!(registry.contains("lookup"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool { ref tool_id } if tool_id == "missing"));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry
            .register(tool("lookup", ToolCategory::Data, Complexity::Simple))
            .unwrap();
        let err = registry
            .register(tool("lookup", ToolCategory::Analysis, Complexity::Research))
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateTool("lookup".into()));
        // The original registration is untouched
        assert_eq!(registry.get("lookup").unwrap().category, ToolCategory::Data);
    }

    #[test]
    fn test_invalid_descriptors_rejected() {
        let mut registry = ToolRegistry::new();
        assert!(matches!(
            registry.register(tool(" ", ToolCategory::Data, Complexity::Simple)),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            registry.register(tool("loop", ToolCategory::Data, Complexity::Simple).with_fallback("loop")),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            registry.register(
                tool("dup", ToolCategory::Data, Complexity::Simple)
                    .with_param(ParamSpec::new("zip", "", true))
                    .with_param(ParamSpec::new("zip", "", false))
            ),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_list_by_category_keeps_registration_order() {
        let registry = ToolRegistry::new()
            .with_tool(tool("b_lookup", ToolCategory::Data, Complexity::Simple))
            .unwrap()
            .with_tool(tool("trend", ToolCategory::Analysis, Complexity::Standard))
            .unwrap()
            .with_tool(tool("a_lookup", ToolCategory::Data, Complexity::Research))
            .unwrap();

        let ids: Vec<&str> = registry
            .list_by_category(ToolCategory::Data)
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b_lookup", "a_lookup"]);
        assert_eq!(registry.list_by_category(ToolCategory::Integration).count(), 0);
    }

    #[test]
    fn test_suggest_fallback_prefers_explicit() {
        let registry = ToolRegistry::new()
            .with_tool(tool("quick", ToolCategory::Analysis, Complexity::Simple))
            .unwrap()
            .with_tool(tool("cached_report", ToolCategory::Data, Complexity::Standard))
            .unwrap()
            .with_tool(
                tool("deep", ToolCategory::Analysis, Complexity::Research).with_fallback("cached_report"),
            )
            .unwrap();

        assert_eq!(registry.suggest_fallback("deep").unwrap().id, "cached_report");
    }

    #[test]
    fn test_suggest_fallback_lower_complexity_same_category() {
        let registry = ToolRegistry::new()
            .with_tool(tool("medium", ToolCategory::Analysis, Complexity::Standard))
            .unwrap()
            .with_tool(tool("quick", ToolCategory::Analysis, Complexity::Simple))
            .unwrap()
            .with_tool(tool("other_quick", ToolCategory::Data, Complexity::Simple))
            .unwrap()
            .with_tool(tool("deep", ToolCategory::Analysis, Complexity::Research))
            .unwrap();

        assert_eq!(registry.suggest_fallback("deep").unwrap().id, "quick");
        assert_eq!(registry.suggest_fallback("medium").unwrap().id, "quick");
        assert!(registry.suggest_fallback("quick").is_none());
        assert!(registry.suggest_fallback("missing").is_none());
    }

    #[test]
    fn test_groups() {
        let registry = ToolRegistry::new()
            .with_tool(tool("a", ToolCategory::Data, Complexity::Simple).depends_on("census"))
            .unwrap()
            .with_tool(
                tool("b", ToolCategory::Data, Complexity::Simple)
                    .depends_on("census")
                    .depends_on("listings"),
            )
            .unwrap()
            .with_tool(tool("c", ToolCategory::Data, Complexity::Simple))
            .unwrap();

        assert_eq!(
            registry.dependency_groups(),
            vec![GroupId::new("census"), GroupId::new("listings")]
        );
        let census = GroupId::new("census");
        let ids: Vec<&str> = registry.tools_in_group(&census).map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
