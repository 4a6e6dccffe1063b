//! Tool catalog: descriptors paired with their handlers.
//!
//! The domain [`ToolRegistry`] only knows descriptors. The catalog binds each
//! registered descriptor to the [`ToolHandler`] that runs it, so a tool can
//! never be registered without something to execute it.

use crate::ports::tool_handler::ToolHandler;
use conductor_domain::{RegistryError, ToolDescriptor, ToolError, ToolRegistry};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ToolCatalog {
    registry: ToolRegistry,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        let id = descriptor.id.clone();
        self.registry.register(descriptor)?;
        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Register a tool (builder pattern)
    pub fn with_tool(
        mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, RegistryError> {
        self.register(descriptor, handler)?;
        Ok(self)
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Descriptor and handler for `tool_id`, or [`ToolError::UnknownTool`].
    pub fn resolve(
        &self,
        tool_id: &str,
    ) -> Result<(&ToolDescriptor, &Arc<dyn ToolHandler>), ToolError> {
        let descriptor = self.registry.get(tool_id)?;
        let handler = self
            .handlers
            .get(tool_id)
            .ok_or_else(|| ToolError::unknown_tool(tool_id))?;
        Ok((descriptor, handler))
    }

    /// Id of the suggested alternative for a failing tool.
    pub fn fallback_for(&self, tool_id: &str) -> Option<String> {
        self.registry
            .suggest_fallback(tool_id)
            .map(|descriptor| descriptor.id.clone())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCatalog")
            .field("tools", &self.registry.ids().collect::<Vec<_>>())
            .finish()
    }
}
