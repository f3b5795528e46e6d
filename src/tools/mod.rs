//! Tools module - capabilities a role can invoke mid-turn
//!
//! A role carries at most one tool, bound when the team is configured.

pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{ToolDefinition, ToolError};

pub use sql::SqlTool;

/// A callable tool exposed to the model
#[async_trait]
pub trait Tool: Send + Sync {
    /// Function definition advertised to the model
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with model-supplied arguments
    async fn invoke(
        &self,
        arguments: &serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError>;
}

/// A tool attached to a role, resolved at configuration time
#[derive(Clone)]
pub struct ToolBinding {
    definition: ToolDefinition,
    tool: Arc<dyn Tool>,
}

impl ToolBinding {
    pub fn new(tool: Arc<dyn Tool>) -> Self {
        Self {
            definition: tool.definition(),
            tool,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }
}

impl std::fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBinding")
            .field("name", &self.name())
            .finish()
    }
}
