//! Tool registry for the five allowlisted operations.
//!
//! Both the deterministic router and the reasoner hook dispatch through
//! this by name, after the policy gate has allowed the call.

use std::collections::HashMap;

use io_ops_tools::{OpsTool, ToolContext, ToolError, ToolResult};

use crate::reasoner::ToolSpec;

pub struct ToolRegistry {
    tools: Vec<Box<dyn OpsTool>>,
    /// Map from tool name → index into `tools`.
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Box<dyn OpsTool>>) -> Self {
        let index = tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.name(), i))
            .collect();
        Self { tools, index }
    }

    /// Build with every tool from `io_ops_tools`.
    pub fn with_defaults() -> Self {
        Self::new(io_ops_tools::tools::all_tools())
    }

    pub fn lookup(&self, name: &str) -> Option<&dyn OpsTool> {
        self.index.get(name).map(|&i| self.tools[i].as_ref())
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext<'_>,
    ) -> ToolResult<String> {
        let tool = self
            .lookup(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(args, ctx).await
    }

    /// Specs handed to the reasoner, in registration order.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
