//! Tools exposed via Model Context Protocol
//!
//! `echo` greets its input; `debug` describes the registry it is invoked from.
//! Input schemas come from the `mcp_tool` parameter structs.

use rust_mcp_sdk::{macros, schema::Tool};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::registry::{Entry, EntryKind, Registry, ToolEntry};

#[macros::mcp_tool(
    name = "echo",
    description = "Echoes the input message, prefixed with \"Hello \""
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoParams {
    pub message: String,
}

#[macros::mcp_tool(
    name = "debug",
    description = "Lists all available MCP method definitions on the server"
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct DebugParams {}

/// Name, description and schema of a tool, taken from its `mcp_tool` parameter struct.
struct Definition {
    name: String,
    description: String,
    input_schema: Value,
}

impl From<Tool> for Definition {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            input_schema: serde_json::to_value(tool.input_schema)
                .unwrap_or_else(|_| json!({ "type": "object" })),
        }
    }
}

fn text_content(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

pub struct EchoTool {
    definition: Definition,
}

impl Default for EchoTool {
    fn default() -> Self {
        Self {
            definition: EchoParams::tool().into(),
        }
    }
}

impl Entry for EchoTool {
    fn key(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn invoke(&self, _registry: &Registry, params: Value) -> Result<Value, AppError> {
        let params: EchoParams = serde_json::from_value(params)
            .map_err(|err| AppError::invalid_params(err.to_string()))?;
        Ok(text_content(format!("Hello {}", params.message)))
    }
}

impl ToolEntry for EchoTool {
    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }
}

pub struct DebugTool {
    definition: Definition,
}

impl Default for DebugTool {
    fn default() -> Self {
        Self {
            definition: DebugParams::tool().into(),
        }
    }
}

impl Entry for DebugTool {
    fn key(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn invoke(&self, registry: &Registry, _params: Value) -> Result<Value, AppError> {
        let mut resources: Vec<String> = registry
            .list(EntryKind::Resource)
            .map(|summary| summary.key)
            .collect();
        resources.sort();

        let describe = |kind: EntryKind| {
            let mut entries: Vec<_> = registry.list(kind).collect();
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            entries
                .into_iter()
                .map(|summary| json!({ "name": summary.name, "description": summary.description }))
                .collect::<Vec<_>>()
        };

        let report = json!({
            "resources": resources,
            "tools": describe(EntryKind::Tool),
            "prompts": describe(EntryKind::Prompt),
        });
        let text = serde_json::to_string_pretty(&report)
            .map_err(|err| AppError::internal(format!("debug report serialization: {err}")))?;

        Ok(text_content(text))
    }
}

impl ToolEntry for DebugTool {
    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }
}
