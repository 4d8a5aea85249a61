//! Manifest tools: tier-1 discovery and tier-2 schemas.

use crate::errors::ToolError;
use crate::manifest;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, ToolRegistry, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

pub struct GetManifestTool;

#[async_trait]
impl Tool for GetManifestTool {
    fn name(&self) -> &'static str {
        "get_manifest"
    }

    fn brief(&self) -> &'static str {
        "Lightweight briefs for every tool: name, category, and 2-3 use cases."
    }

    fn category(&self) -> &'static str {
        "manifest"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Discover available tools", "Keep client context small"]
    }

    fn description(&self) -> &'static str {
        "Tier 1 of the progressive disclosure scheme: a compact map of tool \
         briefs. Fetch full schemas with get_tool_schema only for tools you \
         intend to call."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn examples(&self) -> Vec<Value> {
        vec![json!({}), json!({})]
    }

    async fn execute(&self, _params: Value, _state: &AppState) -> Result<ToolOutput, ToolError> {
        let registry = ToolRegistry::with_builtin();
        let manifest = manifest::tier1(&registry);
        let count = manifest.as_object().map(|m| m.len()).unwrap_or(0);
        Ok(ToolOutput::new(manifest, count))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetToolSchemaParams {
    name: String,
}

pub struct GetToolSchemaTool;

#[async_trait]
impl Tool for GetToolSchemaTool {
    fn name(&self) -> &'static str {
        "get_tool_schema"
    }

    fn brief(&self) -> &'static str {
        "Full input schema and example invocations for one tool, by name."
    }

    fn category(&self) -> &'static str {
        "manifest"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Load a schema before calling", "Inspect example invocations"]
    }

    fn description(&self) -> &'static str {
        "Tier 2 of the progressive disclosure scheme: the complete input \
         schema plus 2-4 example invocations for a single tool."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Tool name from get_manifest" }
            },
            "required": ["name"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![json!({ "name": "search" }), json!({ "name": "ask" })]
    }

    async fn execute(&self, params: Value, _state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: GetToolSchemaParams = parse_params(params)?;
        let registry = ToolRegistry::with_builtin();
        match manifest::tier2(&registry, &params.name) {
            Some(schema) => Ok(ToolOutput::new(schema, 1)),
            None => Err(ToolError::Validation(format!(
                "unknown tool: {}",
                params.name
            ))),
        }
    }
}
