//! Tool trait and registry.
//!
//! Each tool declares its own brief (tier 1), schema and examples (tier 2),
//! and execution (tier 3). The registry wraps execution in the uniform
//! envelope with timing.

pub mod ask;
pub mod documents;
pub mod explain;
pub mod manifest_tools;
pub mod search;
pub mod vector_crud;

use crate::envelope::{Envelope, EnvelopeError};
use crate::errors::ToolError;
use crate::state::AppState;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Result payload of a tool run; the registry adds envelope metadata.
pub struct ToolOutput {
    pub data: Value,
    pub count: usize,
    /// Per-id failures for batch tools; non-empty flips `success` to false.
    pub errors: Vec<EnvelopeError>,
}

impl ToolOutput {
    pub fn new(data: Value, count: usize) -> Self {
        Self {
            data,
            count,
            errors: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    /// Tier-1 brief, budgeted at roughly 50 tokens.
    fn brief(&self) -> &'static str;
    fn category(&self) -> &'static str;
    fn use_cases(&self) -> &'static [&'static str];
    /// Tier-2 long description.
    fn description(&self) -> &'static str;
    /// Tier-2 JSON input schema.
    fn input_schema(&self) -> Value;
    /// Tier-2 example invocations (2..4 per tool).
    fn examples(&self) -> Vec<Value>;

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError>;
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The full built-in tool surface; names are the external contract.
    pub fn with_builtin() -> Self {
        Self {
            tools: vec![
                Box::new(search::SearchTool),
                Box::new(ask::AskTool),
                Box::new(explain::ExplainTool),
                Box::new(vector_crud::AddPointsTool),
                Box::new(vector_crud::UpdatePointsTool),
                Box::new(vector_crud::DeletePointsTool),
                Box::new(vector_crud::GetPointsTool),
                Box::new(vector_crud::QueryPointsTool),
                Box::new(vector_crud::GetCollectionStatsTool),
                Box::new(documents::AddDocumentTool),
                Box::new(documents::UpdateDocumentTool),
                Box::new(documents::DeleteDocumentTool),
                Box::new(documents::GetDocumentTool),
                Box::new(manifest_tools::GetManifestTool),
                Box::new(manifest_tools::GetToolSchemaTool),
            ],
        }
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Runs a tool and wraps the outcome in the envelope. Tool errors become
    /// failure envelopes, never transport errors.
    pub async fn execute_enveloped(
        &self,
        name: &str,
        params: Value,
        state: &AppState,
    ) -> Envelope {
        let started = Instant::now();
        let Some(tool) = self.find(name) else {
            return Envelope::failure(
                name.to_string(),
                Value::Null,
                0,
                started.elapsed().as_millis() as u64,
                vec![EnvelopeError {
                    code: "VALIDATION_ERROR",
                    message: format!("unknown tool: {name}"),
                    details: None,
                    suggestions: vec!["list available tools with get_manifest".to_string()],
                }],
            );
        };

        debug!(target: "api::tools", tool = name, "executing");
        match tool.execute(params, state).await {
            Ok(output) => {
                let timing = started.elapsed().as_millis() as u64;
                if output.errors.is_empty() {
                    Envelope::success(name.to_string(), output.data, output.count, timing)
                } else {
                    Envelope::failure(
                        name.to_string(),
                        output.data,
                        output.count,
                        timing,
                        output.errors,
                    )
                }
            }
            Err(e) => {
                warn!(target: "api::tools", tool = name, error = %e, "tool failed");
                Envelope::failure(
                    name.to_string(),
                    Value::Null,
                    0,
                    started.elapsed().as_millis() as u64,
                    vec![EnvelopeError::from_tool_error(&e)],
                )
            }
        }
    }
}

/// Typed deserialization of tool parameters with a uniform validation error.
pub(crate) fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    serde_json::from_value(params).map_err(|e| ToolError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_retrieval::NoopReranker;
    use rag_store::{ChunkStore, HashEmbedder, MemoryStore, point_id};
    use serde_json::json;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let config: rag_config::Config = serde_json::from_value(json!({
            "project_root": ".",
            "local_qdrant": { "url": "http://localhost:6334", "collection": "test_local" }
        }))
        .expect("test config");
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryStore::new("test_local"));
        AppState::new(
            config,
            None,
            Some(store),
            Arc::new(HashEmbedder::new(32)),
            Arc::new(NoopReranker),
        )
        .expect("test state")
    }

    #[tokio::test]
    async fn unknown_tool_yields_a_validation_failure_envelope() {
        let state = test_state();
        let registry = ToolRegistry::with_builtin();
        let envelope = registry
            .execute_enveloped("frobnicate", json!({}), &state)
            .await;
        assert!(!envelope.success);
        assert_eq!(envelope.errors[0].code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_search_is_success_with_zero_count() {
        let state = test_state();
        let registry = ToolRegistry::with_builtin();
        let envelope = registry
            .execute_enveloped("search", json!({ "query": "anything at all" }), &state)
            .await;
        assert!(envelope.success);
        assert_eq!(envelope.metadata.count, 0);
        assert_eq!(envelope.metadata.operation, "search");
    }

    #[tokio::test]
    async fn get_points_reports_missing_ids_as_partial_failure() {
        let state = test_state();
        let registry = ToolRegistry::with_builtin();

        let added = registry
            .execute_enveloped(
                "add_points",
                json!({ "points": [{
                    "content": "The default port is 6334.",
                    "file_path": "docs/ports.md",
                    "line_start": 1,
                    "line_end": 1
                }]}),
                &state,
            )
            .await;
        assert!(added.success);

        let real_id = point_id("docs/ports.md", 1);
        let envelope = registry
            .execute_enveloped("get_points", json!({ "ids": [real_id, 42] }), &state)
            .await;
        assert!(!envelope.success);
        assert_eq!(envelope.metadata.count, 1);
        assert_eq!(envelope.errors.len(), 1);
        assert_eq!(envelope.errors[0].code, "POINT_NOT_FOUND");
        assert_eq!(envelope.data["points"][0]["id"], real_id);
    }

    #[tokio::test]
    async fn add_document_then_ask_returns_the_reconstructed_list() {
        let state = test_state();
        let registry = ToolRegistry::with_builtin();

        let indexed = registry
            .execute_enveloped(
                "add_document",
                json!({
                    "file_path": "docs/a.md",
                    "content": "# Title\n## Features\n1. Alpha\n2. Beta\n3. Gamma\n"
                }),
                &state,
            )
            .await;
        assert!(indexed.success);

        let envelope = registry
            .execute_enveloped("ask", json!({ "question": "list the features" }), &state)
            .await;
        assert!(envelope.success);
        let answer = envelope.data["answer"].as_str().unwrap();
        assert!(answer.contains("1. Alpha"));
        assert!(answer.contains("3. Gamma"));
        assert!(answer.contains("Complete (1..3)"));
        assert_eq!(envelope.data["citations"][0]["file_path"], "docs/a.md");
    }

    #[tokio::test]
    async fn delete_document_then_search_excludes_it_until_recovery() {
        let state = test_state();
        let registry = ToolRegistry::with_builtin();
        registry
            .execute_enveloped(
                "add_document",
                json!({ "file_path": "docs/a.md", "content": "# Title\npayment capture notes\n" }),
                &state,
            )
            .await;

        let deleted = registry
            .execute_enveloped("delete_document", json!({ "file_path": "docs/a.md" }), &state)
            .await;
        assert!(deleted.success);

        let stats = registry
            .execute_enveloped("get_collection_stats", json!({}), &state)
            .await;
        assert!(stats.success);
        assert_eq!(stats.data["test_local"]["deleted"], 1);

        let search = registry
            .execute_enveloped("search", json!({ "query": "payment capture" }), &state)
            .await;
        assert_eq!(search.metadata.count, 0);
    }
}
