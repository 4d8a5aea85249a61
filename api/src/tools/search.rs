//! `search`: classified hybrid retrieval returning raw scored chunks.

use crate::errors::ToolError;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, parse_params};
use async_trait::async_trait;
use rag_retrieval::{RetrievedChunk, SearchOverrides};
use rag_store::ContentType;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchParams {
    query: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
}

fn parse_content_type(value: &str) -> Result<ContentType, ToolError> {
    match value {
        "text" => Ok(ContentType::Text),
        "list" => Ok(ContentType::List),
        "table" => Ok(ContentType::Table),
        "code" => Ok(ContentType::Code),
        other => Err(ToolError::Validation(format!(
            "unknown content_type: {other}"
        ))),
    }
}

pub(crate) fn chunk_json(chunk: &RetrievedChunk) -> Value {
    json!({
        "id": chunk.id,
        "score": chunk.score,
        "vector_score": chunk.vector_score,
        "collection": chunk.collection,
        "content": chunk.payload.content,
        "file_path": chunk.payload.file_path,
        "line_start": chunk.payload.line_start,
        "line_end": chunk.payload.line_end,
        "content_type": chunk.payload.content_type,
        "language": chunk.payload.language,
        "section": chunk.payload.section,
        "code_type": chunk.payload.code_type,
        "name": chunk.payload.name,
        "class_name": chunk.payload.class_name,
    })
}

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        "search"
    }

    fn brief(&self) -> &'static str {
        "Hybrid semantic + keyword search over indexed docs and code. Returns scored chunks with locations."
    }

    fn category(&self) -> &'static str {
        "search"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Find relevant documentation", "Locate code by description"]
    }

    fn description(&self) -> &'static str {
        "Classifies the query intent, runs hybrid (vector + BM25) retrieval with \
         optional section expansion, reranks, and returns the raw chunks with \
         scores. Use content_type/language/top_k to narrow the result set."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query text" },
                "content_type": {
                    "type": "string",
                    "enum": ["text", "list", "table", "code"],
                    "description": "Restrict to one content type"
                },
                "language": { "type": "string", "description": "Restrict to one language" },
                "top_k": { "type": "integer", "minimum": 1, "description": "Result count override" }
            },
            "required": ["query"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "query": "how does incremental indexing work" }),
            json!({ "query": "greet function", "content_type": "code", "top_k": 3 }),
            json!({ "query": "checkout flow", "language": "markdown" }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: SearchParams = parse_params(params)?;
        if params.query.trim().is_empty() {
            return Err(ToolError::Validation("query cannot be empty".to_string()));
        }
        let overrides = SearchOverrides {
            content_type: params
                .content_type
                .as_deref()
                .map(parse_content_type)
                .transpose()?,
            language: params.language,
            top_k: params.top_k,
        };

        let (analysis, chunks) = state
            .pipeline
            .search(&params.query, state.search_top_k(), overrides)
            .await?;

        let results: Vec<Value> = chunks.iter().map(chunk_json).collect();
        let count = results.len();
        Ok(ToolOutput::new(
            json!({
                "intent": analysis.intent,
                "confidence": analysis.confidence,
                "results": results,
            }),
            count,
        ))
    }
}
