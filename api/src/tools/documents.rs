//! Document-level tools: whole files in, incremental chunk diffs out.

use crate::envelope::EnvelopeError;
use crate::errors::ToolError;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, parse_params};
use async_trait::async_trait;
use rag_store::{ChunkFilter, scroll_all};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentParams {
    /// Normalized project-relative path; also the chunk key prefix.
    file_path: String,
    content: String,
}

fn validate_path(file_path: &str) -> Result<(), ToolError> {
    if file_path.trim().is_empty() {
        return Err(ToolError::Validation("file_path cannot be empty".to_string()));
    }
    if rag_indexer::is_unresolvable(file_path) {
        return Err(ToolError::Validation(format!(
            "file_path must be project-relative: {file_path}"
        )));
    }
    Ok(())
}

async fn index_document(
    state: &AppState,
    file_path: &str,
    content: &str,
) -> Result<ToolOutput, ToolError> {
    let store = state.primary();
    store.ensure_collection(state.embedder.dim()).await?;
    let indexer = state.indexer_for(store);
    let report = indexer.index_content(file_path, content).await?;
    // The lexical corpus is stale after any write.
    state.pipeline.retriever().invalidate_lexicon().await;

    let errors: Vec<EnvelopeError> = report
        .failed
        .iter()
        .map(|(target, msg)| EnvelopeError {
            code: "VECTOR_STORE_UNAVAILABLE",
            message: msg.clone(),
            details: Some(json!({ "target": target })),
            suggestions: Vec::new(),
        })
        .collect();
    let count = report.upserted + report.recovered;
    Ok(ToolOutput {
        data: json!(report),
        count,
        errors,
    })
}

// ─── add_document / update_document ─────────────────────────────────────

pub struct AddDocumentTool;

#[async_trait]
impl Tool for AddDocumentTool {
    fn name(&self) -> &'static str {
        "add_document"
    }

    fn brief(&self) -> &'static str {
        "Chunk and index a whole document (markdown or code) under its project-relative path."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Index a file without touching disk", "Push generated docs"]
    }

    fn description(&self) -> &'static str {
        "Runs the same structure-aware chunking as the indexer (markdown by \
         section/list/table/fence, code by function) and upserts the result \
         incrementally: unchanged chunks are skipped, vanished ones \
         soft-deleted."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Project-relative path; the extension picks the chunker" },
                "content": { "type": "string" }
            },
            "required": ["file_path", "content"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "file_path": "docs/a.md", "content": "# Title\n## Features\n1. Alpha" }),
            json!({ "file_path": "src/x.py", "content": "def greet():\n    return \"hi\"" }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: DocumentParams = parse_params(params)?;
        validate_path(&params.file_path)?;
        index_document(state, &params.file_path, &params.content).await
    }
}

pub struct UpdateDocumentTool;

#[async_trait]
impl Tool for UpdateDocumentTool {
    fn name(&self) -> &'static str {
        "update_document"
    }

    fn brief(&self) -> &'static str {
        "Re-index a changed document; only chunks whose content changed are rewritten."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Apply an edit to an indexed file", "Sync after a save"]
    }

    fn description(&self) -> &'static str {
        "Identical mechanics to add_document; the incremental diff makes the \
         two interchangeable. Kept as a separate name so clients can express \
         intent."
    }

    fn input_schema(&self) -> Value {
        AddDocumentTool.input_schema()
    }

    fn examples(&self) -> Vec<Value> {
        vec![json!({ "file_path": "docs/a.md", "content": "# Title\n## Features\n1. Alpha\n2. Bravo" })]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: DocumentParams = parse_params(params)?;
        validate_path(&params.file_path)?;
        index_document(state, &params.file_path, &params.content).await
    }
}

// ─── delete_document ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeleteDocumentParams {
    file_path: String,
    #[serde(default = "default_true")]
    soft_delete: bool,
    #[serde(default)]
    dry_run: bool,
}

fn default_true() -> bool {
    true
}

pub struct DeleteDocumentTool;

#[async_trait]
impl Tool for DeleteDocumentTool {
    fn name(&self) -> &'static str {
        "delete_document"
    }

    fn brief(&self) -> &'static str {
        "Delete every chunk of a document: soft-delete by default, hard delete or dry_run on request."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Retire a removed file", "Preview a document deletion"]
    }

    fn description(&self) -> &'static str {
        "Soft delete hides the document's chunks from search but keeps them \
         recoverable; soft_delete=false removes them physically. dry_run \
         reports the affected chunk count without writing."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "soft_delete": { "type": "boolean", "default": true },
                "dry_run": { "type": "boolean", "default": false }
            },
            "required": ["file_path"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "file_path": "docs/a.md", "dry_run": true }),
            json!({ "file_path": "docs/a.md" }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: DeleteDocumentParams = parse_params(params)?;
        validate_path(&params.file_path)?;
        let store = state.primary();
        let filter = ChunkFilter::for_file(params.file_path.clone());

        if params.dry_run {
            let points = scroll_all(store.as_ref(), &filter).await?;
            let count = points.len();
            return Ok(ToolOutput::new(
                json!({ "dry_run": true, "would_affect": count }),
                count,
            ));
        }

        let output = if params.soft_delete {
            let touched = store.soft_delete(&filter).await?;
            ToolOutput::new(json!({ "soft_deleted": touched }), touched)
        } else {
            let points = scroll_all(store.as_ref(), &filter).await?;
            let ids: Vec<u64> = points.iter().map(|p| p.id).collect();
            let report = store.delete_by_ids(&ids).await?;
            let count = report.succeeded.len();
            ToolOutput::new(json!({ "deleted": count }), count)
        };
        state.pipeline.retriever().invalidate_lexicon().await;
        Ok(output)
    }
}

// ─── get_document ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetDocumentParams {
    file_path: String,
    #[serde(default)]
    include_deleted: bool,
}

pub struct GetDocumentTool;

#[async_trait]
impl Tool for GetDocumentTool {
    fn name(&self) -> &'static str {
        "get_document"
    }

    fn brief(&self) -> &'static str {
        "All stored chunks of one document in line order, optionally including soft-deleted ones."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Inspect how a file was chunked", "Audit deleted chunks"]
    }

    fn description(&self) -> &'static str {
        "Scrolls every chunk whose file_path matches, sorted by line_start. An \
         unknown path yields an empty success, not an error."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string" },
                "include_deleted": { "type": "boolean", "default": false }
            },
            "required": ["file_path"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "file_path": "docs/a.md" }),
            json!({ "file_path": "docs/a.md", "include_deleted": true }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: GetDocumentParams = parse_params(params)?;
        validate_path(&params.file_path)?;
        let store = state.primary();
        let mut filter = ChunkFilter::for_file(params.file_path);
        filter.include_deleted = params.include_deleted;

        let mut points = scroll_all(store.as_ref(), &filter).await?;
        points.sort_by_key(|p| p.payload.line_start);
        let chunks: Vec<Value> = points
            .iter()
            .map(|p| json!({ "id": p.id, "payload": p.payload }))
            .collect();
        let count = chunks.len();
        Ok(ToolOutput::new(json!({ "chunks": chunks }), count))
    }
}
