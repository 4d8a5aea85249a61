//! Vector CRUD tools over the primary collection.
//!
//! Multi-id operations are atomic per id only; partial success is reported
//! with per-id errors and the successful ids in `data`.

use crate::envelope::EnvelopeError;
use crate::errors::ToolError;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, parse_params};
use async_trait::async_trait;
use rag_store::{
    Chunk, ChunkFilter, ChunkPayload, ChunkPoint, CodeType, ContentType, MAX_BATCH, StoredPoint,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashSet;

fn content_type_from(value: Option<&str>) -> Result<ContentType, ToolError> {
    match value.unwrap_or("text") {
        "text" => Ok(ContentType::Text),
        "list" => Ok(ContentType::List),
        "table" => Ok(ContentType::Table),
        "code" => Ok(ContentType::Code),
        other => Err(ToolError::Validation(format!(
            "unknown content_type: {other}"
        ))),
    }
}

fn code_type_from(value: &str) -> Result<CodeType, ToolError> {
    match value {
        "function" => Ok(CodeType::Function),
        "method" => Ok(CodeType::Method),
        "class" => Ok(CodeType::Class),
        "module" => Ok(CodeType::Module),
        other => Err(ToolError::Validation(format!("unknown code_type: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PointSpec {
    content: String,
    file_path: String,
    line_start: u32,
    line_end: u32,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    code_type: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    class_name: Option<String>,
}

impl PointSpec {
    fn into_chunk(self) -> Result<Chunk, ToolError> {
        if self.content.trim().is_empty() {
            return Err(ToolError::Validation("content cannot be empty".to_string()));
        }
        if self.file_path.trim().is_empty() {
            return Err(ToolError::Validation("file_path cannot be empty".to_string()));
        }
        if self.line_start == 0 || self.line_start > self.line_end {
            return Err(ToolError::Validation(format!(
                "invalid line range {}..{} (lines are 1-based, start <= end)",
                self.line_start, self.line_end
            )));
        }
        let content_type = content_type_from(self.content_type.as_deref())?;
        let code_type = self.code_type.as_deref().map(code_type_from).transpose()?;
        Ok(Chunk::from_payload(ChunkPayload {
            content: self.content,
            file_path: self.file_path,
            line_start: self.line_start,
            line_end: self.line_end,
            content_type,
            language: self.language,
            section: self.section,
            doc_type: None,
            code_type,
            name: self.name,
            class_name: self.class_name,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        }))
    }
}

fn point_json(p: &StoredPoint) -> Value {
    let mut value = json!({
        "id": p.id,
        "payload": p.payload,
    });
    if let Some(vector) = &p.vector {
        value["vector"] = json!(vector);
    }
    value
}

async fn embed_and_upsert(
    state: &AppState,
    chunks: Vec<Chunk>,
) -> Result<ToolOutput, ToolError> {
    let store = state.primary();
    store.ensure_collection(state.embedder.dim()).await?;

    let texts: Vec<String> = chunks.iter().map(|c| c.payload.content.clone()).collect();
    let vectors = state
        .embedder
        .embed_batch(&texts)
        .await
        .map_err(|e| ToolError::EmbedFailed(e.to_string()))?;
    let points: Vec<ChunkPoint> = chunks
        .into_iter()
        .zip(vectors)
        .map(|(chunk, vector)| ChunkPoint { chunk, vector })
        .collect();

    let report = store.upsert(points).await?;
    // The lexical corpus is stale after any write.
    state.pipeline.retriever().invalidate_lexicon().await;
    let errors: Vec<EnvelopeError> = report
        .failed
        .iter()
        .map(|(id, msg)| EnvelopeError::per_id("VECTOR_STORE_UNAVAILABLE", *id, msg.clone()))
        .collect();
    let count = report.succeeded.len();
    Ok(ToolOutput {
        data: json!({ "succeeded": report.succeeded }),
        count,
        errors,
    })
}

// ─── add_points ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AddPointsParams {
    points: Vec<PointSpec>,
}

pub struct AddPointsTool;

#[async_trait]
impl Tool for AddPointsTool {
    fn name(&self) -> &'static str {
        "add_points"
    }

    fn brief(&self) -> &'static str {
        "Store new chunks with auto-computed embeddings and deterministic ids. Returns the ids written."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Index custom content", "Store test fixtures"]
    }

    fn description(&self) -> &'static str {
        "Embeds each point's content and upserts it under the id derived from \
         (file_path, line_start). Batches above 1000 points are rejected; \
         partial failures are reported per id."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "points": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": { "type": "string" },
                            "file_path": { "type": "string" },
                            "line_start": { "type": "integer", "minimum": 1 },
                            "line_end": { "type": "integer", "minimum": 1 },
                            "content_type": { "type": "string", "enum": ["text", "list", "table", "code"] },
                            "language": { "type": "string" },
                            "section": { "type": "string" },
                            "code_type": { "type": "string", "enum": ["function", "method", "class", "module"] },
                            "name": { "type": "string" },
                            "class_name": { "type": "string" }
                        },
                        "required": ["content", "file_path", "line_start", "line_end"]
                    }
                }
            },
            "required": ["points"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "points": [{ "content": "# Notes", "file_path": "notes.md", "line_start": 1, "line_end": 1 }] }),
            json!({ "points": [{ "content": "def f(): pass", "file_path": "src/f.py", "line_start": 1, "line_end": 1, "content_type": "code", "language": "python" }] }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: AddPointsParams = parse_params(params)?;
        if params.points.is_empty() {
            return Err(ToolError::Validation("points cannot be empty".to_string()));
        }
        if params.points.len() > MAX_BATCH {
            return Err(ToolError::BatchLimitExceeded {
                got: params.points.len(),
                cap: MAX_BATCH,
            });
        }
        let chunks: Vec<Chunk> = params
            .points
            .into_iter()
            .map(PointSpec::into_chunk)
            .collect::<Result<_, _>>()?;
        embed_and_upsert(state, chunks).await
    }
}

// ─── update_points ──────────────────────────────────────────────────────

pub struct UpdatePointsTool;

#[async_trait]
impl Tool for UpdatePointsTool {
    fn name(&self) -> &'static str {
        "update_points"
    }

    fn brief(&self) -> &'static str {
        "Re-embed and overwrite existing chunks in place. Unknown ids are reported per id."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Correct stored content", "Refresh metadata"]
    }

    fn description(&self) -> &'static str {
        "Like add_points, but every target must already exist: ids are derived \
         from (file_path, line_start) and checked first. Missing ids produce \
         POINT_NOT_FOUND entries; the rest are overwritten."
    }

    fn input_schema(&self) -> Value {
        AddPointsTool.input_schema()
    }

    fn examples(&self) -> Vec<Value> {
        vec![json!({ "points": [{ "content": "updated text", "file_path": "notes.md", "line_start": 1, "line_end": 1 }] })]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: AddPointsParams = parse_params(params)?;
        if params.points.is_empty() {
            return Err(ToolError::Validation("points cannot be empty".to_string()));
        }
        if params.points.len() > MAX_BATCH {
            return Err(ToolError::BatchLimitExceeded {
                got: params.points.len(),
                cap: MAX_BATCH,
            });
        }
        let chunks: Vec<Chunk> = params
            .points
            .into_iter()
            .map(PointSpec::into_chunk)
            .collect::<Result<_, _>>()?;

        let store = state.primary();
        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        let existing: HashSet<u64> = store
            .get_points(&ids, false)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let (known, missing): (Vec<Chunk>, Vec<Chunk>) = chunks
            .into_iter()
            .partition(|c| existing.contains(&c.id));
        let mut output = if known.is_empty() {
            ToolOutput::new(json!({ "succeeded": [] }), 0)
        } else {
            embed_and_upsert(state, known).await?
        };
        for chunk in missing {
            output.errors.push(EnvelopeError::per_id(
                "POINT_NOT_FOUND",
                chunk.id,
                format!(
                    "no stored point for {}:{}",
                    chunk.payload.file_path, chunk.payload.line_start
                ),
            ));
        }
        Ok(output)
    }
}

// ─── delete_points ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeletePointsParams {
    ids: Vec<u64>,
    #[serde(default = "default_true")]
    soft_delete: bool,
    #[serde(default)]
    dry_run: bool,
}

fn default_true() -> bool {
    true
}

pub struct DeletePointsTool;

#[async_trait]
impl Tool for DeletePointsTool {
    fn name(&self) -> &'static str {
        "delete_points"
    }

    fn brief(&self) -> &'static str {
        "Delete chunks by id: soft-delete by default (recoverable), hard delete on request, dry_run preview."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Remove outdated chunks", "Preview a deletion"]
    }

    fn description(&self) -> &'static str {
        "Soft delete flips is_deleted in place and keeps the point recoverable; \
         soft_delete=false removes points physically. dry_run reports what \
         would be affected without writing."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": { "type": "array", "items": { "type": "integer" } },
                "soft_delete": { "type": "boolean", "default": true },
                "dry_run": { "type": "boolean", "default": false }
            },
            "required": ["ids"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "ids": [1234], "dry_run": true }),
            json!({ "ids": [1234, 5678] }),
            json!({ "ids": [1234], "soft_delete": false }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: DeletePointsParams = parse_params(params)?;
        if params.ids.is_empty() {
            return Err(ToolError::Validation("ids cannot be empty".to_string()));
        }
        if params.ids.len() > MAX_BATCH {
            return Err(ToolError::BatchLimitExceeded {
                got: params.ids.len(),
                cap: MAX_BATCH,
            });
        }
        let store = state.primary();

        if params.dry_run {
            let found: Vec<u64> = store
                .get_points(&params.ids, false)
                .await?
                .into_iter()
                .map(|p| p.id)
                .collect();
            let count = found.len();
            return Ok(ToolOutput::new(
                json!({ "dry_run": true, "soft_delete": params.soft_delete, "would_affect": found }),
                count,
            ));
        }

        if params.soft_delete {
            let touched = store.soft_delete_ids(&params.ids).await?;
            state.pipeline.retriever().invalidate_lexicon().await;
            Ok(ToolOutput::new(
                json!({ "soft_deleted": touched }),
                touched,
            ))
        } else {
            let report = store.delete_by_ids(&params.ids).await?;
            state.pipeline.retriever().invalidate_lexicon().await;
            let errors: Vec<EnvelopeError> = report
                .failed
                .iter()
                .map(|(id, msg)| {
                    EnvelopeError::per_id("VECTOR_STORE_UNAVAILABLE", *id, msg.clone())
                })
                .collect();
            let count = report.succeeded.len();
            Ok(ToolOutput {
                data: json!({ "deleted": report.succeeded }),
                count,
                errors,
            })
        }
    }
}

// ─── get_points ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GetPointsParams {
    ids: Vec<u64>,
    #[serde(default)]
    with_vectors: bool,
}

pub struct GetPointsTool;

#[async_trait]
impl Tool for GetPointsTool {
    fn name(&self) -> &'static str {
        "get_points"
    }

    fn brief(&self) -> &'static str {
        "Fetch stored chunks by id, optionally with vectors. Missing ids are reported per id."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Inspect a stored chunk", "Verify an upsert"]
    }

    fn description(&self) -> &'static str {
        "Bulk retrieval by id. Found points are returned with payloads (and \
         vectors when with_vectors is set); a missing id is a non-fatal \
         POINT_NOT_FOUND entry in the errors array."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ids": { "type": "array", "items": { "type": "integer" } },
                "with_vectors": { "type": "boolean", "default": false }
            },
            "required": ["ids"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "ids": [1234] }),
            json!({ "ids": [1234, 5678], "with_vectors": true }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: GetPointsParams = parse_params(params)?;
        if params.ids.is_empty() {
            return Err(ToolError::Validation("ids cannot be empty".to_string()));
        }
        let store = state.primary();
        let found = store.get_points(&params.ids, params.with_vectors).await?;
        let found_ids: HashSet<u64> = found.iter().map(|p| p.id).collect();

        let errors: Vec<EnvelopeError> = params
            .ids
            .iter()
            .filter(|id| !found_ids.contains(id))
            .map(|id| EnvelopeError::per_id("POINT_NOT_FOUND", *id, format!("point {id} not found")))
            .collect();
        let points: Vec<Value> = found.iter().map(point_json).collect();
        let count = points.len();
        Ok(ToolOutput {
            data: json!({ "points": points }),
            count,
            errors,
        })
    }
}

// ─── query_points ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct QueryFilterParams {
    #[serde(default)]
    file_path: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    include_deleted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryPointsParams {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
    #[serde(default = "default_query_top_k")]
    top_k: usize,
    #[serde(default)]
    filter: QueryFilterParams,
}

fn default_query_top_k() -> usize {
    10
}

pub struct QueryPointsTool;

#[async_trait]
impl Tool for QueryPointsTool {
    fn name(&self) -> &'static str {
        "query_points"
    }

    fn brief(&self) -> &'static str {
        "Raw vector similarity search with exact-match payload filters. No reranking or expansion."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Filtered nearest-neighbor lookup", "Debug stored vectors"]
    }

    fn description(&self) -> &'static str {
        "Searches the primary collection by a query text (embedded on the fly) \
         or a raw vector, under an exact-match filter over file_path, section, \
         language, and content_type. Deleted points stay hidden unless \
         include_deleted is set."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Text to embed and search with" },
                "vector": { "type": "array", "items": { "type": "number" }, "description": "Raw query vector" },
                "top_k": { "type": "integer", "minimum": 1, "default": 10 },
                "filter": {
                    "type": "object",
                    "properties": {
                        "file_path": { "type": "string" },
                        "section": { "type": "string" },
                        "language": { "type": "string" },
                        "content_type": { "type": "string", "enum": ["text", "list", "table", "code"] },
                        "include_deleted": { "type": "boolean", "default": false }
                    }
                }
            }
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "query": "payment capture", "top_k": 5 }),
            json!({ "query": "retry policy", "filter": { "file_path": "docs/flows.md" } }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: QueryPointsParams = parse_params(params)?;
        let vector = match (&params.query, params.vector) {
            (Some(query), None) => state
                .embedder
                .embed(query)
                .await
                .map_err(|e| ToolError::EmbedFailed(e.to_string()))?,
            (None, Some(vector)) => vector,
            _ => {
                return Err(ToolError::Validation(
                    "exactly one of query / vector is required".to_string(),
                ));
            }
        };

        let filter = ChunkFilter {
            file_path: params.filter.file_path,
            section: params.filter.section,
            language: params.filter.language,
            content_type: params
                .filter
                .content_type
                .as_deref()
                .map(|ct| content_type_from(Some(ct)))
                .transpose()?,
            include_deleted: params.filter.include_deleted,
            only_deleted: false,
        };

        let store = state.primary();
        let hits = store.vector_search(&vector, &filter, params.top_k).await?;
        let results: Vec<Value> = hits
            .iter()
            .map(|h| {
                let mut v = point_json(&h.point);
                v["score"] = json!(h.score);
                v
            })
            .collect();
        let count = results.len();
        Ok(ToolOutput::new(json!({ "results": results }), count))
    }
}

// ─── get_collection_stats ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StatsParams {}

pub struct GetCollectionStatsTool;

#[async_trait]
impl Tool for GetCollectionStatsTool {
    fn name(&self) -> &'static str {
        "get_collection_stats"
    }

    fn brief(&self) -> &'static str {
        "Point counts per configured collection, split into active and soft-deleted."
    }

    fn category(&self) -> &'static str {
        "vector_database"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Check index health", "Verify a cleanup run"]
    }

    fn description(&self) -> &'static str {
        "Returns { active, deleted } counts for every configured collection \
         (cloud and local), keyed by collection name."
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn examples(&self) -> Vec<Value> {
        vec![json!({})]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let _: StatsParams = parse_params(params.is_null().then(|| json!({})).unwrap_or(params))?;
        let mut data = serde_json::Map::new();
        let mut count = 0usize;
        for store in state.stores() {
            let stats = store.stats().await?;
            count += stats.active + stats.deleted;
            data.insert(store.collection().to_string(), json!(stats));
        }
        Ok(ToolOutput::new(Value::Object(data), count))
    }
}
