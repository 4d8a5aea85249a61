//! Cross-encoder reranking of the candidate pool.
//!
//! The provider scores each (query, chunk) pair fresh; the hybrid score is
//! replaced by the rerank score. A provider failure falls back to the
//! incoming hybrid order, truncated, so retrieval never hard-fails on the
//! reranker.

use crate::errors::RetrievalError;
use crate::retriever::RetrievedChunk;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[async_trait]
pub trait Reranker: Send + Sync {
    fn model(&self) -> &str;

    /// Returns the top `top_k` candidates in descending rerank score.
    /// An empty pool returns empty.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError>;
}

/// Bypass used when reranking is disabled in configuration: keeps the
/// incoming hybrid order.
pub struct NoopReranker;

#[async_trait]
impl Reranker for NoopReranker {
    fn model(&self) -> &str {
        "noop"
    }

    async fn rerank(
        &self,
        _query: &str,
        mut candidates: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        candidates.truncate(top_k);
        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    scores: Vec<f32>,
}

/// Cross-encoder scoring over HTTP
/// (`POST /api/rerank { model, query, documents } -> { scores }`).
pub struct HttpCrossEncoder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl HttpCrossEncoder {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
        }
    }

    async fn score(
        &self,
        query: &str,
        documents: &[&str],
    ) -> Result<Vec<f32>, RetrievalError> {
        let endpoint = format!("{}/api/rerank", self.url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "query": query,
            "documents": documents,
        });
        let resp = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::Rerank(format!("send: {e}")))?;
        if !resp.status().is_success() {
            return Err(RetrievalError::Rerank(format!(
                "server returned {}",
                resp.status()
            )));
        }
        let parsed: RerankResponse = resp
            .json()
            .await
            .map_err(|e| RetrievalError::Rerank(format!("decode: {e}")))?;
        if parsed.scores.len() != documents.len() {
            return Err(RetrievalError::Rerank(format!(
                "expected {} scores, got {}",
                documents.len(),
                parsed.scores.len()
            )));
        }
        Ok(parsed.scores)
    }
}

#[async_trait]
impl Reranker for HttpCrossEncoder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = candidates.iter().map(|c| c.payload.content.as_str()).collect();
        match self.score(query, &documents).await {
            Ok(scores) => {
                for (candidate, score) in candidates.iter_mut().zip(scores) {
                    candidate.score = score;
                }
                candidates.sort_by(|a, b| {
                    b.score
                        .partial_cmp(&a.score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.id.cmp(&b.id))
                });
                candidates.truncate(top_k);
                debug!(
                    target: "rag_retrieval::reranker",
                    model = %self.model,
                    kept = candidates.len(),
                    "reranked pool"
                );
                Ok(candidates)
            }
            Err(e) => {
                // Degrade to the hybrid order rather than failing the query.
                warn!(
                    target: "rag_retrieval::reranker",
                    error = %e,
                    "rerank failed, falling back to hybrid order"
                );
                candidates.truncate(top_k);
                Ok(candidates)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{Chunk, ChunkPayload, ContentType};

    fn candidate(id_line: u32, score: f32) -> RetrievedChunk {
        let chunk = Chunk::from_payload(ChunkPayload {
            content: format!("content {id_line}"),
            file_path: "docs/a.md".to_string(),
            line_start: id_line,
            line_end: id_line,
            content_type: ContentType::Text,
            language: None,
            section: None,
            doc_type: None,
            code_type: None,
            name: None,
            class_name: None,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        });
        RetrievedChunk {
            id: chunk.id,
            score,
            vector_score: score,
            payload: chunk.payload,
            collection: "local".to_string(),
        }
    }

    #[tokio::test]
    async fn noop_keeps_order_and_truncates() {
        let pool = vec![candidate(1, 0.9), candidate(2, 0.8), candidate(3, 0.7)];
        let out = NoopReranker.rerank("q", pool, 2).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].score >= out[1].score);
    }

    #[tokio::test]
    async fn empty_pool_stays_empty() {
        let out = NoopReranker.rerank("q", Vec::new(), 10).await.unwrap();
        assert!(out.is_empty());
    }
}
