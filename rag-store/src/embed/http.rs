//! HTTP embedding provider.
//!
//! Talks to an embedding server with a batched JSON API
//! (`POST /api/embed { model, input: [...] } -> { embeddings: [[..]] }`).
//! Transport failures get exactly one retry before surfacing; a wrong
//! dimension in the response is a hard error, never silently accepted.

use super::{EmbeddingsProvider, l2_normalize, normalize_input};
use crate::errors::StoreError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding client for an HTTP model server.
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dim: usize,
}

impl HttpEmbedder {
    /// `url` is the server base, e.g. `http://localhost:11434`.
    pub fn new(url: impl Into<String>, model: impl Into<String>, dim: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            model: model.into(),
            dim,
        }
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let body = serde_json::json!({ "model": self.model, "input": inputs });

        let resp = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Embedding(format!("send: {e}")))?;
        if !resp.status().is_success() {
            return Err(StoreError::Embedding(format!(
                "server returned {}",
                resp.status()
            )));
        }
        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Embedding(format!("decode: {e}")))?;

        if parsed.embeddings.len() != inputs.len() {
            return Err(StoreError::Embedding(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                parsed.embeddings.len()
            )));
        }
        let mut out = parsed.embeddings;
        for v in &mut out {
            if v.len() != self.dim {
                return Err(StoreError::DimensionMismatch {
                    got: v.len(),
                    want: self.dim,
                });
            }
            l2_normalize(v);
        }
        Ok(out)
    }

    async fn request_with_retry(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        match self.request(inputs).await {
            Ok(v) => Ok(v),
            Err(StoreError::DimensionMismatch { got, want }) => {
                Err(StoreError::DimensionMismatch { got, want })
            }
            Err(first) => {
                warn!(
                    target: "rag_store::embed",
                    error = %first,
                    "embedding call failed, retrying once"
                );
                self.request(inputs).await
            }
        }
    }
}

#[async_trait]
impl EmbeddingsProvider for HttpEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let inputs = vec![normalize_input(text)];
        let mut out = self.request_with_retry(&inputs).await?;
        out.pop()
            .ok_or_else(|| StoreError::Embedding("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs: Vec<String> = texts.iter().map(|t| normalize_input(t)).collect();
        debug!(target: "rag_store::embed", count = inputs.len(), model = %self.model, "embedding batch");
        self.request_with_retry(&inputs).await
    }
}
