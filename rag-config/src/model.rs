//! Configuration record.
//!
//! A single strict JSON object: unknown keys are rejected at load time and
//! every optional key has a listed default. Re-reads require a process
//! restart.

use crate::errors::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

/// One Qdrant endpoint ("cloud" or "local"); both share this shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QdrantSection {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub collection: String,
    /// Seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl QdrantSection {
    pub fn endpoint(&self) -> rag_store::QdrantEndpoint {
        rag_store::QdrantEndpoint {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            collection: self.collection.clone(),
            timeout: Duration::from_secs(self.timeout),
            retry_attempts: self.retry_attempts,
        }
    }
}

fn default_doc_model() -> String {
    "all-minilm".to_string()
}

fn default_rerank_model() -> String {
    "ms-marco-minilm".to_string()
}

fn default_embedding_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_dim() -> usize {
    384
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingModels {
    #[serde(default = "default_doc_model")]
    pub doc: String,
    #[serde(default = "default_doc_model")]
    pub code: String,
    #[serde(default = "default_rerank_model")]
    pub reranking: String,
    /// Model server base URL for embedding and reranking calls.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,
    /// Output dimension of the (single) embedding model.
    #[serde(default = "default_dim")]
    pub dim: usize,
}

impl Default for EmbeddingModels {
    fn default() -> Self {
        Self {
            doc: default_doc_model(),
            code: default_doc_model(),
            reranking: default_rerank_model(),
            endpoint: default_embedding_endpoint(),
            dim: default_dim(),
        }
    }
}

fn default_search_top_k() -> usize {
    20
}

fn default_rerank_top_k() -> usize {
    10
}

fn default_max_results() -> usize {
    25
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HybridWeightsSection {
    pub bm25: f32,
    pub vector: f32,
}

impl Default for HybridWeightsSection {
    fn default() -> Self {
        Self {
            bm25: 0.3,
            vector: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HybridRetrieval {
    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,
    #[serde(default = "default_rerank_top_k")]
    pub rerank_top_k: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub hybrid_weights: HybridWeightsSection,
}

impl Default for HybridRetrieval {
    fn default() -> Self {
        Self {
            search_top_k: default_search_top_k(),
            rerank_top_k: default_rerank_top_k(),
            max_results: default_max_results(),
            hybrid_weights: HybridWeightsSection::default(),
        }
    }
}

fn default_doc_chunk_size() -> usize {
    1000
}

fn default_doc_chunk_overlap() -> usize {
    100
}

fn default_code_strategy() -> String {
    "function_level".to_string()
}

fn default_code_chunk_overlap() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chunking {
    #[serde(default = "default_doc_chunk_size")]
    pub doc_chunk_size: usize,
    #[serde(default = "default_doc_chunk_overlap")]
    pub doc_chunk_overlap: usize,
    #[serde(default = "default_code_strategy")]
    pub code_chunk_strategy: String,
    #[serde(default = "default_code_chunk_overlap")]
    pub code_chunk_overlap: usize,
}

impl Default for Chunking {
    fn default() -> Self {
        Self {
            doc_chunk_size: default_doc_chunk_size(),
            doc_chunk_overlap: default_doc_chunk_overlap(),
            code_chunk_strategy: default_code_strategy(),
            code_chunk_overlap: default_code_chunk_overlap(),
        }
    }
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/node_modules/**".to_string(),
        "**/__pycache__/**".to_string(),
        "**/.git/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/target/**".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Relative values are resolved against the config file's directory.
    pub project_root: PathBuf,
    #[serde(default)]
    pub cloud_qdrant: Option<QdrantSection>,
    #[serde(default)]
    pub local_qdrant: Option<QdrantSection>,
    #[serde(default)]
    pub cloud_docs: Vec<String>,
    #[serde(default)]
    pub local_docs: Vec<String>,
    #[serde(default)]
    pub code_paths: Vec<String>,
    #[serde(default)]
    pub embedding_models: EmbeddingModels,
    #[serde(default)]
    pub hybrid_retrieval: HybridRetrieval,
    #[serde(default)]
    pub chunking: Chunking,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Config {
    /// Invariants that must hold before the process uses the config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cloud_qdrant.is_none() && self.local_qdrant.is_none() {
            return Err(ConfigError::Invalid(
                "at least one of cloud_qdrant / local_qdrant must be configured".into(),
            ));
        }
        // A single model keeps one vector dimension per collection.
        if self.embedding_models.doc != self.embedding_models.code {
            return Err(ConfigError::Invalid(format!(
                "embedding_models.doc ({}) and embedding_models.code ({}) must resolve to the same model",
                self.embedding_models.doc, self.embedding_models.code
            )));
        }
        if self.embedding_models.dim == 0 {
            return Err(ConfigError::Invalid("embedding_models.dim must be > 0".into()));
        }
        let w = &self.hybrid_retrieval.hybrid_weights;
        if (w.bm25 + w.vector - 1.0).abs() > 0.01 {
            return Err(ConfigError::Invalid(format!(
                "hybrid_weights must sum to 1.0, got {}",
                w.bm25 + w.vector
            )));
        }
        if self.hybrid_retrieval.search_top_k == 0 || self.hybrid_retrieval.rerank_top_k == 0 {
            return Err(ConfigError::Invalid(
                "search_top_k and rerank_top_k must be > 0".into(),
            ));
        }
        if self.chunking.doc_chunk_size == 0
            || self.chunking.doc_chunk_overlap >= self.chunking.doc_chunk_size
        {
            return Err(ConfigError::Invalid(
                "doc_chunk_overlap must be smaller than doc_chunk_size".into(),
            ));
        }
        Ok(())
    }
}
