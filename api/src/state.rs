//! Shared application state for every tool invocation.
//!
//! The stores and the embedding provider are process-wide, created once at
//! startup and passed explicitly behind `Arc`s; nothing here is a module
//! global.

use crate::errors::ToolError;
use code_indexer::ChunkStrategy;
use doc_indexer::{DocChunkOptions, DocTypeMap};
use rag_config::Config;
use rag_indexer::Indexer;
use rag_retrieval::{
    HttpCrossEncoder, HybridWeights, NoopReranker, QueryPipeline, Reranker, Retriever,
};
use rag_store::{ChunkStore, EmbeddingsProvider, HttpEmbedder, QdrantStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Default deadline for query-path tools; indexing is unbounded.
pub const QUERY_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Cloud collection, when configured. Queried before `local`.
    pub cloud: Option<Arc<dyn ChunkStore>>,
    pub local: Option<Arc<dyn ChunkStore>>,
    pub embedder: Arc<dyn EmbeddingsProvider>,
    pub pipeline: Arc<QueryPipeline>,
    pub server_name: String,
}

impl AppState {
    /// Wires the production backends from configuration.
    pub fn from_config(config: Config) -> Result<Self, ToolError> {
        let cloud = config
            .cloud_qdrant
            .as_ref()
            .map(|s| QdrantStore::connect(&s.endpoint()))
            .transpose()?
            .map(|s| Arc::new(s) as Arc<dyn ChunkStore>);
        let local = config
            .local_qdrant
            .as_ref()
            .map(|s| QdrantStore::connect(&s.endpoint()))
            .transpose()?
            .map(|s| Arc::new(s) as Arc<dyn ChunkStore>);

        let embedder: Arc<dyn EmbeddingsProvider> = Arc::new(HttpEmbedder::new(
            config.embedding_models.endpoint.clone(),
            config.embedding_models.doc.clone(),
            config.embedding_models.dim,
        ));

        // "noop" bypasses the cross-encoder, for tests and degraded setups.
        let reranker: Arc<dyn Reranker> = if config.embedding_models.reranking == "noop" {
            Arc::new(NoopReranker)
        } else {
            Arc::new(HttpCrossEncoder::new(
                config.embedding_models.endpoint.clone(),
                config.embedding_models.reranking.clone(),
            ))
        };

        Self::new(config, cloud, local, embedder, reranker)
    }

    /// Wires the state from pre-built backends (tests use the in-memory
    /// store and the hash embedder here).
    pub fn new(
        config: Config,
        cloud: Option<Arc<dyn ChunkStore>>,
        local: Option<Arc<dyn ChunkStore>>,
        embedder: Arc<dyn EmbeddingsProvider>,
        reranker: Arc<dyn Reranker>,
    ) -> Result<Self, ToolError> {
        if cloud.is_none() && local.is_none() {
            return Err(ToolError::Config(
                "no vector store endpoint configured".to_string(),
            ));
        }
        if ChunkStrategy::from_config(&config.chunking.code_chunk_strategy).is_none() {
            return Err(ToolError::Config(format!(
                "unknown code_chunk_strategy: {}",
                config.chunking.code_chunk_strategy
            )));
        }

        let mut stores: Vec<Arc<dyn ChunkStore>> = Vec::new();
        if let Some(cloud) = &cloud {
            stores.push(cloud.clone());
        }
        if let Some(local) = &local {
            stores.push(local.clone());
        }

        let weights = HybridWeights {
            vector: config.hybrid_retrieval.hybrid_weights.vector,
            bm25: config.hybrid_retrieval.hybrid_weights.bm25,
        };
        let retriever = Retriever::new(stores, embedder.clone(), weights);
        let pipeline = QueryPipeline::new(
            retriever,
            reranker,
            config.hybrid_retrieval.rerank_top_k,
            QUERY_DEADLINE,
        );

        let server_name =
            std::env::var("MCP_SERVER_NAME").unwrap_or_else(|_| "rag-server".to_string());
        info!(
            target: "api::state",
            server = %server_name,
            cloud = cloud.is_some(),
            local = local.is_some(),
            "application state ready"
        );

        Ok(Self {
            config: Arc::new(config),
            cloud,
            local,
            embedder,
            pipeline: Arc::new(pipeline),
            server_name,
        })
    }

    /// All configured stores, cloud first.
    pub fn stores(&self) -> Vec<Arc<dyn ChunkStore>> {
        self.cloud.iter().chain(self.local.iter()).cloned().collect()
    }

    /// The store CRUD tools address: cloud when configured, local otherwise.
    pub fn primary(&self) -> Arc<dyn ChunkStore> {
        self.cloud
            .clone()
            .or_else(|| self.local.clone())
            .expect("at least one store is configured")
    }

    pub fn doc_chunk_options(&self) -> DocChunkOptions {
        DocChunkOptions {
            chunk_size: self.config.chunking.doc_chunk_size,
            overlap: self.config.chunking.doc_chunk_overlap,
            doc_type_map: DocTypeMap::default(),
        }
    }

    pub fn code_strategy(&self) -> ChunkStrategy {
        ChunkStrategy::from_config(&self.config.chunking.code_chunk_strategy)
            .unwrap_or_default()
    }

    /// An indexer bound to one store, sharing the process embedder.
    pub fn indexer_for(&self, store: Arc<dyn ChunkStore>) -> Indexer {
        Indexer::new(
            store,
            self.embedder.clone(),
            self.doc_chunk_options(),
            self.code_strategy(),
        )
    }

    pub fn search_top_k(&self) -> usize {
        self.config.hybrid_retrieval.search_top_k
    }
}
