//! Unified error type for the retrieval pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("empty query")]
    EmptyQuery,

    #[error(transparent)]
    Store(#[from] rag_store::StoreError),

    #[error("rerank error: {0}")]
    Rerank(String),
}
