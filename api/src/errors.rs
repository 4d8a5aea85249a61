//! Tool-level error taxonomy with the stable envelope codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),

    #[error("point {0} not found")]
    PointNotFound(u64),

    #[error("dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("batch of {got} exceeds the cap of {cap}")]
    BatchLimitExceeded { got: usize, cap: usize },

    #[error("vector store unavailable: {0}")]
    VectorStoreUnavailable(String),

    #[error("embedding failed: {0}")]
    EmbedFailed(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ToolError {
    /// Stable machine-readable code used in envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PointNotFound(_) => "POINT_NOT_FOUND",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::BatchLimitExceeded { .. } => "BATCH_LIMIT_EXCEEDED",
            Self::VectorStoreUnavailable(_) => "VECTOR_STORE_UNAVAILABLE",
            Self::EmbedFailed(_) => "EMBED_FAILED",
            Self::ParseFailed(_) => "PARSE_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// A hint the client can act on, included in the envelope.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Validation(_) => {
                vec!["check the tool schema with get_tool_schema".to_string()]
            }
            Self::PointNotFound(_) => {
                vec!["list existing points with query_points or get_document".to_string()]
            }
            Self::DimensionMismatch { .. } => {
                vec!["re-index after an embedding model change".to_string()]
            }
            Self::BatchLimitExceeded { cap, .. } => {
                vec![format!("split the request into batches of at most {cap}")]
            }
            Self::VectorStoreUnavailable(_) => {
                vec!["verify the endpoint url and that the vector store is running".to_string()]
            }
            _ => Vec::new(),
        }
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseFailed(e.to_string())
    }
}

impl From<rag_store::StoreError> for ToolError {
    fn from(e: rag_store::StoreError) -> Self {
        use rag_store::StoreError as S;
        match e {
            S::DimensionMismatch { got, want } => Self::DimensionMismatch { got, want },
            S::BatchLimitExceeded { got, cap } => Self::BatchLimitExceeded { got, cap },
            S::Qdrant(msg) => Self::VectorStoreUnavailable(msg),
            S::Embedding(msg) => Self::EmbedFailed(msg),
            S::Config(msg) => Self::Config(msg),
            S::Io(e) => Self::VectorStoreUnavailable(e.to_string()),
            S::Parse(e) => Self::ParseFailed(e.to_string()),
        }
    }
}

impl From<rag_retrieval::RetrievalError> for ToolError {
    fn from(e: rag_retrieval::RetrievalError) -> Self {
        use rag_retrieval::RetrievalError as R;
        match e {
            R::EmptyQuery => Self::Validation("query cannot be empty".to_string()),
            R::Store(inner) => inner.into(),
            R::Rerank(msg) => Self::VectorStoreUnavailable(msg),
        }
    }
}

impl From<rag_indexer::IndexError> for ToolError {
    fn from(e: rag_indexer::IndexError) -> Self {
        use rag_indexer::IndexError as I;
        match e {
            I::Store(inner) => inner.into(),
            I::Io(e) => Self::ParseFailed(e.to_string()),
            I::Glob(e) => Self::Validation(e.to_string()),
        }
    }
}
