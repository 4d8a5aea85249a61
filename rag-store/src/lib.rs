//! Chunk data model and vector store adapters.
//!
//! This crate owns the payload schema of the collection, the deterministic
//! point-id derivation, the [`ChunkStore`] capability set, and the embedding
//! provider interface. Backends: Qdrant (production) and an in-memory store
//! with the same contract (tests).

pub mod chunk;
pub mod embed;
pub mod errors;
pub mod filters;
pub mod memory;
pub mod qdrant;
pub mod store;

pub use chunk::{Chunk, ChunkPayload, CodeType, ContentType, DocType, content_hash, point_id};
pub use embed::{EmbeddingsProvider, HashEmbedder, HttpEmbedder};
pub use errors::StoreError;
pub use filters::ChunkFilter;
pub use memory::MemoryStore;
pub use qdrant::{QdrantEndpoint, QdrantStore};
pub use store::{
    BatchReport, ChunkPoint, ChunkStore, CollectionStats, MAX_BATCH, ScoredPoint, ScrollPage,
    StoredPoint, scroll_all,
};
