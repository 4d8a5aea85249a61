//! The chunk store capability set.
//!
//! Everything the rest of the system needs from the vector database is
//! expressed here as one trait, implemented once per backend. All mutations
//! are idempotent per id (ids are deterministic), so retried calls are safe.

use crate::chunk::{Chunk, ChunkPayload};
use crate::errors::StoreError;
use crate::filters::ChunkFilter;
use async_trait::async_trait;

/// Maximum points or ids per network call.
pub const MAX_BATCH: usize = 1000;

/// A chunk paired with its embedding, ready to upsert.
#[derive(Debug, Clone)]
pub struct ChunkPoint {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A point read back from the collection.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub id: u64,
    pub payload: ChunkPayload,
    pub vector: Option<Vec<f32>>,
}

/// A stored point with a similarity score, normalized to [0, 1].
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub score: f32,
    pub point: StoredPoint,
}

/// One page of a scroll; `next` is the cursor for the following page.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub points: Vec<StoredPoint>,
    pub next: Option<u64>,
}

/// Point counts split by deletion state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CollectionStats {
    pub active: usize,
    pub deleted: usize,
}

/// Outcome of a multi-id operation; partial success is reported per id.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub succeeded: Vec<u64>,
    pub failed: Vec<(u64, String)>,
}

impl BatchReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Typed operations over one collection of one backend.
///
/// Search and scroll results are deterministic: ties on score break by
/// ascending id. Every read excludes `is_deleted = true` unless the filter
/// explicitly opts in.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Identifies the collection for logs and provenance.
    fn collection(&self) -> &str;

    /// Idempotent: creates the collection and its payload indexes when
    /// absent; fails if it exists with a different dimension.
    async fn ensure_collection(&self, dim: usize) -> Result<(), StoreError>;

    /// Batched upsert (same id overwrites). Batches are capped at
    /// [`MAX_BATCH`] per network call internally.
    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<BatchReport, StoreError>;

    /// Physical removal.
    async fn delete_by_ids(&self, ids: &[u64]) -> Result<BatchReport, StoreError>;

    /// Sets `is_deleted = true` in place for every point matching the filter.
    /// Returns the number of points touched.
    async fn soft_delete(&self, filter: &ChunkFilter) -> Result<usize, StoreError>;

    /// Sets `is_deleted = true` for the given ids.
    async fn soft_delete_ids(&self, ids: &[u64]) -> Result<usize, StoreError>;

    /// Clears `is_deleted` for the given ids.
    async fn recover_ids(&self, ids: &[u64]) -> Result<usize, StoreError>;

    /// Clears `is_deleted` for every point matching the filter. Returns the
    /// number of points recovered.
    async fn recover(&self, filter: &ChunkFilter) -> Result<usize, StoreError>;

    /// Bulk retrieval by ids; missing ids are simply absent from the result.
    async fn get_points(
        &self,
        ids: &[u64],
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, StoreError>;

    /// Paginated enumeration in ascending id order.
    async fn scroll(
        &self,
        filter: &ChunkFilter,
        cursor: Option<u64>,
        limit: usize,
    ) -> Result<ScrollPage, StoreError>;

    /// Top-k by cosine similarity under the filter.
    async fn vector_search(
        &self,
        vector: &[f32],
        filter: &ChunkFilter,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Point counts split by `is_deleted`.
    async fn stats(&self) -> Result<CollectionStats, StoreError>;
}

/// Scrolls every point matching the filter, following cursors to the end.
pub async fn scroll_all(
    store: &dyn ChunkStore,
    filter: &ChunkFilter,
) -> Result<Vec<StoredPoint>, StoreError> {
    let mut out = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.scroll(filter, cursor, MAX_BATCH).await?;
        out.extend(page.points);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(out)
}
