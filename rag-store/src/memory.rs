//! In-process chunk store.
//!
//! Honors the exact [`ChunkStore`] contract over a `BTreeMap`, so indexing
//! and retrieval pipelines can be exercised in tests without a Qdrant
//! server. Not intended for production data.

use crate::chunk::ChunkPayload;
use crate::errors::StoreError;
use crate::filters::ChunkFilter;
use crate::store::{
    BatchReport, ChunkPoint, ChunkStore, CollectionStats, ScoredPoint, ScrollPage, StoredPoint,
};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: ChunkPayload,
    vector: Vec<f32>,
}

/// BTreeMap-backed store; id order gives deterministic scrolls for free.
pub struct MemoryStore {
    name: String,
    dim: RwLock<Option<usize>>,
    points: RwLock<BTreeMap<u64, StoredEntry>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dim: RwLock::new(None),
            points: RwLock::new(BTreeMap::new()),
        }
    }

    fn matches(filter: &ChunkFilter, payload: &ChunkPayload) -> bool {
        if let Some(path) = &filter.file_path {
            if &payload.file_path != path {
                return false;
            }
        }
        if let Some(section) = &filter.section {
            if payload.section.as_deref() != Some(section.as_str()) {
                return false;
            }
        }
        if let Some(language) = &filter.language {
            if payload.language.as_deref() != Some(language.as_str()) {
                return false;
            }
        }
        if let Some(ct) = filter.content_type {
            if payload.content_type != ct {
                return false;
            }
        }
        if filter.only_deleted {
            return payload.is_deleted;
        }
        if !filter.include_deleted && payload.is_deleted {
            return false;
        }
        true
    }

    fn set_deleted(&self, filter: &ChunkFilter, deleted: bool) -> usize {
        let mut points = self.points.write().expect("poisoned");
        let mut touched = 0;
        for entry in points.values_mut() {
            if Self::matches(filter, &entry.payload) && entry.payload.is_deleted != deleted {
                entry.payload.is_deleted = deleted;
                touched += 1;
            }
        }
        touched
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

#[async_trait]
impl ChunkStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.name
    }

    async fn ensure_collection(&self, dim: usize) -> Result<(), StoreError> {
        let mut stored = self.dim.write().expect("poisoned");
        match *stored {
            Some(existing) if existing != dim => Err(StoreError::DimensionMismatch {
                got: dim,
                want: existing,
            }),
            Some(_) => Ok(()),
            None => {
                *stored = Some(dim);
                Ok(())
            }
        }
    }

    async fn upsert(&self, new_points: Vec<ChunkPoint>) -> Result<BatchReport, StoreError> {
        let dim = self.dim.read().expect("poisoned").unwrap_or(0);
        let mut report = BatchReport::default();
        let mut points = self.points.write().expect("poisoned");
        for p in new_points {
            if dim != 0 && p.vector.len() != dim {
                return Err(StoreError::DimensionMismatch {
                    got: p.vector.len(),
                    want: dim,
                });
            }
            report.succeeded.push(p.chunk.id);
            points.insert(
                p.chunk.id,
                StoredEntry {
                    payload: p.chunk.payload,
                    vector: p.vector,
                },
            );
        }
        Ok(report)
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();
        let mut points = self.points.write().expect("poisoned");
        for id in ids {
            points.remove(id);
            report.succeeded.push(*id);
        }
        Ok(report)
    }

    async fn soft_delete(&self, filter: &ChunkFilter) -> Result<usize, StoreError> {
        Ok(self.set_deleted(filter, true))
    }

    async fn soft_delete_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        let mut points = self.points.write().expect("poisoned");
        let mut touched = 0;
        for id in ids {
            if let Some(entry) = points.get_mut(id) {
                if !entry.payload.is_deleted {
                    entry.payload.is_deleted = true;
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }

    async fn recover_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        let mut points = self.points.write().expect("poisoned");
        let mut touched = 0;
        for id in ids {
            if let Some(entry) = points.get_mut(id) {
                if entry.payload.is_deleted {
                    entry.payload.is_deleted = false;
                    touched += 1;
                }
            }
        }
        Ok(touched)
    }

    async fn recover(&self, filter: &ChunkFilter) -> Result<usize, StoreError> {
        let mut f = filter.clone();
        f.include_deleted = true;
        f.only_deleted = true;
        Ok(self.set_deleted(&f, false))
    }

    async fn get_points(
        &self,
        ids: &[u64],
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, StoreError> {
        let points = self.points.read().expect("poisoned");
        let mut out = Vec::new();
        for id in ids {
            if let Some(entry) = points.get(id) {
                out.push(StoredPoint {
                    id: *id,
                    payload: entry.payload.clone(),
                    vector: with_vectors.then(|| entry.vector.clone()),
                });
            }
        }
        out.sort_by_key(|p| p.id);
        Ok(out)
    }

    async fn scroll(
        &self,
        filter: &ChunkFilter,
        cursor: Option<u64>,
        limit: usize,
    ) -> Result<ScrollPage, StoreError> {
        let points = self.points.read().expect("poisoned");
        let start = cursor.unwrap_or(0);
        let mut page = Vec::new();
        let mut next = None;
        for (id, entry) in points.range(start..) {
            if !Self::matches(filter, &entry.payload) {
                continue;
            }
            if page.len() == limit {
                next = Some(*id);
                break;
            }
            page.push(StoredPoint {
                id: *id,
                payload: entry.payload.clone(),
                vector: None,
            });
        }
        Ok(ScrollPage { points: page, next })
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        filter: &ChunkFilter,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let points = self.points.read().expect("poisoned");
        let mut scored: Vec<ScoredPoint> = points
            .iter()
            .filter(|(_, e)| Self::matches(filter, &e.payload))
            .map(|(id, e)| ScoredPoint {
                score: ((cosine(vector, &e.vector) + 1.0) / 2.0).clamp(0.0, 1.0),
                point: StoredPoint {
                    id: *id,
                    payload: e.payload.clone(),
                    vector: None,
                },
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.point.id.cmp(&b.point.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn stats(&self) -> Result<CollectionStats, StoreError> {
        let points = self.points.read().expect("poisoned");
        let deleted = points.values().filter(|e| e.payload.is_deleted).count();
        Ok(CollectionStats {
            active: points.len() - deleted,
            deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{Chunk, ChunkPayload, ContentType};

    fn chunk(path: &str, line: u32, content: &str) -> ChunkPoint {
        let payload = ChunkPayload {
            content: content.to_string(),
            file_path: path.to_string(),
            line_start: line,
            line_end: line,
            content_type: ContentType::Text,
            language: Some("markdown".to_string()),
            section: Some("Intro".to_string()),
            doc_type: None,
            code_type: None,
            name: None,
            class_name: None,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        };
        ChunkPoint {
            chunk: Chunk::from_payload(payload),
            vector: vec![1.0, 0.0, 0.0],
        }
    }

    #[tokio::test]
    async fn soft_delete_then_recover_restores_state() {
        let store = MemoryStore::new("test");
        store.ensure_collection(3).await.unwrap();
        store
            .upsert(vec![chunk("docs/a.md", 1, "alpha"), chunk("docs/a.md", 5, "beta")])
            .await
            .unwrap();

        let filter = ChunkFilter::for_file("docs/a.md");
        assert_eq!(store.soft_delete(&filter).await.unwrap(), 2);
        assert_eq!(store.stats().await.unwrap().deleted, 2);

        // Hidden from default reads, visible with the opt-in.
        assert!(store.scroll(&filter, None, 10).await.unwrap().points.is_empty());
        let mut all = filter.clone();
        all.include_deleted = true;
        assert_eq!(store.scroll(&all, None, 10).await.unwrap().points.len(), 2);

        assert_eq!(store.recover(&filter).await.unwrap(), 2);
        assert_eq!(store.stats().await.unwrap(), CollectionStats { active: 2, deleted: 0 });
    }

    #[tokio::test]
    async fn search_excludes_deleted_and_breaks_ties_by_id() {
        let store = MemoryStore::new("test");
        store.ensure_collection(3).await.unwrap();
        let a = chunk("docs/a.md", 1, "alpha");
        let b = chunk("docs/b.md", 1, "beta");
        let (id_a, id_b) = (a.chunk.id, b.chunk.id);
        store.upsert(vec![a, b]).await.unwrap();

        let hits = store
            .vector_search(&[1.0, 0.0, 0.0], &ChunkFilter::all_active(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        // Identical vectors: ascending id decides.
        assert_eq!(hits[0].point.id, id_a.min(id_b));

        store.soft_delete_ids(&[id_a]).await.unwrap();
        let hits = store
            .vector_search(&[1.0, 0.0, 0.0], &ChunkFilter::all_active(), 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].point.id, id_b);
    }

    #[tokio::test]
    async fn scroll_pages_with_cursor() {
        let store = MemoryStore::new("test");
        store.ensure_collection(3).await.unwrap();
        let points: Vec<ChunkPoint> = (1..=5).map(|i| chunk("docs/a.md", i, "x")).collect();
        store.upsert(points).await.unwrap();

        let first = store.scroll(&ChunkFilter::all_active(), None, 3).await.unwrap();
        assert_eq!(first.points.len(), 3);
        let cursor = first.next.expect("more pages");
        let second = store
            .scroll(&ChunkFilter::all_active(), Some(cursor), 3)
            .await
            .unwrap();
        assert_eq!(second.points.len(), 2);
        assert!(second.next.is_none());
    }
}
