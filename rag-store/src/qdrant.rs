//! Qdrant-backed chunk store.
//!
//! Concentrates all Qdrant interactions behind the [`ChunkStore`] trait,
//! using the modern builder-based client (`qdrant_client::Qdrant`). Every
//! remote call goes through a bounded exponential-backoff retry; retried
//! mutations are safe because point ids are deterministic.

use crate::chunk::ChunkPayload;
use crate::errors::StoreError;
use crate::filters::ChunkFilter;
use crate::store::{
    BatchReport, ChunkPoint, ChunkStore, CollectionStats, MAX_BATCH, ScoredPoint, ScrollPage,
    StoredPoint,
};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, GetPointsBuilder, PointId, PointStruct,
    PointsIdsList, ScrollPointsBuilder, SearchPointsBuilder, SetPayloadPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder, point_id::PointIdOptions, vectors_config,
    vectors_output,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Payload keys that get an exact-match index at collection creation.
const KEYWORD_INDEXES: [&str; 4] = ["file_path", "section", "language", "content_type"];

/// Connection settings for one Qdrant endpoint.
#[derive(Debug, Clone)]
pub struct QdrantEndpoint {
    /// gRPC endpoint, e.g. `http://localhost:6334`.
    pub url: String,
    /// Optional API key (Qdrant Cloud).
    pub api_key: Option<String>,
    pub collection: String,
    pub timeout: Duration,
    pub retry_attempts: u32,
}

/// Qdrant implementation of the chunk store capability set.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    retry_attempts: u32,
}

impl QdrantStore {
    /// Builds the client from endpoint settings.
    ///
    /// # Errors
    /// Returns `StoreError::Config` for empty settings and wraps client init
    /// failures as `StoreError::Qdrant`.
    pub fn connect(endpoint: &QdrantEndpoint) -> Result<Self, StoreError> {
        if endpoint.url.trim().is_empty() {
            return Err(StoreError::Config("qdrant url is empty".into()));
        }
        if endpoint.collection.trim().is_empty() {
            return Err(StoreError::Config("qdrant collection is empty".into()));
        }

        let mut builder = Qdrant::from_url(&endpoint.url).timeout(endpoint.timeout);
        if let Some(key) = &endpoint.api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| StoreError::Qdrant(format!("client build: {e}")))?;

        Ok(Self {
            client,
            collection: endpoint.collection.clone(),
            retry_attempts: endpoint.retry_attempts.max(1),
        })
    }

    /// Runs `call` with bounded exponential backoff.
    async fn retrying<T, Fut, F>(&self, op: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, qdrant_client::QdrantError>>,
    {
        let mut delay = Duration::from_millis(200);
        let mut attempt = 1;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if attempt < self.retry_attempts => {
                    warn!(
                        target: "rag_store::qdrant",
                        op, attempt, error = %e,
                        "transport error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(StoreError::Qdrant(format!("{op}: {e}"))),
            }
        }
    }

    /// Flips `is_deleted` for the given ids, in batches.
    async fn set_deleted_flag(&self, ids: &[u64], deleted: bool) -> Result<usize, StoreError> {
        let mut touched = 0usize;
        for batch in ids.chunks(MAX_BATCH) {
            let payload: Payload = serde_json::json!({ "is_deleted": deleted })
                .try_into()
                .map_err(|e| StoreError::Qdrant(format!("payload convert: {e}")))?;
            let selector: Vec<PointId> = batch.iter().map(|id| PointId::from(*id)).collect();
            self.retrying("set_payload", || {
                self.client.set_payload(
                    SetPayloadPointsBuilder::new(&self.collection, payload.clone())
                        .points_selector(selector.clone())
                        .wait(true),
                )
            })
            .await?;
            touched += batch.len();
        }
        Ok(touched)
    }

    /// Ids of every point matching the filter.
    async fn matching_ids(&self, filter: &ChunkFilter) -> Result<Vec<u64>, StoreError> {
        let mut ids = Vec::new();
        let mut cursor: Option<u64> = None;
        loop {
            let page = self.scroll(filter, cursor, MAX_BATCH).await?;
            ids.extend(page.points.iter().map(|p| p.id));
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn count(&self, filter: Option<&ChunkFilter>) -> Result<usize, StoreError> {
        let resp = self
            .retrying("count", || {
                let mut builder = CountPointsBuilder::new(&self.collection).exact(true);
                if let Some(f) = filter {
                    builder = builder.filter(f.to_qdrant());
                }
                self.client.count(builder)
            })
            .await?;
        Ok(resp.result.map(|r| r.count as usize).unwrap_or(0))
    }
}

#[async_trait]
impl ChunkStore for QdrantStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn ensure_collection(&self, dim: usize) -> Result<(), StoreError> {
        let exists = self
            .retrying("collection_exists", || {
                self.client.collection_exists(&self.collection)
            })
            .await?;

        if exists {
            // Verify the stored dimension; a different one is a hard error.
            let info = self
                .retrying("collection_info", || {
                    self.client.collection_info(&self.collection)
                })
                .await?;
            let stored_dim = info
                .result
                .and_then(|r| r.config)
                .and_then(|c| c.params)
                .and_then(|p| p.vectors_config)
                .and_then(|v| v.config)
                .and_then(|c| match c {
                    vectors_config::Config::Params(p) => Some(p.size as usize),
                    _ => None,
                });
            match stored_dim {
                Some(stored) if stored != dim => {
                    return Err(StoreError::DimensionMismatch {
                        got: dim,
                        want: stored,
                    });
                }
                Some(_) => trace!(target: "rag_store::qdrant", collection = %self.collection, dim, "collection present"),
                None => warn!(
                    target: "rag_store::qdrant",
                    collection = %self.collection,
                    "could not read stored dimension, skipping check"
                ),
            }
        } else {
            debug!(
                target: "rag_store::qdrant",
                collection = %self.collection, dim,
                "creating collection"
            );
            self.retrying("create_collection", || {
                self.client.create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(dim as u64, Distance::Cosine),
                    ),
                )
            })
            .await?;
        }

        // Payload indexes are idempotent in intent; a failure to create one
        // that already exists is logged and ignored.
        for field in KEYWORD_INDEXES {
            if let Err(e) = self
                .client
                .create_field_index(
                    CreateFieldIndexCollectionBuilder::new(
                        &self.collection,
                        field,
                        FieldType::Keyword,
                    )
                    .wait(true),
                )
                .await
            {
                debug!(target: "rag_store::qdrant", field, error = %e, "keyword index not created (may exist)");
            }
        }
        if let Err(e) = self
            .client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(
                    &self.collection,
                    "is_deleted",
                    FieldType::Bool,
                )
                .wait(true),
            )
            .await
        {
            debug!(target: "rag_store::qdrant", error = %e, "bool index not created (may exist)");
        }

        Ok(())
    }

    async fn upsert(&self, points: Vec<ChunkPoint>) -> Result<BatchReport, StoreError> {
        trace!(target: "rag_store::qdrant", count = points.len(), "upsert");
        let mut report = BatchReport::default();
        if points.is_empty() {
            return Ok(report);
        }

        for batch in points.chunks(MAX_BATCH) {
            let mut structs = Vec::with_capacity(batch.len());
            for p in batch {
                let as_json: JsonValue = serde_json::to_value(&p.chunk.payload)?;
                let payload: Payload = as_json
                    .try_into()
                    .map_err(|e| StoreError::Qdrant(format!("payload convert: {e}")))?;
                structs.push(PointStruct::new(p.chunk.id, p.vector.clone(), payload));
            }
            let ids: Vec<u64> = batch.iter().map(|p| p.chunk.id).collect();
            match self
                .retrying("upsert_points", || {
                    self.client.upsert_points(
                        UpsertPointsBuilder::new(&self.collection, structs.clone()).wait(true),
                    )
                })
                .await
            {
                Ok(_) => report.succeeded.extend(ids),
                Err(e) => {
                    let msg = e.to_string();
                    report.failed.extend(ids.into_iter().map(|id| (id, msg.clone())));
                }
            }
        }
        Ok(report)
    }

    async fn delete_by_ids(&self, ids: &[u64]) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();
        for batch in ids.chunks(MAX_BATCH) {
            let point_ids: Vec<PointId> = batch.iter().map(|id| PointId::from(*id)).collect();
            match self
                .retrying("delete_points", || {
                    self.client.delete_points(
                        DeletePointsBuilder::new(&self.collection)
                            .points(PointsIdsList {
                                ids: point_ids.clone(),
                            })
                            .wait(true),
                    )
                })
                .await
            {
                Ok(_) => report.succeeded.extend(batch.iter().copied()),
                Err(e) => {
                    let msg = e.to_string();
                    report
                        .failed
                        .extend(batch.iter().map(|id| (*id, msg.clone())));
                }
            }
        }
        Ok(report)
    }

    async fn soft_delete(&self, filter: &ChunkFilter) -> Result<usize, StoreError> {
        let ids = self.matching_ids(filter).await?;
        self.set_deleted_flag(&ids, true).await
    }

    async fn soft_delete_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        self.set_deleted_flag(ids, true).await
    }

    async fn recover_ids(&self, ids: &[u64]) -> Result<usize, StoreError> {
        self.set_deleted_flag(ids, false).await
    }

    async fn recover(&self, filter: &ChunkFilter) -> Result<usize, StoreError> {
        // The recover target is soft-deleted, so the scroll must see it.
        let mut f = filter.clone();
        f.include_deleted = true;
        f.only_deleted = true;
        let ids = self.matching_ids(&f).await?;
        self.set_deleted_flag(&ids, false).await
    }

    async fn get_points(
        &self,
        ids: &[u64],
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, StoreError> {
        let mut out = Vec::new();
        for batch in ids.chunks(MAX_BATCH) {
            let point_ids: Vec<PointId> = batch.iter().map(|id| PointId::from(*id)).collect();
            let resp = self
                .retrying("get_points", || {
                    self.client.get_points(
                        GetPointsBuilder::new(&self.collection, point_ids.clone())
                            .with_payload(true)
                            .with_vectors(with_vectors),
                    )
                })
                .await?;
            for rp in resp.result {
                let id = match rp.id.as_ref().and_then(|p| p.point_id_options.as_ref()) {
                    Some(PointIdOptions::Num(n)) => *n,
                    _ => continue,
                };
                let payload = payload_from_qdrant(rp.payload)?;
                let vector = rp.vectors.and_then(vector_from_output);
                out.push(StoredPoint {
                    id,
                    payload,
                    vector,
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
        let limit = limit.min(MAX_BATCH) as u32;
        let resp = self
            .retrying("scroll", || {
                let mut builder = ScrollPointsBuilder::new(&self.collection)
                    .filter(filter.to_qdrant())
                    .with_payload(true)
                    .with_vectors(false)
                    .limit(limit);
                if let Some(cur) = cursor {
                    builder = builder.offset(PointId::from(cur));
                }
                self.client.scroll(builder)
            })
            .await?;

        let mut points = Vec::with_capacity(resp.result.len());
        for rp in resp.result {
            let id = match rp.id.as_ref().and_then(|p| p.point_id_options.as_ref()) {
                Some(PointIdOptions::Num(n)) => *n,
                _ => continue,
            };
            points.push(StoredPoint {
                id,
                payload: payload_from_qdrant(rp.payload)?,
                vector: None,
            });
        }
        let next = resp
            .next_page_offset
            .and_then(|p| p.point_id_options)
            .and_then(|o| match o {
                PointIdOptions::Num(n) => Some(n),
                _ => None,
            });
        Ok(ScrollPage { points, next })
    }

    async fn vector_search(
        &self,
        vector: &[f32],
        filter: &ChunkFilter,
        k: usize,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let resp = self
            .retrying("search_points", || {
                self.client.search_points(
                    SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                        .filter(filter.to_qdrant())
                        .with_payload(true),
                )
            })
            .await?;

        let mut out = Vec::with_capacity(resp.result.len());
        for sp in resp.result {
            let id = match sp.id.as_ref().and_then(|p| p.point_id_options.as_ref()) {
                Some(PointIdOptions::Num(n)) => *n,
                _ => continue,
            };
            out.push(ScoredPoint {
                // Cosine similarity in [-1, 1] mapped into [0, 1].
                score: ((sp.score + 1.0) / 2.0).clamp(0.0, 1.0),
                point: StoredPoint {
                    id,
                    payload: payload_from_qdrant(sp.payload)?,
                    vector: None,
                },
            });
        }
        // Deterministic order: score descending, ties by ascending id.
        out.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.point.id.cmp(&b.point.id))
        });
        Ok(out)
    }

    async fn stats(&self) -> Result<CollectionStats, StoreError> {
        let deleted = self.count(Some(&ChunkFilter::deleted())).await?;
        let total = self.count(None).await?;
        Ok(CollectionStats {
            active: total.saturating_sub(deleted),
            deleted,
        })
    }
}

/// Converts a Qdrant payload map back into the typed chunk payload.
fn payload_from_qdrant(
    payload: std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> Result<ChunkPayload, StoreError> {
    let map = payload
        .into_iter()
        .map(|(k, v)| (k, v.into_json()))
        .collect::<serde_json::Map<_, _>>();
    Ok(serde_json::from_value(JsonValue::Object(map))?)
}

/// Extracts the dense vector from a read-back point, when present.
fn vector_from_output(v: qdrant_client::qdrant::VectorsOutput) -> Option<Vec<f32>> {
    match v.vectors_options {
        Some(vectors_output::VectorsOptions::Vector(vec)) => Some(vec.data),
        _ => None,
    }
}
