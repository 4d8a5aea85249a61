//! Hybrid retrieval: vector + BM25 legs, cross-collection merge, and
//! section-aware neighborhood expansion.
//!
//! Collections are queried cloud first, then local; per-chunk provenance is
//! the collection name. The lexical corpus is scrolled once per retriever
//! and cached; if it cannot be built the retriever degrades to vector-only
//! scoring (`w_vec = 1.0`) and logs the degradation.

use crate::bm25::Bm25Index;
use crate::classifier::RetrievalHints;
use crate::errors::RetrievalError;
use rag_store::{ChunkFilter, ChunkPayload, ChunkStore, EmbeddingsProvider, scroll_all};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// The candidate pool handed to the reranker is capped at this size.
const POOL_CAP: usize = 100;

/// Weighted combination of the two legs; must sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct HybridWeights {
    pub vector: f32,
    pub bm25: f32,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            vector: 0.7,
            bm25: 0.3,
        }
    }
}

/// A chunk in the candidate pool, with provenance.
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub id: u64,
    /// Combined hybrid score; replaced by the rerank score downstream.
    pub score: f32,
    pub vector_score: f32,
    pub payload: ChunkPayload,
    /// Which collection supplied this chunk.
    pub collection: String,
}

struct Lexicon {
    index: Bm25Index,
    /// Maps corpus ids back to the store that owns them.
    owner: HashMap<u64, usize>,
}

pub struct Retriever {
    /// Cloud first, then local.
    stores: Vec<Arc<dyn ChunkStore>>,
    embedder: Arc<dyn EmbeddingsProvider>,
    weights: HybridWeights,
    lexicon: RwLock<Option<Arc<Lexicon>>>,
}

impl Retriever {
    pub fn new(
        stores: Vec<Arc<dyn ChunkStore>>,
        embedder: Arc<dyn EmbeddingsProvider>,
        weights: HybridWeights,
    ) -> Self {
        Self {
            stores,
            embedder,
            weights,
            lexicon: RwLock::new(None),
        }
    }

    /// Drops the cached lexical corpus; the next search rebuilds it. Called
    /// after indexing runs.
    pub async fn invalidate_lexicon(&self) {
        *self.lexicon.write().await = None;
    }

    async fn lexicon(&self) -> Option<Arc<Lexicon>> {
        if let Some(lex) = self.lexicon.read().await.as_ref() {
            return Some(lex.clone());
        }
        let mut corpus: Vec<(u64, String)> = Vec::new();
        let mut owner = HashMap::new();
        for (idx, store) in self.stores.iter().enumerate() {
            match scroll_all(store.as_ref(), &ChunkFilter::all_active()).await {
                Ok(points) => {
                    // Mirrored docs carry the same id in both collections;
                    // the first (cloud) occurrence wins.
                    for p in points {
                        if let std::collections::hash_map::Entry::Vacant(e) = owner.entry(p.id) {
                            e.insert(idx);
                            corpus.push((p.id, p.payload.content));
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        target: "rag_retrieval::retriever",
                        collection = store.collection(),
                        error = %e,
                        "lexical corpus scroll failed, degrading to vector-only"
                    );
                    return None;
                }
            }
        }
        let index = Bm25Index::build(corpus.iter().map(|(id, c)| (*id, c.as_str())));
        info!(
            target: "rag_retrieval::retriever",
            docs = index.len(),
            "lexical corpus built"
        );
        let lex = Arc::new(Lexicon { index, owner });
        *self.lexicon.write().await = Some(lex.clone());
        Some(lex)
    }

    /// Runs the hybrid search for one query under the given hints and
    /// returns the candidate pool, sorted by combined score (ties by id).
    pub async fn retrieve(
        &self,
        query: &str,
        hints: &RetrievalHints,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }
        let query_vector = self.embedder.embed(query).await?;

        let filter = ChunkFilter {
            content_type: hints.content_type,
            language: hints.language.clone(),
            ..Default::default()
        };

        // Vector leg, cloud first then local; dedup by id keeps the first
        // (cloud) occurrence.
        let mut pool: HashMap<u64, RetrievedChunk> = HashMap::new();
        for store in &self.stores {
            match store.vector_search(&query_vector, &filter, hints.top_k).await {
                Ok(hits) => {
                    for hit in hits {
                        pool.entry(hit.point.id).or_insert_with(|| RetrievedChunk {
                            id: hit.point.id,
                            score: 0.0,
                            vector_score: hit.score,
                            payload: hit.point.payload,
                            collection: store.collection().to_string(),
                        });
                    }
                }
                Err(e) => warn!(
                    target: "rag_retrieval::retriever",
                    collection = store.collection(),
                    error = %e,
                    "vector leg failed for collection"
                ),
            }
        }

        // Lexical leg. Unavailable corpus means w_vec = 1.0.
        let lexicon = self.lexicon().await;
        let (w_vec, w_bm25) = match &lexicon {
            Some(lex) if !lex.index.is_empty() => (self.weights.vector, self.weights.bm25),
            _ => (1.0, 0.0),
        };

        let mut bm25_scores: HashMap<u64, f32> = HashMap::new();
        if let Some(lex) = &lexicon {
            for (id, score) in lex.index.top_k(query, hints.top_k) {
                bm25_scores.insert(id, score);
                if pool.contains_key(&id) {
                    continue;
                }
                // Lexical-only candidate: fetch its payload from the owning
                // collection; the vector leg contributes zero.
                let Some(&owner_idx) = lex.owner.get(&id) else {
                    continue;
                };
                let store = &self.stores[owner_idx];
                match store.get_points(&[id], false).await {
                    Ok(points) => {
                        if let Some(p) = points.into_iter().next() {
                            if p.payload.is_deleted {
                                continue;
                            }
                            if let Some(ct) = hints.content_type {
                                if p.payload.content_type != ct {
                                    continue;
                                }
                            }
                            if let Some(lang) = &hints.language {
                                if p.payload.language.as_deref() != Some(lang.as_str()) {
                                    continue;
                                }
                            }
                            pool.insert(
                                id,
                                RetrievedChunk {
                                    id,
                                    score: 0.0,
                                    vector_score: 0.0,
                                    payload: p.payload,
                                    collection: store.collection().to_string(),
                                },
                            );
                        }
                    }
                    Err(e) => warn!(
                        target: "rag_retrieval::retriever",
                        id, error = %e,
                        "lexical candidate hydration failed"
                    ),
                }
            }
        }

        // Combined score per candidate; a dedup key hit in both legs simply
        // gets both contributions, which is the higher combined score.
        for candidate in pool.values_mut() {
            let b = bm25_scores.get(&candidate.id).copied().unwrap_or(0.0);
            candidate.score = w_vec * candidate.vector_score + w_bm25 * b;
        }

        let mut candidates: Vec<RetrievedChunk> = pool.into_values().collect();

        if hints.expand_sections {
            self.expand_sections(&mut candidates).await;
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        candidates.truncate(POOL_CAP);
        debug!(
            target: "rag_retrieval::retriever",
            pool = candidates.len(),
            w_vec, w_bm25,
            "hybrid retrieval complete"
        );
        Ok(candidates)
    }

    /// Pulls every sibling chunk of each candidate's `(file_path, section)`
    /// into the pool, before reranking. Expansion chunks carry no vector
    /// score and enter at the pool median.
    async fn expand_sections(&self, candidates: &mut Vec<RetrievedChunk>) {
        let median = pool_median(candidates);
        let mut seen: std::collections::HashSet<u64> =
            candidates.iter().map(|c| c.id).collect();

        let targets: Vec<(String, String, String)> = candidates
            .iter()
            .filter_map(|c| {
                let section = c.payload.section.clone()?;
                (!section.is_empty()).then(|| {
                    (
                        c.payload.file_path.clone(),
                        section,
                        c.collection.clone(),
                    )
                })
            })
            .collect();

        let mut visited: std::collections::HashSet<(String, String)> =
            std::collections::HashSet::new();
        for (file_path, section, collection) in targets {
            if !visited.insert((file_path.clone(), section.clone())) {
                continue;
            }
            let Some(store) = self
                .stores
                .iter()
                .find(|s| s.collection() == collection)
            else {
                continue;
            };
            let filter = ChunkFilter::for_section(file_path.clone(), section.clone());
            match scroll_all(store.as_ref(), &filter).await {
                Ok(points) => {
                    for p in points {
                        if seen.insert(p.id) {
                            candidates.push(RetrievedChunk {
                                id: p.id,
                                score: median,
                                vector_score: 0.0,
                                payload: p.payload,
                                collection: collection.clone(),
                            });
                        }
                    }
                }
                Err(e) => warn!(
                    target: "rag_retrieval::retriever",
                    file = %file_path,
                    section = %section,
                    error = %e,
                    "section expansion failed"
                ),
            }
        }
    }
}

fn pool_median(candidates: &[RetrievedChunk]) -> f32 {
    if candidates.is_empty() {
        return 0.0;
    }
    let mut scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    scores[scores.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{QueryIntent, classify};
    use rag_store::{
        Chunk, ChunkPayload, ChunkPoint, ContentType, HashEmbedder, MemoryStore,
    };

    fn doc_chunk(path: &str, line: u32, section: &str, content: &str) -> Chunk {
        Chunk::from_payload(ChunkPayload {
            content: content.to_string(),
            file_path: path.to_string(),
            line_start: line,
            line_end: line + 1,
            content_type: ContentType::Text,
            language: Some("markdown".to_string()),
            section: Some(section.to_string()),
            doc_type: None,
            code_type: None,
            name: None,
            class_name: None,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        })
    }

    async fn seeded_retriever() -> Retriever {
        let embedder: Arc<dyn rag_store::EmbeddingsProvider> = Arc::new(HashEmbedder::new(64));
        let store = Arc::new(MemoryStore::new("local"));
        store.ensure_collection(64).await.unwrap();

        let chunks = vec![
            doc_chunk("docs/flows.md", 3, "Checkout", "checkout flow validates the cart"),
            doc_chunk("docs/flows.md", 9, "Checkout", "payment capture happens last"),
            doc_chunk("docs/other.md", 2, "Misc", "unrelated content entirely"),
        ];
        let mut points = Vec::new();
        for c in chunks {
            let vector = embedder.embed(&c.payload.content).await.unwrap();
            points.push(ChunkPoint { chunk: c, vector });
        }
        store.upsert(points).await.unwrap();

        Retriever::new(
            vec![store as Arc<dyn ChunkStore>],
            embedder,
            HybridWeights::default(),
        )
    }

    #[tokio::test]
    async fn hybrid_search_ranks_lexical_and_vector_matches_first() {
        let retriever = seeded_retriever().await;
        let analysis = classify("checkout flow", 10);
        let pool = retriever.retrieve("checkout flow", &analysis.hints).await.unwrap();
        assert!(!pool.is_empty());
        assert_eq!(pool[0].payload.file_path, "docs/flows.md");
        assert_eq!(pool[0].collection, "local");
    }

    #[tokio::test]
    async fn section_expansion_pulls_sibling_chunks() {
        let retriever = seeded_retriever().await;
        let analysis = classify("explain the checkout flow", 1);
        assert_eq!(analysis.intent, QueryIntent::Explanation);
        let pool = retriever
            .retrieve("explain the checkout flow", &analysis.hints)
            .await
            .unwrap();
        // Both Checkout-section chunks must be present even with top_k = 1.
        let checkout: Vec<_> = pool
            .iter()
            .filter(|c| c.payload.section.as_deref() == Some("Checkout"))
            .collect();
        assert_eq!(checkout.len(), 2);
    }

    #[tokio::test]
    async fn deleted_chunks_never_reach_the_pool() {
        let retriever = seeded_retriever().await;
        let store = retriever.stores[0].clone();
        store
            .soft_delete(&ChunkFilter::for_file("docs/flows.md"))
            .await
            .unwrap();
        retriever.invalidate_lexicon().await;

        let analysis = classify("checkout flow", 10);
        let pool = retriever.retrieve("checkout flow", &analysis.hints).await.unwrap();
        assert!(pool.iter().all(|c| c.payload.file_path != "docs/flows.md"));
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let retriever = seeded_retriever().await;
        let analysis = classify("x", 10);
        let err = retriever.retrieve("   ", &analysis.hints).await.unwrap_err();
        assert!(matches!(err, RetrievalError::EmptyQuery));
    }
}
