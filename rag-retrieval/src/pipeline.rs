//! End-to-end query pipeline: classify, retrieve, rerank, synthesize.
//!
//! This is the one entry point the tool surface calls. Queries observe a
//! deadline; indexing paths do not go through here.

use crate::classifier::{QueryAnalysis, QueryIntent, classify, classify_with_intent};
use crate::errors::RetrievalError;
use crate::reranker::Reranker;
use crate::retriever::{RetrievedChunk, Retriever};
use crate::synthesizer::{SynthesizedAnswer, synthesize, synthesize_comparison};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct QueryPipeline {
    retriever: Retriever,
    reranker: Arc<dyn Reranker>,
    rerank_top_k: usize,
    deadline: Duration,
}

impl QueryPipeline {
    pub fn new(
        retriever: Retriever,
        reranker: Arc<dyn Reranker>,
        rerank_top_k: usize,
        deadline: Duration,
    ) -> Self {
        Self {
            retriever,
            reranker,
            rerank_top_k,
            deadline,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// C5 → C6 → C7: classified hybrid search returning scored chunks.
    pub async fn search(
        &self,
        query: &str,
        search_top_k: usize,
        overrides: SearchOverrides,
    ) -> Result<(QueryAnalysis, Vec<RetrievedChunk>), RetrievalError> {
        let mut analysis = classify(query, search_top_k);
        if let Some(ct) = overrides.content_type {
            analysis.hints.content_type = Some(ct);
        }
        if let Some(language) = overrides.language {
            analysis.hints.language = Some(language);
        }
        if let Some(top_k) = overrides.top_k {
            analysis.hints.top_k = top_k;
        }

        let chunks = self
            .with_deadline(self.retrieve_reranked(query, &analysis))
            .await?;
        Ok((analysis, chunks))
    }

    /// C5 → C6 → C7 → C8: full question answering.
    pub async fn answer(
        &self,
        question: &str,
        search_top_k: usize,
        forced_intent: Option<QueryIntent>,
    ) -> Result<SynthesizedAnswer, RetrievalError> {
        let analysis = match forced_intent {
            Some(intent) => classify_with_intent(question, search_top_k, intent),
            None => classify(question, search_top_k),
        };
        info!(
            target: "rag_retrieval::pipeline",
            intent = analysis.intent.as_str(),
            confidence = analysis.confidence,
            "answering question"
        );

        // Comparison with two clean operands runs one retrieval per side.
        if analysis.intent == QueryIntent::Comparison && analysis.hints.subqueries.len() == 2 {
            let operands = analysis.hints.subqueries.clone();
            let left = self
                .with_deadline(self.retrieve_reranked(&operands[0], &analysis))
                .await?;
            let right = self
                .with_deadline(self.retrieve_reranked(&operands[1], &analysis))
                .await?;
            return Ok(synthesize_comparison(
                (&operands[0], &operands[1]),
                &left,
                &right,
            ));
        }

        let chunks = self
            .with_deadline(self.retrieve_reranked(question, &analysis))
            .await?;
        Ok(synthesize(analysis.intent, &chunks))
    }

    async fn retrieve_reranked(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
    ) -> Result<Vec<RetrievedChunk>, RetrievalError> {
        let pool = self.retriever.retrieve(query, &analysis.hints).await?;
        if analysis.hints.rerank {
            self.reranker.rerank(query, pool, self.rerank_top_k).await
        } else {
            let mut pool = pool;
            pool.truncate(self.rerank_top_k);
            Ok(pool)
        }
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, RetrievalError>>,
    ) -> Result<T, RetrievalError> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target: "rag_retrieval::pipeline",
                    deadline_s = self.deadline.as_secs(),
                    "query deadline exceeded"
                );
                Err(RetrievalError::Rerank(format!(
                    "query deadline of {}s exceeded",
                    self.deadline.as_secs()
                )))
            }
        }
    }
}

/// Caller-supplied restrictions for the `search` tool.
#[derive(Debug, Clone, Default)]
pub struct SearchOverrides {
    pub content_type: Option<rag_store::ContentType>,
    pub language: Option<String>,
    pub top_k: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reranker::NoopReranker;
    use crate::retriever::HybridWeights;
    use rag_store::{
        Chunk, ChunkPayload, ChunkPoint, ChunkStore, ContentType, EmbeddingsProvider,
        HashEmbedder, MemoryStore,
    };

    async fn pipeline_with_features_doc() -> QueryPipeline {
        let embedder = Arc::new(HashEmbedder::new(64));
        let store = Arc::new(MemoryStore::new("local"));
        store.ensure_collection(64).await.unwrap();

        let list = Chunk::from_payload(ChunkPayload {
            content: "1. Alpha\n2. Beta\n3. Gamma".to_string(),
            file_path: "docs/a.md".to_string(),
            line_start: 3,
            line_end: 5,
            content_type: ContentType::List,
            language: Some("markdown".to_string()),
            section: Some("Features".to_string()),
            doc_type: None,
            code_type: None,
            name: None,
            class_name: None,
            imports: Vec::new(),
            list_length: Some(3),
            is_complete: Some(true),
            is_deleted: false,
            content_hash: String::new(),
        });
        let vector = embedder.embed(&list.payload.content).await.unwrap();
        store
            .upsert(vec![ChunkPoint { chunk: list, vector }])
            .await
            .unwrap();

        let retriever = Retriever::new(
            vec![store as Arc<dyn ChunkStore>],
            embedder,
            HybridWeights::default(),
        );
        QueryPipeline::new(
            retriever,
            Arc::new(NoopReranker),
            10,
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn ask_list_query_yields_ordered_items_with_completeness_note() {
        let pipeline = pipeline_with_features_doc().await;
        let answer = pipeline.answer("list the features", 20, None).await.unwrap();
        assert_eq!(answer.intent, QueryIntent::Enumeration);
        let lines: Vec<&str> = answer.text.lines().collect();
        assert_eq!(&lines[..3], &["1. Alpha", "2. Beta", "3. Gamma"]);
        assert!(answer.text.contains("Complete (1..3)"));
        assert_eq!(answer.citations.len(), 1);
        assert_eq!(answer.citations[0].file_path, "docs/a.md");
        assert_eq!(
            (answer.citations[0].line_start, answer.citations[0].line_end),
            (3, 5)
        );
    }

    #[tokio::test]
    async fn explain_forces_explanation_intent() {
        let pipeline = pipeline_with_features_doc().await;
        let answer = pipeline
            .answer("features", 20, Some(QueryIntent::Explanation))
            .await
            .unwrap();
        assert_eq!(answer.intent, QueryIntent::Explanation);
        assert!(answer.text.contains("## docs/a.md"));
    }
}
