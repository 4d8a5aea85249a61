//! Retrieval pipeline: intent classification, hybrid search with section
//! expansion, cross-encoder reranking, and intent-specific answer synthesis.

pub mod bm25;
pub mod classifier;
pub mod errors;
pub mod pipeline;
pub mod reranker;
pub mod retriever;
pub mod synthesizer;

pub use bm25::Bm25Index;
pub use classifier::{QueryAnalysis, QueryIntent, RetrievalHints, classify, classify_with_intent};
pub use errors::RetrievalError;
pub use pipeline::{QueryPipeline, SearchOverrides};
pub use reranker::{HttpCrossEncoder, NoopReranker, Reranker};
pub use retriever::{HybridWeights, RetrievedChunk, Retriever};
pub use synthesizer::{Citation, SynthesizedAnswer, synthesize, synthesize_comparison};
