//! Embedding providers.
//!
//! One model serves docs and code so the collection keeps a single vector
//! dimension; a mismatch is a configuration error caught at startup. Inputs
//! are lightly normalized (NFC, trailing whitespace trimmed) before
//! embedding, and batches preserve input order.

use crate::errors::StoreError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use unicode_normalization::UnicodeNormalization;

pub mod hash;
pub mod http;

pub use hash::HashEmbedder;
pub use http::HttpEmbedder;

/// Concurrent in-flight requests for providers without a batch endpoint.
const EMBED_CONCURRENCY: usize = 4;

/// Provider interface for embedding generation.
///
/// Implementations are shared process-wide behind an `Arc`; they must be
/// safe for concurrent callers.
#[async_trait]
pub trait EmbeddingsProvider: Send + Sync {
    /// Name of the backing model, for logs and startup validation.
    fn model(&self) -> &str;

    /// Output dimension; uniform across the collection.
    fn dim(&self) -> usize;

    /// Embeds one normalized input into an L2-normalized vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError>;

    /// Embeds a batch, preserving input order. The default fans single
    /// calls out with bounded concurrency; providers with a real batch API
    /// override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, StoreError> {
        let futures: Vec<_> = texts.iter().map(|text| self.embed(text)).collect();
        let results: Vec<Result<Vec<f32>, StoreError>> = stream::iter(futures)
            .buffered(EMBED_CONCURRENCY)
            .collect()
            .await;
        results.into_iter().collect()
    }
}

/// Light input normalization applied before every embedding call:
/// UTF-8 NFC plus trailing-whitespace trim.
pub fn normalize_input(text: &str) -> String {
    text.nfc().collect::<String>().trim_end().to_string()
}

/// Scales a vector to unit L2 norm in place; zero vectors are left as-is.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_recomposes() {
        // U+0065 U+0301 recomposes to U+00E9 under NFC.
        assert_eq!(normalize_input("caf\u{0065}\u{0301}  \n"), "caf\u{00e9}");
    }

    #[test]
    fn l2_normalize_yields_unit_norm() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }
}
