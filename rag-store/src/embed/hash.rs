//! Deterministic hash-based embedder for tests.
//!
//! Projects token hashes into a fixed-dimension bag-of-words vector, so
//! identical texts embed identically and overlapping texts land near each
//! other. No model, no network.

use super::{EmbeddingsProvider, l2_normalize, normalize_input};
use crate::errors::StoreError;
use async_trait::async_trait;

pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingsProvider for HashEmbedder {
    fn model(&self) -> &str {
        "hash-embedder"
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, StoreError> {
        let normalized = normalize_input(text);
        let mut v = vec![0.0f32; self.dim];
        for token in normalized
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let digest = blake3::hash(token.to_lowercase().as_bytes());
            let bytes: [u8; 8] = digest.as_bytes()[..8].try_into().expect("digest length");
            let h = u64::from_le_bytes(bytes);
            v[(h % self.dim as u64) as usize] += 1.0;
        }
        l2_normalize(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_texts_embed_identically() {
        let e = HashEmbedder::new(16);
        let a = e.embed("list the features").await.unwrap();
        let b = e.embed("list the features").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn overlapping_texts_are_closer_than_disjoint_ones() {
        let e = HashEmbedder::new(64);
        let q = e.embed("greet function").await.unwrap();
        let near = e.embed("def greet(self): return hi").await.unwrap();
        let far = e.embed("unrelated words entirely").await.unwrap();
        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&q, &near) > dot(&q, &far));
    }
}
