//! In-memory BM25 scoring for the lexical leg of hybrid retrieval.
//!
//! The corpus is the set of active chunk contents, scrolled once from the
//! store and cached by the retriever. Scores returned by [`Bm25Index::top_k`]
//! are min-max normalized per query into [0, 1], ready for the weighted
//! combination with vector scores.

use std::collections::HashMap;

const K1: f32 = 1.2;
const B: f32 = 0.75;

struct DocEntry {
    id: u64,
    term_freq: HashMap<String, u32>,
    len: u32,
}

pub struct Bm25Index {
    docs: Vec<DocEntry>,
    doc_freq: HashMap<String, u32>,
    avg_len: f32,
}

impl Bm25Index {
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, &'a str)>,
    {
        let mut docs = Vec::new();
        let mut doc_freq: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0u64;

        for (id, content) in entries {
            let mut term_freq: HashMap<String, u32> = HashMap::new();
            let mut len = 0u32;
            for token in tokenize(content) {
                *term_freq.entry(token).or_insert(0) += 1;
                len += 1;
            }
            for term in term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            total_len += len as u64;
            docs.push(DocEntry { id, term_freq, len });
        }

        let avg_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };
        Self {
            docs,
            doc_freq,
            avg_len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Scores the query against every document and returns the top `k` as
    /// `(id, normalized_score)`, ties broken by ascending id.
    pub fn top_k(&self, query: &str, k: usize) -> Vec<(u64, f32)> {
        if self.docs.is_empty() || k == 0 {
            return Vec::new();
        }
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let n = self.docs.len() as f32;
        let mut scored: Vec<(u64, f32)> = Vec::new();
        for doc in &self.docs {
            let mut score = 0.0f32;
            for term in &terms {
                let tf = *doc.term_freq.get(term).unwrap_or(&0) as f32;
                if tf == 0.0 {
                    continue;
                }
                let df = *self.doc_freq.get(term).unwrap_or(&0) as f32;
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                let denom = tf + K1 * (1.0 - B + B * doc.len as f32 / self.avg_len.max(1.0));
                score += idf * tf * (K1 + 1.0) / denom;
            }
            if score > 0.0 {
                scored.push((doc.id, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        // Min-max normalization per query.
        if let (Some(&(_, max)), Some(&(_, min))) = (scored.first(), scored.last()) {
            let range = max - min;
            for (_, s) in scored.iter_mut() {
                *s = if range > 0.0 { (*s - min) / range } else { 1.0 };
            }
        }
        scored
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> Bm25Index {
        Bm25Index::build([
            (1u64, "the indexing pipeline chunks markdown documents"),
            (2u64, "soft delete marks chunks without removing them"),
            (3u64, "vector search returns the nearest embeddings"),
        ])
    }

    #[test]
    fn matching_terms_rank_the_right_document_first() {
        let hits = index().top_k("soft delete chunks", 3);
        assert_eq!(hits[0].0, 2);
        assert!((hits[0].1 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn scores_are_min_max_normalized() {
        let hits = index().top_k("chunks pipeline", 3);
        assert!(hits.len() >= 2);
        assert!((hits[0].1 - 1.0).abs() < f32::EPSILON);
        assert!((hits.last().unwrap().1 - 0.0).abs() < f32::EPSILON);
        for (_, s) in &hits {
            assert!((0.0..=1.0).contains(s));
        }
    }

    #[test]
    fn no_match_means_empty_result() {
        assert!(index().top_k("zzz qqq", 3).is_empty());
        let empty = Bm25Index::build(Vec::<(u64, &str)>::new());
        assert!(empty.top_k("anything", 3).is_empty());
    }
}
