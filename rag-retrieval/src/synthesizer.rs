//! Intent-specific answer assembly with citations.
//!
//! The synthesizer only rearranges retrieved evidence; it never authors text
//! that is not present in a chunk. Every emitted chunk contributes one
//! citation, appended in first-reference order.

use crate::classifier::QueryIntent;
use crate::retriever::RetrievedChunk;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Citation {
    pub file_path: String,
    pub line_start: u32,
    pub line_end: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SynthesizedAnswer {
    pub intent: QueryIntent,
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Dispatches on intent. Comparison queries go through
/// [`synthesize_comparison`] instead, which needs both operand pools.
pub fn synthesize(
    intent: QueryIntent,
    chunks: &[RetrievedChunk],
) -> SynthesizedAnswer {
    let answer = match intent {
        QueryIntent::Enumeration => synthesize_enumeration(chunks),
        QueryIntent::CodeSearch => synthesize_code_search(chunks),
        QueryIntent::Factual => synthesize_factual(chunks),
        QueryIntent::Explanation | QueryIntent::Comparison => synthesize_explanation(chunks),
    };
    debug!(
        target: "rag_retrieval::synthesizer",
        intent = intent.as_str(),
        citations = answer.citations.len(),
        "synthesized answer"
    );
    answer
}

struct Citations {
    list: Vec<Citation>,
}

impl Citations {
    fn new() -> Self {
        Self { list: Vec::new() }
    }

    /// First-reference order; one citation per chunk.
    fn add(&mut self, chunk: &RetrievedChunk) {
        let citation = Citation {
            file_path: chunk.payload.file_path.clone(),
            line_start: chunk.payload.line_start,
            line_end: chunk.payload.line_end,
            section: chunk.payload.section.clone(),
        };
        if !self.list.contains(&citation) {
            self.list.push(citation);
        }
    }
}

/// Reconstructs a complete numbered list from the pool: collect, sort by
/// index, deduplicate keeping the first occurrence, and report completeness.
pub fn synthesize_enumeration(chunks: &[RetrievedChunk]) -> SynthesizedAnswer {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let item_re = ITEM.get_or_init(|| Regex::new(r"(?m)^\s*(\d+)\.\s(.*)$").expect("item regex"));

    let mut items: BTreeMap<u64, (String, usize)> = BTreeMap::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        for cap in item_re.captures_iter(&chunk.payload.content) {
            if let Ok(n) = cap[1].parse::<u64>() {
                items.entry(n).or_insert_with(|| (cap[2].trim().to_string(), idx));
            }
        }
    }

    if items.is_empty() {
        // No numbered items anywhere: fall back to document-order prose.
        return synthesize_explanation(chunks);
    }

    let mut citations = Citations::new();
    let mut lines = Vec::with_capacity(items.len());
    for (n, (text, idx)) in &items {
        lines.push(format!("{n}. {text}"));
        citations.add(&chunks[*idx]);
    }

    let max = *items.keys().last().expect("non-empty items");
    let count = items.len() as u64;
    let note = if max == count && items.keys().next() == Some(&1) {
        format!("Complete (1..{max})")
    } else {
        let missing: Vec<String> = (1..=max)
            .filter(|n| !items.contains_key(n))
            .map(|n| n.to_string())
            .collect();
        format!("Missing items: {}", missing.join(", "))
    };
    lines.push(String::new());
    lines.push(note);

    SynthesizedAnswer {
        intent: QueryIntent::Enumeration,
        text: lines.join("\n"),
        citations: citations.list,
    }
}

/// Merges chunks in document order, grouped per file, dropping the shorter
/// of any two chunks whose line ranges intersect. Line breaks inside chunk
/// content are preserved verbatim.
pub fn synthesize_explanation(chunks: &[RetrievedChunk]) -> SynthesizedAnswer {
    let mut by_file: Vec<(String, Vec<&RetrievedChunk>)> = Vec::new();
    for chunk in chunks {
        match by_file.iter_mut().find(|(f, _)| *f == chunk.payload.file_path) {
            Some((_, list)) => list.push(chunk),
            None => by_file.push((chunk.payload.file_path.clone(), vec![chunk])),
        }
    }

    let mut citations = Citations::new();
    let mut sections = Vec::new();
    for (file, mut list) in by_file {
        list.sort_by_key(|c| c.payload.line_start);

        // Overlapping ranges: keep the longer chunk, drop the shorter.
        let mut kept: Vec<&RetrievedChunk> = Vec::new();
        for chunk in list {
            if let Some(last) = kept.last() {
                let overlaps = chunk.payload.line_start <= last.payload.line_end;
                if overlaps {
                    let longer_incoming = span(chunk) > span(last);
                    if longer_incoming {
                        kept.pop();
                    } else {
                        continue;
                    }
                }
            }
            kept.push(chunk);
        }

        let mut body = Vec::new();
        for chunk in kept {
            body.push(chunk.payload.content.clone());
            citations.add(chunk);
        }
        sections.push(format!("## {file}\n\n{}", body.join("\n\n")));
    }

    SynthesizedAnswer {
        intent: QueryIntent::Explanation,
        text: sections.join("\n\n"),
        citations: citations.list,
    }
}

fn span(chunk: &RetrievedChunk) -> u32 {
    chunk.payload.line_end.saturating_sub(chunk.payload.line_start)
}

/// Fenced code blocks grouped per file, each prefixed with its location and
/// `class.name` locator when present.
pub fn synthesize_code_search(chunks: &[RetrievedChunk]) -> SynthesizedAnswer {
    let mut by_file: Vec<(String, Vec<&RetrievedChunk>)> = Vec::new();
    for chunk in chunks {
        match by_file.iter_mut().find(|(f, _)| *f == chunk.payload.file_path) {
            Some((_, list)) => list.push(chunk),
            None => by_file.push((chunk.payload.file_path.clone(), vec![chunk])),
        }
    }

    let mut citations = Citations::new();
    let mut blocks = Vec::new();
    for (file, list) in by_file {
        for chunk in list {
            let p = &chunk.payload;
            let mut header = format!("{file}:{}-{}", p.line_start, p.line_end);
            match (&p.class_name, &p.name) {
                (Some(class), Some(name)) => header.push_str(&format!(" ({class}.{name})")),
                (None, Some(name)) => header.push_str(&format!(" ({name})")),
                _ => {}
            }
            let lang = p.language.as_deref().unwrap_or("");
            blocks.push(format!("{header}\n```{lang}\n{}\n```", p.content));
            citations.add(chunk);
        }
    }

    SynthesizedAnswer {
        intent: QueryIntent::CodeSearch,
        text: blocks.join("\n\n"),
        citations: citations.list,
    }
}

/// The single highest-ranked chunk, verbatim.
pub fn synthesize_factual(chunks: &[RetrievedChunk]) -> SynthesizedAnswer {
    let mut citations = Citations::new();
    let text = match chunks.first() {
        Some(top) => {
            citations.add(top);
            top.payload.content.clone()
        }
        None => String::new(),
    };
    SynthesizedAnswer {
        intent: QueryIntent::Factual,
        text,
        citations: citations.list,
    }
}

/// Two explanation syntheses side by side, one per operand.
pub fn synthesize_comparison(
    operands: (&str, &str),
    left: &[RetrievedChunk],
    right: &[RetrievedChunk],
) -> SynthesizedAnswer {
    let left_answer = synthesize_explanation(left);
    let right_answer = synthesize_explanation(right);

    let mut citations = left_answer.citations;
    for c in right_answer.citations {
        if !citations.contains(&c) {
            citations.push(c);
        }
    }

    SynthesizedAnswer {
        intent: QueryIntent::Comparison,
        text: format!(
            "# {}\n\n{}\n\n# {}\n\n{}",
            operands.0, left_answer.text, operands.1, right_answer.text
        ),
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::{Chunk, ChunkPayload, CodeType, ContentType};

    fn chunk(path: &str, lines: (u32, u32), section: Option<&str>, content: &str) -> RetrievedChunk {
        let c = Chunk::from_payload(ChunkPayload {
            content: content.to_string(),
            file_path: path.to_string(),
            line_start: lines.0,
            line_end: lines.1,
            content_type: ContentType::Text,
            language: Some("markdown".to_string()),
            section: section.map(|s| s.to_string()),
            doc_type: None,
            code_type: None,
            name: None,
            class_name: None,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        });
        RetrievedChunk {
            id: c.id,
            score: 1.0,
            vector_score: 1.0,
            payload: c.payload,
            collection: "local".to_string(),
        }
    }

    #[test]
    fn enumeration_rebuilds_a_complete_ordered_list() {
        let pool = vec![
            chunk("docs/a.md", (3, 5), Some("Features"), "1. Alpha\n2. Beta\n3. Gamma"),
            // A duplicate item 2 from another chunk must not shadow the first.
            chunk("docs/b.md", (10, 10), Some("Copy"), "2. Bravo"),
        ];
        let answer = synthesize_enumeration(&pool);
        let lines: Vec<&str> = answer.text.lines().collect();
        assert_eq!(&lines[..3], &["1. Alpha", "2. Beta", "3. Gamma"]);
        assert!(answer.text.contains("Complete (1..3)"));
        assert_eq!(answer.citations[0].file_path, "docs/a.md");
        assert_eq!((answer.citations[0].line_start, answer.citations[0].line_end), (3, 5));
    }

    #[test]
    fn enumeration_reports_missing_indices() {
        let pool = vec![chunk("docs/a.md", (1, 3), None, "1. One\n2. Two\n5. Five")];
        let answer = synthesize_enumeration(&pool);
        assert!(answer.text.contains("Missing items: 3, 4"));
    }

    #[test]
    fn explanation_orders_by_file_and_line_and_drops_overlaps() {
        let pool = vec![
            chunk("docs/a.md", (10, 20), None, "long middle part"),
            chunk("docs/a.md", (1, 4), None, "opening"),
            // Overlaps (10, 20) but is shorter: dropped.
            chunk("docs/a.md", (12, 14), None, "short overlap"),
        ];
        let answer = synthesize_explanation(&pool);
        assert!(answer.text.contains("## docs/a.md"));
        let opening = answer.text.find("opening").unwrap();
        let middle = answer.text.find("long middle part").unwrap();
        assert!(opening < middle);
        assert!(!answer.text.contains("short overlap"));
        assert_eq!(answer.citations.len(), 2);
    }

    #[test]
    fn code_search_emits_located_fenced_blocks() {
        let mut code = chunk("src/x.py", (1, 2), None, "def greet(self):\n    return \"hi\"");
        code.payload.content_type = ContentType::Code;
        code.payload.language = Some("python".to_string());
        code.payload.code_type = Some(CodeType::Method);
        code.payload.name = Some("greet".to_string());
        code.payload.class_name = Some("Greeter".to_string());

        let answer = synthesize_code_search(&[code]);
        assert!(answer.text.starts_with("src/x.py:1-2 (Greeter.greet)"));
        assert!(answer.text.contains("```python"));
    }

    #[test]
    fn factual_returns_top_chunk_verbatim() {
        let pool = vec![
            chunk("docs/a.md", (7, 7), None, "The default port is 6334."),
            chunk("docs/b.md", (1, 1), None, "irrelevant"),
        ];
        let answer = synthesize_factual(&pool);
        assert_eq!(answer.text, "The default port is 6334.");
        assert_eq!(answer.citations.len(), 1);
    }

    #[test]
    fn comparison_places_both_operands_under_headings() {
        let left = vec![chunk("docs/a.md", (1, 2), None, "soft delete keeps data")];
        let right = vec![chunk("docs/b.md", (4, 5), None, "prune removes it for good")];
        let answer = synthesize_comparison(("soft delete", "prune"), &left, &right);
        assert!(answer.text.contains("# soft delete"));
        assert!(answer.text.contains("# prune"));
        assert_eq!(answer.citations.len(), 2);
    }

    #[test]
    fn empty_pool_yields_empty_answer_not_error() {
        let answer = synthesize(QueryIntent::Factual, &[]);
        assert!(answer.text.is_empty());
        assert!(answer.citations.is_empty());
    }
}
