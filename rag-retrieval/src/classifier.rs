//! Query intent classification.
//!
//! Maps a query to an intent plus retrieval hints through regex pattern
//! banks, checked in priority order (the most specific intents first).
//! Classification is pure: no I/O, no state.

use rag_store::ContentType;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Enumeration,
    Explanation,
    CodeSearch,
    Comparison,
    Factual,
}

impl QueryIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enumeration => "enumeration",
            Self::Explanation => "explanation",
            Self::CodeSearch => "code_search",
            Self::Comparison => "comparison",
            Self::Factual => "factual",
        }
    }
}

/// Retrieval strategy knobs chosen by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHints {
    pub top_k: usize,
    pub expand_sections: bool,
    pub rerank: bool,
    /// Restrict the search to one content type (code search).
    pub content_type: Option<ContentType>,
    /// Restrict the search to one language (caller override).
    pub language: Option<String>,
    /// Comparison operands; two entries when the query splits cleanly.
    pub subqueries: Vec<String>,
    /// Merge contiguous chunks at synthesis time (explanation).
    pub merge_contiguous: bool,
}

#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub intent: QueryIntent,
    pub confidence: f32,
    pub keywords: Vec<String>,
    pub hints: RetrievalHints,
}

const ENUMERATION_PATTERNS: &[&str] = &[
    r"\blist\s+all\b",
    r"\bhow\s+many\b",
    r"\bwhat\s+are\s+all\b",
    r"\bwhat\s+are\s+the\s+\d+\b",
    r"\benumerate\b",
    r"\bshow\s+me\s+all\b",
    r"\bcomplete\s+list\b",
    r"\ball\s+of\s+the\b",
    r"\bgive\s+me\s+all\b",
    r"\blist\s+the\b",
];

const CODE_SEARCH_PATTERNS: &[&str] = &[
    r"\bshow\s+me.*code\b",
    r"\bshow\s+code\b",
    r"\bfind.*function\b",
    r"\bwhere\s+is.*implementation\b",
    r"\bcode\s+for\b",
    r"\bfind.*method\b",
    r"\bimplementation\s+of\b",
    r"\bclass.*definition\b",
    r"\bfunction.*signature\b",
    r"`[^`]+`",
];

const COMPARISON_PATTERNS: &[&str] = &[
    r"\bdifference\s+between\b",
    r"\bcompare\b",
    r"\bvs\.?\b",
    r"\bversus\b",
    r"\bwhat\s+is\s+different\b",
    r"\bsimilarities\s+and\s+differences\b",
];

const FACTUAL_PATTERNS: &[&str] = &[
    r"\bwhat\s+is\s+the\s+default\b",
    r"\bdefault\s+value\b",
    r"\bwhich\s+port\b",
    r"\bwhat\s+port\b",
    r"\bwhich\s+version\b",
];

const EXPLANATION_PATTERNS: &[&str] = &[
    r"\bwhat\s+is\b",
    r"\bexplain\b",
    r"\bhow\s+does\b",
    r"\bwhy\b",
    r"\bdescribe\b",
    r"\bwhat\s+does\b",
    r"\btell\s+me\s+about\b",
];

fn bank(patterns: &'static [&'static str], cell: &'static OnceLock<Vec<Regex>>) -> &'static [Regex] {
    cell.get_or_init(|| {
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("intent pattern"))
            .collect()
    })
}

fn banks() -> [(&'static [Regex], QueryIntent, f32); 5] {
    static ENUMERATION: OnceLock<Vec<Regex>> = OnceLock::new();
    static CODE: OnceLock<Vec<Regex>> = OnceLock::new();
    static COMPARISON: OnceLock<Vec<Regex>> = OnceLock::new();
    static FACTUAL: OnceLock<Vec<Regex>> = OnceLock::new();
    static EXPLANATION: OnceLock<Vec<Regex>> = OnceLock::new();
    [
        (bank(ENUMERATION_PATTERNS, &ENUMERATION), QueryIntent::Enumeration, 0.9),
        (bank(CODE_SEARCH_PATTERNS, &CODE), QueryIntent::CodeSearch, 0.9),
        (bank(COMPARISON_PATTERNS, &COMPARISON), QueryIntent::Comparison, 0.85),
        (bank(FACTUAL_PATTERNS, &FACTUAL), QueryIntent::Factual, 0.85),
        (bank(EXPLANATION_PATTERNS, &EXPLANATION), QueryIntent::Explanation, 0.8),
    ]
}

/// Classifies a query. `search_top_k` is the configured default pool size;
/// intents override it per the strategy table.
pub fn classify(query: &str, search_top_k: usize) -> QueryAnalysis {
    let lower = query.to_lowercase();

    for (patterns, intent, base) in banks() {
        let matched: Vec<&Regex> = patterns.iter().filter(|re| re.is_match(&lower)).collect();
        if matched.is_empty() {
            continue;
        }
        let confidence = (base + matched.len() as f32 * 0.05).min(1.0);
        let keywords = matched
            .iter()
            .flat_map(|re| re.find_iter(&lower).map(|m| m.as_str().to_string()))
            .collect();
        let analysis = QueryAnalysis {
            intent,
            confidence,
            keywords,
            hints: hints_for(intent, query, search_top_k),
        };
        debug!(
            target: "rag_retrieval::classifier",
            intent = intent.as_str(),
            confidence,
            "classified query"
        );
        return analysis;
    }

    // No pattern matched: default to explanation with low confidence.
    QueryAnalysis {
        intent: QueryIntent::Explanation,
        confidence: 0.5,
        keywords: Vec::new(),
        hints: hints_for(QueryIntent::Explanation, query, search_top_k),
    }
}

/// Classification with the intent pinned by the caller (the `explain` tool);
/// hints follow the forced intent, confidence is 1.
pub fn classify_with_intent(
    query: &str,
    search_top_k: usize,
    intent: QueryIntent,
) -> QueryAnalysis {
    QueryAnalysis {
        intent,
        confidence: 1.0,
        keywords: Vec::new(),
        hints: hints_for(intent, query, search_top_k),
    }
}

fn hints_for(intent: QueryIntent, query: &str, search_top_k: usize) -> RetrievalHints {
    match intent {
        QueryIntent::Enumeration => RetrievalHints {
            top_k: search_top_k.clamp(20, 40),
            expand_sections: true,
            rerank: true,
            content_type: None,
            language: None,
            subqueries: Vec::new(),
            merge_contiguous: false,
        },
        QueryIntent::Explanation => RetrievalHints {
            top_k: search_top_k,
            expand_sections: true,
            rerank: true,
            content_type: None,
            language: None,
            subqueries: Vec::new(),
            merge_contiguous: true,
        },
        QueryIntent::CodeSearch => RetrievalHints {
            top_k: search_top_k,
            expand_sections: false,
            rerank: true,
            content_type: Some(ContentType::Code),
            language: None,
            subqueries: Vec::new(),
            merge_contiguous: false,
        },
        QueryIntent::Comparison => RetrievalHints {
            top_k: search_top_k,
            expand_sections: true,
            rerank: true,
            content_type: None,
            language: None,
            subqueries: comparison_operands(query),
            merge_contiguous: false,
        },
        QueryIntent::Factual => RetrievalHints {
            top_k: 5,
            expand_sections: false,
            rerank: true,
            content_type: None,
            language: None,
            subqueries: Vec::new(),
            merge_contiguous: false,
        },
    }
}

/// Splits a comparison query into its two operands; empty when the shape is
/// not recognized (the query then runs as a single retrieval).
fn comparison_operands(query: &str) -> Vec<String> {
    static BETWEEN: OnceLock<Regex> = OnceLock::new();
    static VS: OnceLock<Regex> = OnceLock::new();
    let between = BETWEEN.get_or_init(|| {
        Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+(.+?)[\?\.]?$").expect("between regex")
    });
    let vs = VS
        .get_or_init(|| Regex::new(r"(?i)^(.*?)\s+(?:vs\.?|versus)\s+(.*?)[\?\.]?$").expect("vs regex"));

    for re in [between, vs] {
        if let Some(cap) = re.captures(query.trim()) {
            let a = cap[1].trim().to_string();
            let b = cap[2].trim().to_string();
            if !a.is_empty() && !b.is_empty() {
                return vec![a, b];
            }
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_queries_widen_the_pool_and_expand() {
        let a = classify("list all supported flows", 20);
        assert_eq!(a.intent, QueryIntent::Enumeration);
        assert!(a.confidence >= 0.9);
        assert!(a.hints.expand_sections);
        assert!(a.hints.top_k >= 20 && a.hints.top_k <= 40);
    }

    #[test]
    fn backtick_identifiers_mean_code_search() {
        let a = classify("where does `ensure_collection` get called", 20);
        assert_eq!(a.intent, QueryIntent::CodeSearch);
        assert_eq!(a.hints.content_type, Some(rag_store::ContentType::Code));
        assert!(!a.hints.expand_sections);
    }

    #[test]
    fn comparison_splits_operands() {
        let a = classify("difference between soft delete and prune", 20);
        assert_eq!(a.intent, QueryIntent::Comparison);
        assert_eq!(
            a.hints.subqueries,
            vec!["soft delete".to_string(), "prune".to_string()]
        );

        let b = classify("cloud vs local collections", 20);
        assert_eq!(b.intent, QueryIntent::Comparison);
        assert_eq!(
            b.hints.subqueries,
            vec!["cloud".to_string(), "local collections".to_string()]
        );
    }

    #[test]
    fn factual_beats_explanation_for_default_questions() {
        let a = classify("what is the default batch size", 20);
        assert_eq!(a.intent, QueryIntent::Factual);
        assert_eq!(a.hints.top_k, 5);
        assert!(!a.hints.expand_sections);
    }

    #[test]
    fn unmatched_queries_default_to_explanation() {
        let a = classify("soft delete lifecycle", 20);
        assert_eq!(a.intent, QueryIntent::Explanation);
        assert!((a.confidence - 0.5).abs() < f32::EPSILON);
        assert!(a.hints.merge_contiguous);
    }

    #[test]
    fn classification_is_pure_and_stable() {
        let first = classify("how does indexing work", 20);
        let second = classify("how does indexing work", 20);
        assert_eq!(first.intent, second.intent);
        assert_eq!(first.hints, second.hints);
    }
}
