//! Mapping from file paths to documentation categories.

use rag_store::DocType;

/// Ordered substring rules; the first match wins.
#[derive(Debug, Clone)]
pub struct DocTypeMap {
    rules: Vec<(String, DocType)>,
}

impl Default for DocTypeMap {
    fn default() -> Self {
        Self {
            rules: vec![
                ("complete-flows".to_string(), DocType::Flow),
                (
                    "software-development-life-cycle".to_string(),
                    DocType::Sdlc,
                ),
                ("proposal-plan".to_string(), DocType::Policy),
                ("infrastructure".to_string(), DocType::Infrastructure),
                ("discussion".to_string(), DocType::Decision),
            ],
        }
    }
}

impl DocTypeMap {
    pub fn new(rules: Vec<(String, DocType)>) -> Self {
        Self { rules }
    }

    /// Classifies a normalized, root-relative path.
    pub fn detect(&self, file_path: &str) -> DocType {
        let lower = file_path.to_ascii_lowercase();
        for (needle, doc_type) in &self.rules {
            if lower.contains(needle.as_str()) {
                return *doc_type;
            }
        }
        DocType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_cover_known_segments() {
        let map = DocTypeMap::default();
        assert_eq!(map.detect("complete-flows/checkout.md"), DocType::Flow);
        assert_eq!(
            map.detect("docs/software-development-life-cycle/review.md"),
            DocType::Sdlc
        );
        assert_eq!(map.detect("proposal-plan/testing/plan.md"), DocType::Policy);
        assert_eq!(map.detect("infrastructure/aws.md"), DocType::Infrastructure);
        assert_eq!(map.detect("readme.md"), DocType::Other);
    }
}
