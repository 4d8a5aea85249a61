//! Typed payload filters and their Qdrant form.
//!
//! qdrant-client 1.15 specifics:
//! - `Condition` is a wrapper with `condition_one_of: Option<condition::ConditionOneOf>`;
//!   there are no helper constructors, you must set the enum.
//! - `FieldCondition.r#match` expects a `Match` wrapping `r#match::MatchValue`.

use crate::chunk::ContentType;
use qdrant_client::qdrant::{
    Condition, FieldCondition, Filter, Match, condition, r#match::MatchValue,
};

/// Exact-match filter over the indexed payload keys.
///
/// `is_deleted = true` points are excluded from every query unless the caller
/// sets `include_deleted`; `only_deleted` flips the filter to the complement
/// (used by purge and stats paths).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFilter {
    pub file_path: Option<String>,
    pub section: Option<String>,
    pub language: Option<String>,
    pub content_type: Option<ContentType>,
    pub include_deleted: bool,
    pub only_deleted: bool,
}

impl ChunkFilter {
    pub fn for_file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            ..Default::default()
        }
    }

    pub fn for_section(file_path: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            section: Some(section.into()),
            ..Default::default()
        }
    }

    /// Matches every live point in the collection.
    pub fn all_active() -> Self {
        Self::default()
    }

    /// Matches only soft-deleted points.
    pub fn deleted() -> Self {
        Self {
            only_deleted: true,
            ..Default::default()
        }
    }

    /// Converts into a concrete Qdrant `Filter`.
    pub fn to_qdrant(&self) -> Filter {
        let mut must: Vec<Condition> = Vec::new();
        let mut must_not: Vec<Condition> = Vec::new();

        if let Some(path) = &self.file_path {
            must.push(keyword_eq("file_path", path));
        }
        if let Some(section) = &self.section {
            must.push(keyword_eq("section", section));
        }
        if let Some(language) = &self.language {
            must.push(keyword_eq("language", language));
        }
        if let Some(ct) = self.content_type {
            must.push(keyword_eq("content_type", ct.as_str()));
        }

        if self.only_deleted {
            must.push(bool_eq("is_deleted", true));
        } else if !self.include_deleted {
            must_not.push(bool_eq("is_deleted", true));
        }

        Filter {
            must,
            must_not,
            ..Default::default()
        }
    }
}

fn keyword_eq(key: &str, value: &str) -> Condition {
    Condition {
        condition_one_of: Some(condition::ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Keyword(value.to_string())),
            }),
            ..Default::default()
        })),
    }
}

fn bool_eq(key: &str, value: bool) -> Condition {
    Condition {
        condition_one_of: Some(condition::ConditionOneOf::Field(FieldCondition {
            key: key.to_string(),
            r#match: Some(Match {
                match_value: Some(MatchValue::Boolean(value)),
            }),
            ..Default::default()
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_excludes_deleted() {
        let f = ChunkFilter::all_active().to_qdrant();
        assert!(f.must.is_empty());
        assert_eq!(f.must_not.len(), 1);
    }

    #[test]
    fn include_deleted_drops_the_exclusion() {
        let mut filter = ChunkFilter::for_file("docs/a.md");
        filter.include_deleted = true;
        let f = filter.to_qdrant();
        assert_eq!(f.must.len(), 1);
        assert!(f.must_not.is_empty());
    }

    #[test]
    fn only_deleted_matches_the_complement() {
        let f = ChunkFilter::deleted().to_qdrant();
        assert_eq!(f.must.len(), 1);
        assert!(f.must_not.is_empty());
    }
}
