//! Three-tier tool manifest.
//!
//! Tier 1: per-tool briefs, cheap enough to keep in a client's working
//! context. Tier 2: full input schema plus example invocations, fetched on
//! selection. Tier 3 is execution itself. Briefs are validated against
//! their token budget at startup; an oversized brief is a warning, never a
//! rejection.

use crate::tools::ToolRegistry;
use serde_json::{Value, json};
use tracing::warn;

/// Upper bound for a tier-1 brief.
pub const BRIEF_TOKEN_BUDGET: usize = 50;

/// Rough token estimation: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Tier 1: lightweight briefs for every registered tool.
pub fn tier1(registry: &ToolRegistry) -> Value {
    let mut out = serde_json::Map::new();
    for tool in registry.tools() {
        out.insert(
            tool.name().to_string(),
            json!({
                "name": tool.name(),
                "brief": tool.brief(),
                "category": tool.category(),
                "use_cases": tool.use_cases(),
            }),
        );
    }
    Value::Object(out)
}

/// Tier 2: full schema and examples for one tool.
pub fn tier2(registry: &ToolRegistry, name: &str) -> Option<Value> {
    registry.find(name).map(|tool| {
        json!({
            "name": tool.name(),
            "description": tool.description(),
            "input_schema": tool.input_schema(),
            "examples": tool.examples(),
        })
    })
}

/// Startup check: logs every brief exceeding its budget.
pub fn validate_briefs(registry: &ToolRegistry) -> usize {
    let mut oversized = 0;
    for tool in registry.tools() {
        let text = format!("{} {}", tool.brief(), tool.use_cases().join(" "));
        let tokens = estimate_tokens(&text);
        if tokens > BRIEF_TOKEN_BUDGET {
            oversized += 1;
            warn!(
                target: "api::manifest",
                tool = tool.name(),
                tokens,
                budget = BRIEF_TOKEN_BUDGET,
                "tool brief exceeds its token budget"
            );
        }
    }
    oversized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier1_covers_every_tool_with_the_contracted_shape() {
        let registry = ToolRegistry::with_builtin();
        let manifest = tier1(&registry);
        let map = manifest.as_object().unwrap();
        assert_eq!(map.len(), registry.tools().len());
        for (name, entry) in map {
            assert_eq!(entry["name"], *name);
            assert!(entry["brief"].is_string());
            assert!(entry["category"].is_string());
            let use_cases = entry["use_cases"].as_array().unwrap();
            assert!((2..=3).contains(&use_cases.len()), "{name} use cases");
        }
    }

    #[test]
    fn tier2_provides_schema_and_examples_on_demand() {
        let registry = ToolRegistry::with_builtin();
        let schema = tier2(&registry, "search").unwrap();
        assert_eq!(schema["input_schema"]["type"], "object");
        let examples = schema["examples"].as_array().unwrap();
        assert!((2..=4).contains(&examples.len()));
        assert!(tier2(&registry, "nope").is_none());
    }

    #[test]
    fn every_brief_fits_its_token_budget() {
        let registry = ToolRegistry::with_builtin();
        assert_eq!(validate_briefs(&registry), 0);
    }

    #[test]
    fn external_tool_names_are_all_registered() {
        let registry = ToolRegistry::with_builtin();
        for name in [
            "search",
            "ask",
            "explain",
            "add_points",
            "update_points",
            "delete_points",
            "get_points",
            "query_points",
            "add_document",
            "update_document",
            "delete_document",
            "get_document",
            "get_collection_stats",
            "get_manifest",
            "get_tool_schema",
        ] {
            assert!(registry.find(name).is_some(), "missing tool {name}");
        }
    }
}
