//! Universal response envelope for every tool result.
//!
//! Success and failure share one shape. A partially successful batch is
//! `success = false` with per-id errors and the ids that did succeed in
//! `data`; an empty result set is a success with `count = 0`.

use crate::errors::ToolError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub data: Value,
    pub metadata: Metadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

#[derive(Debug, Serialize)]
pub struct Metadata {
    pub count: usize,
    pub timing_ms: u64,
    pub operation: String,
}

#[derive(Debug, Serialize)]
pub struct EnvelopeError {
    /// Stable, machine-readable error code.
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl EnvelopeError {
    pub fn from_tool_error(e: &ToolError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: None,
            suggestions: e.suggestions(),
        }
    }

    pub fn per_id(code: &'static str, id: u64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(serde_json::json!({ "id": id })),
            suggestions: Vec::new(),
        }
    }
}

impl Envelope {
    pub fn success(operation: impl Into<String>, data: Value, count: usize, timing_ms: u64) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata {
                count,
                timing_ms,
                operation: operation.into(),
            },
            errors: Vec::new(),
        }
    }

    pub fn failure(
        operation: impl Into<String>,
        data: Value,
        count: usize,
        timing_ms: u64,
        errors: Vec<EnvelopeError>,
    ) -> Self {
        Self {
            success: false,
            data,
            metadata: Metadata {
                count,
                timing_ms,
                operation: operation.into(),
            },
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_are_success_with_zero_count() {
        let env = Envelope::success("search", serde_json::json!([]), 0, 3);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["metadata"]["count"], 0);
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn partial_failure_carries_per_id_errors_and_successes() {
        let env = Envelope::failure(
            "add_points",
            serde_json::json!({ "succeeded": [1, 2] }),
            2,
            10,
            vec![EnvelopeError::per_id(
                "VECTOR_STORE_UNAVAILABLE",
                3,
                "upsert failed",
            )],
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["succeeded"][1], 2);
        assert_eq!(json["errors"][0]["details"]["id"], 3);
    }
}
