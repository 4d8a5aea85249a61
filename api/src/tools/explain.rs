//! `explain`: like `ask` with the intent pinned to explanation.

use crate::errors::ToolError;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, parse_params};
use async_trait::async_trait;
use rag_retrieval::QueryIntent;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExplainParams {
    topic: String,
}

pub struct ExplainTool;

#[async_trait]
impl Tool for ExplainTool {
    fn name(&self) -> &'static str {
        "explain"
    }

    fn brief(&self) -> &'static str {
        "Explain a topic from the indexed repository in document order, with citations."
    }

    fn category(&self) -> &'static str {
        "qa"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Walk through a subsystem", "Summarize a flow in context"]
    }

    fn description(&self) -> &'static str {
        "Equivalent to ask with the intent forced to explanation: retrieved \
         chunks are merged in document order per file, overlaps dropped, and \
         emitted under file headings."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": { "type": "string", "description": "Topic to explain" }
            },
            "required": ["topic"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "topic": "the indexing pipeline" }),
            json!({ "topic": "section-aware expansion" }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: ExplainParams = parse_params(params)?;
        if params.topic.trim().is_empty() {
            return Err(ToolError::Validation("topic cannot be empty".to_string()));
        }

        let answer = state
            .pipeline
            .answer(
                &params.topic,
                state.search_top_k(),
                Some(QueryIntent::Explanation),
            )
            .await?;
        let count = answer.citations.len();
        Ok(ToolOutput::new(
            json!({
                "intent": answer.intent,
                "answer": answer.text,
                "citations": answer.citations,
            }),
            count,
        ))
    }
}
