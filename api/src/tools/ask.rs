//! `ask`: full question answering with citations.

use crate::errors::ToolError;
use crate::state::AppState;
use crate::tools::{Tool, ToolOutput, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AskParams {
    question: String,
}

pub struct AskTool;

#[async_trait]
impl Tool for AskTool {
    fn name(&self) -> &'static str {
        "ask"
    }

    fn brief(&self) -> &'static str {
        "Answer a question from the indexed repository. Returns a grounded answer with citations."
    }

    fn category(&self) -> &'static str {
        "qa"
    }

    fn use_cases(&self) -> &'static [&'static str] {
        &["Answer questions about docs", "Reconstruct complete lists"]
    }

    fn description(&self) -> &'static str {
        "Runs the full pipeline: intent classification, hybrid retrieval with \
         section expansion, reranking, and intent-specific synthesis. Every \
         statement in the answer is backed by a citation into the repository."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": { "type": "string", "description": "Natural-language question" }
            },
            "required": ["question"]
        })
    }

    fn examples(&self) -> Vec<Value> {
        vec![
            json!({ "question": "list the features" }),
            json!({ "question": "what is the difference between soft delete and prune" }),
        ]
    }

    async fn execute(&self, params: Value, state: &AppState) -> Result<ToolOutput, ToolError> {
        let params: AskParams = parse_params(params)?;
        if params.question.trim().is_empty() {
            return Err(ToolError::Validation("question cannot be empty".to_string()));
        }

        let answer = state
            .pipeline
            .answer(&params.question, state.search_top_k(), None)
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
