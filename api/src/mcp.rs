//! MCP protocol bridge.
//!
//! Adapts the [`ToolRegistry`] to the MCP JSON-RPC protocol over stdio.
//! Tool results are JSON-encoded envelopes; tool-level failures are still
//! successful protocol responses (the envelope carries the error), so
//! clients never have to parse transport errors for domain failures.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt, transport::stdio};

use crate::state::AppState;
use crate::tools::ToolRegistry;

/// One shared handler per session; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct McpServer {
    state: Arc<AppState>,
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            registry: Arc::new(ToolRegistry::with_builtin()),
        }
    }

    fn to_mcp_tool(tool: &dyn crate::tools::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.input_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };
        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: None,
            icons: None,
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.state.server_name.clone(),
                title: Some("Repository RAG".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Retrieval over this repository's docs and code. Start with \
                 get_manifest for a compact tool list; use search for raw \
                 chunks, ask for grounded answers with citations, and explain \
                 for document-order walkthroughs."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .registry
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let params = request
            .arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));

        let envelope = self
            .registry
            .execute_enveloped(&request.name, params, &self.state)
            .await;
        let text = serde_json::to_string_pretty(&envelope).unwrap_or_default();
        if envelope.success {
            Ok(CallToolResult::success(vec![Content::text(text)]))
        } else {
            Ok(CallToolResult::error(vec![Content::text(text)]))
        }
    }
}

/// Serves the MCP control channel on stdio until the client disconnects.
pub async fn serve_stdio(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    crate::manifest::validate_briefs(&ToolRegistry::with_builtin());
    let server = McpServer::new(state);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
