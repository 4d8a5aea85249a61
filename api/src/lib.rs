//! Tool surface of the RAG server.
//!
//! The tools in this crate are the external contract: `search`, `ask`,
//! `explain`, the vector/document CRUD set, and the tiered manifest, all
//! returning the uniform envelope and served over MCP stdio.

pub mod envelope;
pub mod errors;
pub mod manifest;
pub mod mcp;
pub mod state;
pub mod tools;

pub use envelope::{Envelope, EnvelopeError, Metadata};
pub use errors::ToolError;
pub use mcp::{McpServer, serve_stdio};
pub use state::AppState;
pub use tools::{Tool, ToolOutput, ToolRegistry};
