//! AST-aware code chunking.
//!
//! Parses source files into function/method/class units (tree-sitter first,
//! regex fallback second, never both for one file) and composes them into
//! storable chunks with import context.

pub mod ast;
pub mod chunker;
pub mod errors;
pub mod imports;
pub mod types;

pub use ast::router::RouterAst;
pub use chunker::{ChunkStrategy, chunk_source};
pub use errors::{Error, Result};
pub use imports::extract_imports;
pub use types::{CodeUnit, ParsePath, SourceLanguage, UnitKind};
