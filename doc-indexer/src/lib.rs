//! Markdown chunking for the documentation side of the index.

pub mod chunker;
pub mod doc_type;

pub use chunker::{DocChunkOptions, chunk_markdown};
pub use doc_type::DocTypeMap;
