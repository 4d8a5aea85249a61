//! Canonical chunk model and payload schema.
//!
//! A chunk is the atomic indexed unit: the exact text that was embedded plus
//! the payload stored next to it in the collection. Point ids are minted
//! deterministically from `(file_path, line_start)` so that re-indexing the
//! same location always overwrites the same point.

use serde::{Deserialize, Serialize};

/// Structural kind of a chunk's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    List,
    Table,
    Code,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::List => "list",
            ContentType::Table => "table",
            ContentType::Code => "code",
        }
    }
}

/// Documentation category derived from the top-level directory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Flow,
    Sdlc,
    Policy,
    Infrastructure,
    Decision,
    Other,
}

/// Granularity of a code chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeType {
    Function,
    Method,
    Class,
    Module,
}

/// Payload stored with every point in the collection.
///
/// Doc-only and code-only fields are optional and omitted from the stored
/// payload when absent. `is_deleted` defaults to `false` so payloads written
/// by older runs deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ChunkPayload {
    /// The exact text that was embedded.
    pub content: String,
    /// Forward-slash path relative to the project root.
    pub file_path: String,
    /// 1-based, inclusive.
    pub line_start: u32,
    /// 1-based, inclusive; always >= `line_start`.
    pub line_end: u32,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Nearest enclosing Markdown heading; absent for code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<DocType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_type: Option<CodeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Import lines reproduced at the top of a code chunk, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub is_deleted: bool,
    /// Hex SHA-256 of `content`; used to detect unchanged chunks.
    pub content_hash: String,
}

/// A chunk with its deterministic point id.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: u64,
    pub payload: ChunkPayload,
}

impl Chunk {
    /// Builds a chunk from a payload, minting the id from the payload's
    /// `(file_path, line_start)` key and filling `content_hash`.
    pub fn from_payload(mut payload: ChunkPayload) -> Self {
        payload.content_hash = content_hash(&payload.content);
        let id = point_id(&payload.file_path, payload.line_start);
        Self { id, payload }
    }
}

/// Deterministic point id: blake3 of `"<file_path>:<line_start>"` folded to
/// the signed-positive u64 range. Same key always yields the same id; this
/// is the sole duplicate-prevention mechanism of the collection.
pub fn point_id(file_path: &str, line_start: u32) -> u64 {
    let digest = blake3::hash(format!("{file_path}:{line_start}").as_bytes());
    let bytes: [u8; 8] = digest.as_bytes()[..8]
        .try_into()
        .expect("slice with incorrect length");
    u64::from_le_bytes(bytes) % ((1u64 << 63) - 1)
}

/// Hex SHA-256 digest of chunk content.
pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    use std::fmt::Write;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let out = hasher.finalize();
    let mut hex = String::with_capacity(out.len() * 2);
    for b in out {
        let _ = write!(hex, "{b:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(path: &str, line: u32) -> ChunkPayload {
        ChunkPayload {
            content: "fn main() {}".to_string(),
            file_path: path.to_string(),
            line_start: line,
            line_end: line,
            content_type: ContentType::Code,
            language: Some("rust".to_string()),
            section: None,
            doc_type: None,
            code_type: Some(CodeType::Function),
            name: Some("main".to_string()),
            class_name: None,
            imports: Vec::new(),
            list_length: None,
            is_complete: None,
            is_deleted: false,
            content_hash: String::new(),
        }
    }

    #[test]
    fn point_id_is_deterministic() {
        assert_eq!(point_id("docs/a.md", 3), point_id("docs/a.md", 3));
        assert_ne!(point_id("docs/a.md", 3), point_id("docs/a.md", 4));
        assert_ne!(point_id("docs/a.md", 3), point_id("docs/b.md", 3));
    }

    #[test]
    fn point_id_stays_below_i64_max() {
        for line in [1u32, 17, 9999] {
            assert!(point_id("src/very/deep/path.py", line) < (1u64 << 63) - 1);
        }
    }

    #[test]
    fn from_payload_fills_id_and_hash() {
        let chunk = Chunk::from_payload(payload("src/x.py", 10));
        assert_eq!(chunk.id, point_id("src/x.py", 10));
        assert_eq!(chunk.payload.content_hash, content_hash("fn main() {}"));
    }

    #[test]
    fn payload_roundtrips_through_json() {
        let chunk = Chunk::from_payload(payload("src/x.py", 10));
        let json = serde_json::to_value(&chunk.payload).unwrap();
        // Optional doc-only fields must not appear on code payloads.
        assert!(json.get("section").is_none());
        assert!(json.get("list_length").is_none());
        let back: ChunkPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, chunk.payload);
    }
}
