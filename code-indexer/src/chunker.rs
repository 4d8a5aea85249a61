//! Chunk composition: parsed units + file context into storable chunks.
//!
//! Each function or method chunk reproduces the file's import lines at the
//! top and, for methods, the enclosing class declaration line, so the chunk
//! is understandable on its own. Line spans always refer to the unit's
//! declaration-to-body range in the original file.

use crate::ast::router::RouterAst;
use crate::imports::extract_imports;
use crate::types::{CodeUnit, ParsePath, SourceLanguage, UnitKind};
use rag_store::{Chunk, ChunkPayload, CodeType, ContentType};
use tracing::debug;

/// Granularity of code chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStrategy {
    /// One chunk per function or method (plus class summaries).
    #[default]
    FunctionLevel,
    /// One chunk per class (methods folded in); top-level functions stay
    /// individual.
    ClassLevel,
}

impl ChunkStrategy {
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "function_level" => Some(Self::FunctionLevel),
            "class_level" => Some(Self::ClassLevel),
            _ => None,
        }
    }
}

/// Parses and chunks one source file. Returns the chunks in source order and
/// the path (AST or regex) that produced them.
pub fn chunk_source(
    source: &str,
    file_path: &str,
    lang: SourceLanguage,
    strategy: ChunkStrategy,
) -> (Vec<Chunk>, ParsePath) {
    let (mut units, path) = RouterAst::parse_source(source, lang);
    if strategy == ChunkStrategy::ClassLevel {
        units = fold_classes(units, source);
    }
    let imports = extract_imports(source, lang);

    let mut chunks: Vec<Chunk> = units
        .into_iter()
        .map(|u| unit_chunk(u, &imports, file_path, lang))
        .collect();

    // A parseable file with no extractable definitions still gets indexed,
    // as a single module chunk.
    if chunks.is_empty() && !source.trim().is_empty() {
        let stem = file_path
            .rsplit('/')
            .next()
            .and_then(|f| f.split('.').next())
            .unwrap_or(file_path);
        let unit = CodeUnit {
            kind: UnitKind::Module,
            name: stem.to_string(),
            class_name: None,
            class_line: None,
            signature: source.lines().next().unwrap_or("").to_string(),
            docstring: None,
            content: source.to_string(),
            line_start: 1,
            line_end: source.lines().count().max(1) as u32,
        };
        chunks.push(unit_chunk(unit, &imports, file_path, lang));
    }

    debug!(
        target: "code_indexer::chunker",
        file = file_path,
        chunks = chunks.len(),
        fallback = matches!(path, ParsePath::Regex),
        "chunked source file"
    );
    (chunks, path)
}

/// Collapses per-method units back into whole-class units by re-slicing the
/// source over the class span.
fn fold_classes(units: Vec<CodeUnit>, source: &str) -> Vec<CodeUnit> {
    let lines: Vec<&str> = source.lines().collect();
    let mut out: Vec<CodeUnit> = Vec::new();
    for unit in units {
        match unit.kind {
            UnitKind::Method => {
                let class_name = unit.class_name.clone();
                if let Some(class_unit) = out.iter_mut().rev().find(|c| {
                    c.kind == UnitKind::Class && Some(&c.name) == class_name.as_ref()
                }) {
                    if unit.line_end > class_unit.line_end {
                        class_unit.line_end = unit.line_end;
                        let start = class_unit.line_start as usize - 1;
                        let end = (unit.line_end as usize).min(lines.len());
                        class_unit.content = lines[start..end].join("\n");
                    }
                }
            }
            _ => out.push(unit),
        }
    }
    for unit in &mut out {
        if unit.kind == UnitKind::Class {
            unit.class_name = None;
        }
    }
    out
}

fn unit_chunk(
    unit: CodeUnit,
    imports: &[String],
    file_path: &str,
    lang: SourceLanguage,
) -> Chunk {
    let mut content = String::new();
    if !imports.is_empty() {
        content.push_str(&imports.join("\n"));
        content.push_str("\n\n");
    }
    if let Some(class_line) = &unit.class_line {
        content.push_str(class_line);
        content.push('\n');
    }
    content.push_str(&unit.content);

    let code_type = match unit.kind {
        UnitKind::Function => CodeType::Function,
        UnitKind::Method => CodeType::Method,
        UnitKind::Class => CodeType::Class,
        UnitKind::Module => CodeType::Module,
    };

    Chunk::from_payload(ChunkPayload {
        content,
        file_path: file_path.to_string(),
        line_start: unit.line_start,
        line_end: unit.line_end,
        content_type: ContentType::Code,
        language: Some(lang.as_str().to_string()),
        section: None,
        doc_type: None,
        code_type: Some(code_type),
        name: Some(unit.name),
        class_name: unit.class_name,
        imports: imports.to_vec(),
        list_length: None,
        is_complete: None,
        is_deleted: false,
        content_hash: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const SOURCE: &str = "import os\n\nclass Greeter:\n    def greet(self):\n        return \"hi\"\n";

    #[test]
    fn method_chunks_carry_imports_and_class_context() {
        let (chunks, path) =
            chunk_source(SOURCE, "src/x.py", SourceLanguage::Python, ChunkStrategy::default());
        assert_eq!(path, ParsePath::Ast);

        let greet = chunks
            .iter()
            .find(|c| c.payload.name.as_deref() == Some("greet"))
            .expect("greet chunk");
        assert_eq!(greet.payload.code_type, Some(CodeType::Method));
        assert_eq!(greet.payload.class_name.as_deref(), Some("Greeter"));
        assert_eq!(greet.payload.language.as_deref(), Some("python"));
        assert!(greet.payload.content.starts_with("import os"));
        assert!(greet.payload.content.contains("class Greeter:"));
        assert!(greet.payload.content.contains("def greet(self):"));
        assert_eq!(greet.payload.imports, vec!["import os"]);
    }

    #[test]
    fn chunk_keys_are_unique_per_file() {
        let (chunks, _) =
            chunk_source(SOURCE, "src/x.py", SourceLanguage::Python, ChunkStrategy::default());
        let mut keys = HashSet::new();
        for c in &chunks {
            assert!(keys.insert(c.payload.line_start), "duplicate line_start");
        }
    }

    #[test]
    fn class_level_strategy_folds_methods_into_the_class() {
        let (chunks, _) = chunk_source(
            SOURCE,
            "src/x.py",
            SourceLanguage::Python,
            ChunkStrategy::ClassLevel,
        );
        assert_eq!(chunks.len(), 1);
        let class = &chunks[0].payload;
        assert_eq!(class.code_type, Some(CodeType::Class));
        assert!(class.content.contains("def greet(self):"));
    }

    #[test]
    fn definition_free_file_becomes_a_module_chunk() {
        let (chunks, _) = chunk_source(
            "PORT = 8080\nHOST = \"localhost\"\n",
            "src/settings.py",
            SourceLanguage::Python,
            ChunkStrategy::default(),
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload.code_type, Some(CodeType::Module));
        assert_eq!(chunks[0].payload.name.as_deref(), Some("settings"));
    }
}
