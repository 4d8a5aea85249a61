//! Structure-aware Markdown chunking.
//!
//! One pass over the document. Headings open a new chunk and set the
//! `section` of everything below them. Three structural detectors take
//! priority over size: numbered lists, pipe tables, and fenced code blocks
//! are always emitted whole, regardless of length. Remaining prose is packed
//! to a target size with a character-budget overlap, never crossing a
//! heading boundary.

use crate::doc_type::DocTypeMap;
use rag_store::{Chunk, ChunkPayload, ContentType};
use tracing::debug;

/// Knobs for prose packing; structural chunks ignore the size entirely.
#[derive(Debug, Clone)]
pub struct DocChunkOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub doc_type_map: DocTypeMap,
}

impl Default for DocChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
            doc_type_map: DocTypeMap::default(),
        }
    }
}

/// One buffered line with its 1-based number.
type BufLine<'a> = (u32, &'a str);

/// Splits a Markdown document into ordered chunks with complete payloads.
///
/// `file_path` must already be normalized (forward slashes, root-relative);
/// it is stored verbatim into every payload. An empty document yields no
/// chunks.
pub fn chunk_markdown(content: &str, file_path: &str, opts: &DocChunkOptions) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<Chunk> = Vec::new();
    let mut section: Option<String> = None;
    let mut prose: Vec<BufLine> = Vec::new();
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        let lineno = (i + 1) as u32;

        if let Some(text) = heading_text(line) {
            // Heading boundary: close the previous section's prose, then the
            // heading line opens its own section's first chunk.
            flush_prose(&mut out, &mut prose, section.as_deref(), file_path, opts);
            section = Some(text);
            prose.push((lineno, line));
            i += 1;
            continue;
        }

        if is_fence_start(line) {
            structural_boundary(&mut out, &mut prose, section.as_deref(), file_path, opts);
            let fence_tag = fence_language(line);
            let start = i;
            i += 1;
            while i < lines.len() && !is_fence_start(lines[i]) {
                i += 1;
            }
            let end = if i < lines.len() { i } else { lines.len() - 1 };
            i = end + 1;
            push_structural(
                &mut out,
                &lines[start..=end],
                (start + 1) as u32,
                ContentType::Code,
                fence_tag,
                None,
                section.as_deref(),
                file_path,
                opts,
            );
            continue;
        }

        if is_list_item(line) {
            structural_boundary(&mut out, &mut prose, section.as_deref(), file_path, opts);
            let start = i;
            while i < lines.len() && is_list_item(lines[i]) {
                i += 1;
            }
            let run = &lines[start..i];
            push_structural(
                &mut out,
                run,
                (start + 1) as u32,
                ContentType::List,
                None,
                Some(run.len()),
                section.as_deref(),
                file_path,
                opts,
            );
            continue;
        }

        if is_table_row(line) && i + 1 < lines.len() && is_table_separator(lines[i + 1]) {
            structural_boundary(&mut out, &mut prose, section.as_deref(), file_path, opts);
            let start = i;
            while i < lines.len() && is_table_row(lines[i]) {
                i += 1;
            }
            push_structural(
                &mut out,
                &lines[start..i],
                (start + 1) as u32,
                ContentType::Table,
                None,
                None,
                section.as_deref(),
                file_path,
                opts,
            );
            continue;
        }

        prose.push((lineno, line));
        if prose_len(&prose) > opts.chunk_size {
            split_prose(&mut out, &mut prose, section.as_deref(), file_path, opts);
        }
        i += 1;
    }

    flush_prose(&mut out, &mut prose, section.as_deref(), file_path, opts);
    debug!(
        target: "doc_indexer::chunker",
        file = file_path,
        chunks = out.len(),
        "chunked markdown"
    );
    out
}

fn heading_text(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim().to_string())
}

fn is_list_item(line: &str) -> bool {
    let t = line.trim_start();
    let digits = t.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let rest = &t[digits..];
    rest.starts_with('.') && rest[1..].starts_with(|c: char| c == ' ' || c == '\t')
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_table_separator(line: &str) -> bool {
    let t = line.trim();
    is_table_row(t)
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ' | '\t'))
}

fn is_fence_start(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

fn fence_language(line: &str) -> Option<String> {
    let tag = line.trim_start().trim_start_matches('`').trim();
    let word = tag.split_whitespace().next()?;
    (!word.is_empty()).then(|| word.to_string())
}

fn prose_len(prose: &[BufLine]) -> usize {
    let newline_count = prose.len().saturating_sub(1);
    prose.iter().map(|(_, l)| l.len()).sum::<usize>() + newline_count
}

/// A structural block is about to be emitted: flush real prose before it, or
/// drop a buffer that holds nothing but the section heading and blank lines
/// (the heading text already lives in `section`).
fn structural_boundary(
    out: &mut Vec<Chunk>,
    prose: &mut Vec<BufLine>,
    section: Option<&str>,
    file_path: &str,
    opts: &DocChunkOptions,
) {
    let heading_only = prose
        .iter()
        .all(|(_, l)| l.trim().is_empty() || heading_text(l).is_some());
    if heading_only {
        prose.clear();
    } else {
        flush_prose(out, prose, section, file_path, opts);
    }
}

fn flush_prose(
    out: &mut Vec<Chunk>,
    prose: &mut Vec<BufLine>,
    section: Option<&str>,
    file_path: &str,
    opts: &DocChunkOptions,
) {
    if prose.is_empty() {
        return;
    }
    let content: String = join_lines(prose);
    let (line_start, line_end) = (prose[0].0, prose[prose.len() - 1].0);
    prose.clear();
    if content.trim().is_empty() {
        return;
    }
    out.push(doc_chunk(
        content,
        line_start,
        line_end,
        ContentType::Text,
        None,
        None,
        section,
        file_path,
        opts,
    ));
}

/// Emits the full buffer as one chunk, then re-seeds it with trailing lines
/// within the overlap character budget so consecutive prose chunks share
/// context. The seed never swallows the whole buffer, which keeps
/// `line_start` strictly increasing.
fn split_prose(
    out: &mut Vec<Chunk>,
    prose: &mut Vec<BufLine>,
    section: Option<&str>,
    file_path: &str,
    opts: &DocChunkOptions,
) {
    let content = join_lines(prose);
    let (line_start, line_end) = (prose[0].0, prose[prose.len() - 1].0);

    let mut seed: Vec<BufLine> = Vec::new();
    let mut budget = opts.overlap;
    for &(n, l) in prose.iter().rev().take(prose.len() - 1) {
        if l.len() + 1 > budget {
            break;
        }
        budget -= l.len() + 1;
        seed.push((n, l));
    }
    seed.reverse();
    *prose = seed;

    if !content.trim().is_empty() {
        out.push(doc_chunk(
            content,
            line_start,
            line_end,
            ContentType::Text,
            None,
            None,
            section,
            file_path,
            opts,
        ));
    }
}

#[allow(clippy::too_many_arguments)]
fn push_structural(
    out: &mut Vec<Chunk>,
    lines: &[&str],
    line_start: u32,
    content_type: ContentType,
    fence_tag: Option<String>,
    list_length: Option<usize>,
    section: Option<&str>,
    file_path: &str,
    opts: &DocChunkOptions,
) {
    let content = lines.join("\n");
    let line_end = line_start + lines.len() as u32 - 1;
    out.push(doc_chunk(
        content,
        line_start,
        line_end,
        content_type,
        fence_tag,
        list_length,
        section,
        file_path,
        opts,
    ));
}

#[allow(clippy::too_many_arguments)]
fn doc_chunk(
    content: String,
    line_start: u32,
    line_end: u32,
    content_type: ContentType,
    fence_tag: Option<String>,
    list_length: Option<usize>,
    section: Option<&str>,
    file_path: &str,
    opts: &DocChunkOptions,
) -> Chunk {
    let language = match content_type {
        ContentType::Code => fence_tag.unwrap_or_else(|| "markdown".to_string()),
        _ => "markdown".to_string(),
    };
    let is_complete = matches!(content_type, ContentType::List | ContentType::Table).then_some(true);
    Chunk::from_payload(ChunkPayload {
        content,
        file_path: file_path.to_string(),
        line_start,
        line_end,
        content_type,
        language: Some(language),
        section: section.map(|s| s.to_string()),
        doc_type: Some(opts.doc_type_map.detect(file_path)),
        code_type: None,
        name: None,
        class_name: None,
        imports: Vec::new(),
        list_length,
        is_complete,
        is_deleted: false,
        content_hash: String::new(),
    })
}

fn join_lines(lines: &[BufLine]) -> String {
    lines
        .iter()
        .map(|(_, l)| *l)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn chunk(content: &str) -> Vec<Chunk> {
        chunk_markdown(content, "docs/a.md", &DocChunkOptions::default())
    }

    #[test]
    fn title_and_numbered_list_make_two_chunks() {
        let chunks = chunk("# Title\n## Features\n1. Alpha\n2. Beta\n3. Gamma");
        assert_eq!(chunks.len(), 2);

        let title = &chunks[0].payload;
        assert_eq!(title.content_type, ContentType::Text);
        assert_eq!(title.section.as_deref(), Some("Title"));

        let list = &chunks[1].payload;
        assert_eq!(list.content_type, ContentType::List);
        assert_eq!(list.section.as_deref(), Some("Features"));
        assert_eq!(list.list_length, Some(3));
        assert_eq!(list.is_complete, Some(true));
        assert_eq!((list.line_start, list.line_end), (3, 5));
    }

    #[test]
    fn empty_file_yields_no_chunks() {
        assert!(chunk("").is_empty());
        assert!(chunk("\n\n\n").is_empty());
    }

    #[test]
    fn huge_numbered_list_stays_one_chunk() {
        let mut doc = String::from("## Items\n");
        for n in 1..=10_000 {
            doc.push_str(&format!("{n}. item number {n}\n"));
        }
        let chunks = chunk(&doc);
        assert_eq!(chunks.len(), 1);
        let list = &chunks[0].payload;
        assert_eq!(list.content_type, ContentType::List);
        assert_eq!(list.list_length, Some(10_000));
    }

    #[test]
    fn level_one_headings_populate_section() {
        let chunks = chunk("# Overview\nSome prose here.\n# Details\nMore prose.");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].payload.section.as_deref(), Some("Overview"));
        assert_eq!(chunks[1].payload.section.as_deref(), Some("Details"));
    }

    #[test]
    fn fenced_code_is_atomic_with_language_tag() {
        let big_body = "x = 1\n".repeat(400);
        let doc = format!("## Setup\nRun this:\n```python\n{big_body}```\nDone.");
        let chunks = chunk(&doc);
        let code: Vec<_> = chunks
            .iter()
            .filter(|c| c.payload.content_type == ContentType::Code)
            .collect();
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].payload.language.as_deref(), Some("python"));
        assert!(code[0].payload.content.starts_with("```python"));
        assert!(code[0].payload.content.ends_with("```"));
    }

    #[test]
    fn pipe_table_is_atomic() {
        let doc = "## Matrix\n| a | b |\n|---|---|\n| 1 | 2 |\n| 3 | 4 |\nAfter.";
        let chunks = chunk(doc);
        let table: Vec<_> = chunks
            .iter()
            .filter(|c| c.payload.content_type == ContentType::Table)
            .collect();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].payload.content.lines().count(), 4);
        assert_eq!(table[0].payload.is_complete, Some(true));
    }

    #[test]
    fn pipes_without_separator_stay_prose() {
        let chunks = chunk("## Notes\nuse a | b here\nplain line");
        assert!(chunks
            .iter()
            .all(|c| c.payload.content_type == ContentType::Text));
    }

    #[test]
    fn long_prose_splits_without_crossing_headings_or_colliding_keys() {
        let mut doc = String::from("## One\n");
        for i in 0..40 {
            doc.push_str(&format!("prose line number {i} with some filler words\n"));
        }
        doc.push_str("## Two\nshort tail\n");
        let chunks = chunk(&doc);
        assert!(chunks.len() >= 3);

        // No prose chunk crosses into section Two except Two's own chunk.
        let two: Vec<_> = chunks
            .iter()
            .filter(|c| c.payload.section.as_deref() == Some("Two"))
            .collect();
        assert_eq!(two.len(), 1);

        // (file_path, line_start) stays unique.
        let mut keys = HashSet::new();
        for c in &chunks {
            assert!(keys.insert((c.payload.file_path.clone(), c.payload.line_start)));
        }

        // Consecutive prose chunks overlap by whole trailing lines.
        let one: Vec<_> = chunks
            .iter()
            .filter(|c| c.payload.section.as_deref() == Some("One"))
            .collect();
        assert!(one.len() >= 2);
        for pair in one.windows(2) {
            assert!(pair[1].payload.line_start <= pair[0].payload.line_end);
            assert!(pair[1].payload.line_start > pair[0].payload.line_start);
        }
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_file() {
        let chunks = chunk("## Code\n```rust\nfn main() {}\n");
        let code: Vec<_> = chunks
            .iter()
            .filter(|c| c.payload.content_type == ContentType::Code)
            .collect();
        assert_eq!(code.len(), 1);
        assert!(code[0].payload.content.contains("fn main"));
    }
}
