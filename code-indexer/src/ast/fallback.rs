//! Regex fallback extraction.
//!
//! Runs whenever the AST path is unavailable or fails for a file, so that a
//! missing grammar never silently drops a file from the index. Header
//! detection is regex-based; body extents come from indentation (Python) or
//! brace counting (TS/JS). Never runs together with the AST path for the
//! same file.

use super::first_line;
use crate::types::{CodeUnit, SourceLanguage, UnitKind};
use regex::Regex;

pub fn extract(source: &str, lang: SourceLanguage) -> Vec<CodeUnit> {
    let lines: Vec<&str> = source.lines().collect();
    match lang {
        SourceLanguage::Python => extract_python(&lines),
        SourceLanguage::Typescript | SourceLanguage::Javascript => extract_ecma(&lines),
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Last line of an indentation-delimited body starting at `start`.
fn python_block_end(lines: &[&str], start: usize, header_indent: usize) -> usize {
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= header_indent {
            break;
        }
        end = i;
    }
    end
}

fn slice_unit(lines: &[&str], start: usize, end: usize) -> (String, u32, u32) {
    (
        lines[start..=end].join("\n"),
        start as u32 + 1,
        end as u32 + 1,
    )
}

fn extract_python(lines: &[&str]) -> Vec<CodeUnit> {
    let def_re = Regex::new(r"^(\s*)(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\(").expect("def regex");
    let class_re = Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)").expect("class regex");

    let mut out = Vec::new();
    let mut i = 0usize;
    while i < lines.len() {
        if let Some(cap) = class_re.captures(lines[i]) {
            let indent = cap[1].len();
            let name = cap[2].to_string();
            let end = python_block_end(lines, i, indent);
            let class_line = lines[i].to_string();

            let mut methods = Vec::new();
            let mut fields = Vec::new();
            let mut j = i + 1;
            while j <= end {
                if let Some(mcap) = def_re.captures(lines[j]) {
                    let m_indent = mcap[1].len();
                    let m_end = python_block_end(lines, j, m_indent);
                    let (content, line_start, line_end) = slice_unit(lines, j, m_end);
                    methods.push(CodeUnit {
                        kind: UnitKind::Method,
                        name: mcap[2].to_string(),
                        class_name: Some(name.clone()),
                        class_line: Some(class_line.clone()),
                        signature: first_line(&content).to_string(),
                        docstring: python_docstring(lines, j, m_end),
                        content,
                        line_start,
                        line_end,
                    });
                    j = m_end + 1;
                } else {
                    let trimmed = lines[j].trim();
                    if trimmed.contains('=') && !trimmed.starts_with('#') {
                        fields.push(lines[j].to_string());
                    }
                    j += 1;
                }
            }

            if methods.is_empty() {
                let (content, line_start, line_end) = slice_unit(lines, i, end);
                out.push(CodeUnit {
                    kind: UnitKind::Class,
                    name,
                    class_name: None,
                    class_line: None,
                    signature: class_line,
                    docstring: None,
                    content,
                    line_start,
                    line_end,
                });
            } else {
                let mut content = class_line.clone();
                for f in &fields {
                    content.push('\n');
                    content.push_str(f);
                }
                out.push(CodeUnit {
                    kind: UnitKind::Class,
                    name: name.clone(),
                    class_name: Some(name),
                    class_line: None,
                    signature: class_line,
                    docstring: None,
                    content,
                    line_start: i as u32 + 1,
                    line_end: i as u32 + 1,
                });
                out.extend(methods);
            }
            i = end + 1;
        } else if let Some(cap) = def_re.captures(lines[i]) {
            let indent = cap[1].len();
            let end = python_block_end(lines, i, indent);
            let (content, line_start, line_end) = slice_unit(lines, i, end);
            out.push(CodeUnit {
                kind: UnitKind::Function,
                name: cap[2].to_string(),
                class_name: None,
                class_line: None,
                signature: first_line(&content).to_string(),
                docstring: python_docstring(lines, i, end),
                content,
                line_start,
                line_end,
            });
            i = end + 1;
        } else {
            i += 1;
        }
    }
    out
}

fn python_docstring(lines: &[&str], header: usize, end: usize) -> Option<String> {
    let first_body = lines
        .iter()
        .enumerate()
        .skip(header + 1)
        .take_while(|(i, _)| *i <= end)
        .find(|(_, l)| !l.trim().is_empty())?;
    let trimmed = first_body.1.trim();
    for quote in ["\"\"\"", "'''"] {
        if let Some(rest) = trimmed.strip_prefix(quote) {
            if rest.ends_with(quote) && !rest.is_empty() {
                return Some(trimmed.to_string());
            }
            let mut doc = vec![trimmed.to_string()];
            for line in lines.iter().take(end + 1).skip(first_body.0 + 1) {
                doc.push(line.trim().to_string());
                if line.trim_end().ends_with(quote) {
                    return Some(doc.join("\n"));
                }
            }
        }
    }
    None
}

/// Last line of a brace-delimited block opened on or after `start`.
/// Naive counting; good enough for a fallback. A header that never opens a
/// brace (one-line arrow) ends on its own line.
fn brace_block_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if opened && depth <= 0 {
            return i;
        }
        // Allow the opening brace on the line after the header; beyond that
        // the header is treated as a one-line unit.
        if !opened && i > start + 1 {
            return start;
        }
    }
    lines.len().saturating_sub(1)
}

fn extract_ecma(lines: &[&str]) -> Vec<CodeUnit> {
    let func_re = Regex::new(
        r"^(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(",
    )
    .expect("function regex");
    let class_re =
        Regex::new(r"^(?:export\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)").expect("class regex");
    let arrow_re = Regex::new(
        r"^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\()",
    )
    .expect("arrow regex");
    let method_re = Regex::new(
        r"^\s+(?:(?:public|private|protected|static|async|get|set)\s+)*([A-Za-z_$][\w$]*)\s*\([^;{}]*\)\s*\{",
    )
    .expect("method regex");

    let mut out = Vec::new();
    let mut i = 0usize;
    while i < lines.len() {
        if let Some(cap) = class_re.captures(lines[i]) {
            let name = cap[1].to_string();
            let end = brace_block_end(lines, i);
            let class_line = lines[i].to_string();

            let mut methods = Vec::new();
            let mut j = i + 1;
            while j < end {
                if let Some(mcap) = method_re.captures(lines[j]) {
                    let m_end = brace_block_end(lines, j).min(end);
                    let (content, line_start, line_end) = slice_unit(lines, j, m_end);
                    methods.push(CodeUnit {
                        kind: UnitKind::Method,
                        name: mcap[1].to_string(),
                        class_name: Some(name.clone()),
                        class_line: Some(class_line.clone()),
                        signature: first_line(&content).to_string(),
                        docstring: None,
                        content,
                        line_start,
                        line_end,
                    });
                    j = m_end + 1;
                    continue;
                }
                j += 1;
            }

            if methods.is_empty() {
                let (content, line_start, line_end) = slice_unit(lines, i, end);
                out.push(CodeUnit {
                    kind: UnitKind::Class,
                    name,
                    class_name: None,
                    class_line: None,
                    signature: class_line,
                    docstring: None,
                    content,
                    line_start,
                    line_end,
                });
            } else {
                out.push(CodeUnit {
                    kind: UnitKind::Class,
                    name: name.clone(),
                    class_name: Some(name),
                    class_line: None,
                    signature: class_line.clone(),
                    docstring: None,
                    content: class_line,
                    line_start: i as u32 + 1,
                    line_end: i as u32 + 1,
                });
                out.extend(methods);
            }
            i = end + 1;
        } else if func_re.is_match(lines[i]) || arrow_re.is_match(lines[i]) {
            let name = func_re
                .captures(lines[i])
                .or_else(|| arrow_re.captures(lines[i]))
                .map(|c| c[1].to_string())
                .unwrap_or_default();
            let end = brace_block_end(lines, i);
            let (content, line_start, line_end) = slice_unit(lines, i, end);
            out.push(CodeUnit {
                kind: UnitKind::Function,
                name,
                class_name: None,
                class_line: None,
                signature: first_line(&content).to_string(),
                docstring: None,
                content,
                line_start,
                line_end,
            });
            i = end + 1;
        } else {
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_fallback_covers_every_top_level_definition() {
        let source = "import os\n\ndef alpha(x):\n    return x\n\nclass Beta:\n    rate = 2\n\n    def gamma(self):\n        return self.rate\n\ndef delta():\n    pass\n";
        let units = extract(source, SourceLanguage::Python);
        let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Beta", "gamma", "delta"]);

        let gamma = &units[2];
        assert_eq!(gamma.kind, UnitKind::Method);
        assert_eq!(gamma.class_name.as_deref(), Some("Beta"));
        assert_eq!((gamma.line_start, gamma.line_end), (9, 10));
    }

    #[test]
    fn python_fallback_reads_docstrings() {
        let source = "def doc():\n    \"\"\"One liner.\"\"\"\n    return 1\n";
        let units = extract(source, SourceLanguage::Python);
        assert_eq!(units[0].docstring.as_deref(), Some("\"\"\"One liner.\"\"\""));
    }

    #[test]
    fn ecma_fallback_counts_braces_for_bodies() {
        let source = "export function wrap(x) {\n  if (x) {\n    return x;\n  }\n  return null;\n}\n\nconst pick = (a) => {\n  return a[0];\n};\n";
        let units = extract(source, SourceLanguage::Javascript);
        assert_eq!(units.len(), 2);
        assert_eq!((units[0].line_start, units[0].line_end), (1, 6));
        assert_eq!(units[1].name, "pick");
    }

    #[test]
    fn ecma_fallback_extracts_class_methods() {
        let source = "class Store {\n  get(key) {\n    return this.map[key];\n  }\n}\n";
        let units = extract(source, SourceLanguage::Typescript);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].kind, UnitKind::Class);
        assert_eq!(units[1].kind, UnitKind::Method);
        assert_eq!(units[1].name, "get");
    }
}
