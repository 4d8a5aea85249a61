//! Python AST provider over tree-sitter.
//!
//! A new `Parser` is created per call for simplicity; parsing is CPU-bound
//! and files are processed one at a time per task.

use super::first_line;
use crate::ast::interface::AstProvider;
use crate::errors::{Error, Result};
use crate::types::{CodeUnit, UnitKind};
use tree_sitter::{Node, Parser};

pub struct PythonAst;

impl AstProvider for PythonAst {
    fn parse(source: &str) -> Result<Vec<CodeUnit>> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into())?;
        let tree = parser.parse(source, None).ok_or(Error::TreeSitterParse)?;

        let root = tree.root_node();
        let mut out = Vec::new();
        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            extract_top_level(unwrap_decorated(child), source, &mut out);
        }
        Ok(out)
    }
}

fn extract_top_level(node: Node, source: &str, out: &mut Vec<CodeUnit>) {
    match node.kind() {
        "function_definition" => {
            if let Some(unit) = function_unit(node, source, UnitKind::Function, None, None) {
                out.push(unit);
            }
        }
        "class_definition" => extract_class(node, source, out),
        _ => {}
    }
}

fn extract_class(class: Node, source: &str, out: &mut Vec<CodeUnit>) {
    let Some(name) = field_text(class, "name", source) else {
        return;
    };
    let class_line = first_line(node_text(class, source)).to_string();

    let mut methods = Vec::new();
    let mut field_lines = Vec::new();
    if let Some(body) = class.child_by_field_name("body") {
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            let stmt = unwrap_decorated(stmt);
            match stmt.kind() {
                "function_definition" => {
                    if let Some(unit) = function_unit(
                        stmt,
                        source,
                        UnitKind::Method,
                        Some(name.clone()),
                        Some(class_line.clone()),
                    ) {
                        methods.push(unit);
                    }
                }
                // Class-level assignments are field declarations.
                "expression_statement" => {
                    let text = node_text(stmt, source);
                    if text.contains('=') && !text.trim_start().starts_with('"') {
                        field_lines.push(text.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    if methods.is_empty() {
        // A class with no methods is a single class chunk.
        let (line_start, line_end) = line_span(class);
        out.push(CodeUnit {
            kind: UnitKind::Class,
            name,
            class_name: None,
            class_line: None,
            signature: class_line,
            docstring: docstring_of(class, source),
            content: node_text(class, source).to_string(),
            line_start,
            line_end,
        });
    } else {
        // Class summary (declaration line + field declarations), then one
        // unit per method, in source order.
        let (line_start, _) = line_span(class);
        let mut content = class_line.clone();
        for f in &field_lines {
            content.push('\n');
            content.push_str(f);
        }
        out.push(CodeUnit {
            kind: UnitKind::Class,
            name: name.clone(),
            class_name: Some(name),
            class_line: None,
            signature: class_line,
            docstring: docstring_of(class, source),
            content,
            line_start,
            line_end: line_start,
        });
        out.extend(methods);
    }
}

fn function_unit(
    node: Node,
    source: &str,
    kind: UnitKind,
    class_name: Option<String>,
    class_line: Option<String>,
) -> Option<CodeUnit> {
    let name = field_text(node, "name", source)?;
    let content = node_text(node, source).to_string();
    let (line_start, line_end) = line_span(node);
    Some(CodeUnit {
        kind,
        name,
        class_name,
        class_line,
        signature: first_line(&content).to_string(),
        docstring: docstring_of(node, source),
        content,
        line_start,
        line_end,
    })
}

/// First statement of the body, when it is a bare string literal.
fn docstring_of(node: Node, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner = first.walk();
    let expr = first.named_children(&mut inner).next()?;
    (expr.kind() == "string").then(|| node_text(expr, source).to_string())
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

fn field_text(node: Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn line_span(node: Node) -> (u32, u32) {
    (
        node.start_position().row as u32 + 1,
        node.end_position().row as u32 + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"import os
from typing import List

def top(x):
    """Top-level helper."""
    return x + 1

class Greeter:
    greeting = "hi"

    def greet(self):
        return self.greeting

    def shout(self):
        return self.greeting.upper()

class Empty:
    pass
"#;

    #[test]
    fn extracts_functions_methods_and_classes_in_source_order() {
        let units = PythonAst::parse(SOURCE).unwrap();
        let kinds: Vec<_> = units.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::Function,
                UnitKind::Class,
                UnitKind::Method,
                UnitKind::Method,
                UnitKind::Class,
            ]
        );

        let top = &units[0];
        assert_eq!(top.name, "top");
        assert_eq!(top.signature, "def top(x):");
        assert_eq!(top.docstring.as_deref(), Some("\"\"\"Top-level helper.\"\"\""));
        assert_eq!((top.line_start, top.line_end), (4, 6));

        let greet = &units[2];
        assert_eq!(greet.name, "greet");
        assert_eq!(greet.class_name.as_deref(), Some("Greeter"));
        assert_eq!(greet.class_line.as_deref(), Some("class Greeter:"));
        assert!(greet.content.contains("return self.greeting"));
    }

    #[test]
    fn class_with_methods_gets_a_summary_unit_with_fields() {
        let units = PythonAst::parse(SOURCE).unwrap();
        let summary = &units[1];
        assert_eq!(summary.kind, UnitKind::Class);
        assert_eq!(summary.name, "Greeter");
        assert!(summary.content.contains("class Greeter:"));
        assert!(summary.content.contains("greeting = \"hi\""));
        assert!(!summary.content.contains("def greet"));
    }

    #[test]
    fn class_without_methods_is_one_class_unit() {
        let units = PythonAst::parse(SOURCE).unwrap();
        let empty = units.last().unwrap();
        assert_eq!(empty.kind, UnitKind::Class);
        assert_eq!(empty.name, "Empty");
        assert!(empty.content.contains("pass"));
    }

    #[test]
    fn empty_source_yields_no_units() {
        assert!(PythonAst::parse("").unwrap().is_empty());
    }
}
