//! Shared extraction for the ECMAScript grammar family.
//!
//! TypeScript and JavaScript trees use the same node taxonomy for the
//! constructs indexed here (function declarations, classes, methods, and
//! arrow functions bound to `const`/`let`/`var`).

use super::first_line;
use crate::errors::{Error, Result};
use crate::types::{CodeUnit, UnitKind};
use tree_sitter::{Language, Node, Parser};

pub fn extract(source: &str, language: &Language) -> Result<Vec<CodeUnit>> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser.parse(source, None).ok_or(Error::TreeSitterParse)?;

    let root = tree.root_node();
    let mut out = Vec::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        extract_top_level(child, source, &mut out);
    }
    Ok(out)
}

fn extract_top_level(node: Node, source: &str, out: &mut Vec<CodeUnit>) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(unit) = named_unit(node, source, UnitKind::Function, None, None) {
                out.push(unit);
            }
        }
        "class_declaration" => extract_class(node, source, out),
        // `export [default] <declaration>` wraps the real node.
        "export_statement" => {
            if let Some(decl) = node.child_by_field_name("declaration") {
                extract_top_level(decl, source, out);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            extract_bound_functions(node, source, out);
        }
        _ => {}
    }
}

/// `const f = (..) => ..` and `const f = function (..) {..}` count as
/// functions, named after the binding.
fn extract_bound_functions(decl: Node, source: &str, out: &mut Vec<CodeUnit>) {
    let mut cursor = decl.walk();
    for declarator in decl.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(value) = declarator.child_by_field_name("value") else {
            continue;
        };
        if !matches!(value.kind(), "arrow_function" | "function_expression") {
            continue;
        }
        let Some(name) = field_text(declarator, "name", source) else {
            continue;
        };
        let content = node_text(decl, source).to_string();
        let (line_start, line_end) = line_span(decl);
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
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_definition" => {
                    if let Some(unit) = named_unit(
                        member,
                        source,
                        UnitKind::Method,
                        Some(name.clone()),
                        Some(class_line.clone()),
                    ) {
                        methods.push(unit);
                    }
                }
                "public_field_definition" | "field_definition" => {
                    field_lines.push(node_text(member, source).to_string());
                }
                _ => {}
            }
        }
    }

    if methods.is_empty() {
        let (line_start, line_end) = line_span(class);
        out.push(CodeUnit {
            kind: UnitKind::Class,
            name,
            class_name: None,
            class_line: None,
            signature: class_line,
            docstring: None,
            content: node_text(class, source).to_string(),
            line_start,
            line_end,
        });
    } else {
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
            docstring: None,
            content,
            line_start,
            line_end: line_start,
        });
        out.extend(methods);
    }
}

fn named_unit(
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
        docstring: None,
        content,
        line_start,
        line_end,
    })
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
