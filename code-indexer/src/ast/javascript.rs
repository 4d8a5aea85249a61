//! JavaScript AST provider over tree-sitter.

use crate::ast::{ecma, interface::AstProvider};
use crate::errors::Result;
use crate::types::CodeUnit;

pub struct JavascriptAst;

impl AstProvider for JavascriptAst {
    fn parse(source: &str) -> Result<Vec<CodeUnit>> {
        ecma::extract(source, &tree_sitter_javascript::LANGUAGE.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitKind;

    #[test]
    fn extracts_plain_functions_and_methods() {
        let source = "function greet(name) {\n  return `hi ${name}`;\n}\n\nclass Api {\n  fetch(path) {\n    return path;\n  }\n}\n";
        let units = JavascriptAst::parse(source).unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].kind, UnitKind::Function);
        assert_eq!(units[0].name, "greet");
        assert_eq!((units[0].line_start, units[0].line_end), (1, 3));
        assert_eq!(units[2].kind, UnitKind::Method);
        assert_eq!(units[2].class_name.as_deref(), Some("Api"));
    }
}
