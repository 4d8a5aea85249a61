//! TypeScript AST provider over tree-sitter.

use crate::ast::{ecma, interface::AstProvider};
use crate::errors::Result;
use crate::types::CodeUnit;

pub struct TypescriptAst;

impl AstProvider for TypescriptAst {
    fn parse(source: &str) -> Result<Vec<CodeUnit>> {
        ecma::extract(
            source,
            &tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitKind;

    const SOURCE: &str = r#"import { log } from "./log";

export function add(a: number, b: number): number {
  return a + b;
}

export class Counter {
  count: number = 0;

  increment(): void {
    this.count += 1;
  }
}

const double = (x: number) => x * 2;
"#;

    #[test]
    fn extracts_exported_functions_classes_and_arrows() {
        let units = TypescriptAst::parse(SOURCE).unwrap();
        let kinds: Vec<_> = units.iter().map(|u| u.kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::Function,
                UnitKind::Class,
                UnitKind::Method,
                UnitKind::Function,
            ]
        );

        assert_eq!(units[0].name, "add");
        let increment = &units[2];
        assert_eq!(increment.name, "increment");
        assert_eq!(increment.class_name.as_deref(), Some("Counter"));
        assert_eq!(increment.class_line.as_deref(), Some("class Counter {"));

        let double = &units[3];
        assert_eq!(double.name, "double");
        assert!(double.content.starts_with("const double"));
    }

    #[test]
    fn class_summary_carries_field_declarations() {
        let units = TypescriptAst::parse(SOURCE).unwrap();
        let summary = &units[1];
        assert_eq!(summary.kind, UnitKind::Class);
        assert!(summary.content.contains("count: number = 0;"));
        assert!(!summary.content.contains("increment()"));
    }
}
