//! Verbatim import-line extraction, preserving source order.

use crate::types::SourceLanguage;

pub fn extract_imports(source: &str, lang: SourceLanguage) -> Vec<String> {
    source
        .lines()
        .filter(|line| is_import(line, lang))
        .map(|line| line.to_string())
        .collect()
}

fn is_import(line: &str, lang: SourceLanguage) -> bool {
    let t = line.trim_start();
    match lang {
        SourceLanguage::Python => t.starts_with("import ") || t.starts_with("from "),
        SourceLanguage::Typescript | SourceLanguage::Javascript => {
            t.starts_with("import ")
                || ((t.starts_with("const ") || t.starts_with("let ") || t.starts_with("var "))
                    && t.contains("require("))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_imports_keep_order_and_text() {
        let source = "import os\nx = 1\nfrom typing import List\n";
        assert_eq!(
            extract_imports(source, SourceLanguage::Python),
            vec!["import os", "from typing import List"]
        );
    }

    #[test]
    fn js_require_bindings_count_as_imports() {
        let source = "const fs = require('fs');\nimport path from 'path';\nlet x = 1;\n";
        assert_eq!(
            extract_imports(source, SourceLanguage::Javascript),
            vec!["const fs = require('fs');", "import path from 'path';"]
        );
    }
}
