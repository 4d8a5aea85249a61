//! Routes a source file to its AST provider and never panics.

use super::{
    fallback, interface::AstProvider, javascript::JavascriptAst, python::PythonAst,
    typescript::TypescriptAst,
};
use crate::types::{CodeUnit, ParsePath, SourceLanguage};
use tracing::{debug, info, warn};

pub struct RouterAst;

impl RouterAst {
    /// Parses source by language. On AST failure falls back to the regex
    /// extractor; the two paths never both run for one file.
    pub fn parse_source(source: &str, lang: SourceLanguage) -> (Vec<CodeUnit>, ParsePath) {
        debug!(target: "code_indexer::router", language = lang.as_str(), "selecting provider");

        let primary = match lang {
            SourceLanguage::Python => PythonAst::parse(source),
            SourceLanguage::Typescript => TypescriptAst::parse(source),
            SourceLanguage::Javascript => JavascriptAst::parse(source),
        };

        match primary {
            Ok(units) => {
                info!(
                    target: "code_indexer::router",
                    language = lang.as_str(),
                    units = units.len(),
                    "parsed by AST provider"
                );
                (units, ParsePath::Ast)
            }
            Err(e) => {
                warn!(
                    target: "code_indexer::router",
                    language = lang.as_str(),
                    error = %e,
                    "AST provider failed, using regex fallback"
                );
                let units = fallback::extract(source, lang);
                if units.is_empty() {
                    warn!(
                        target: "code_indexer::router",
                        language = lang.as_str(),
                        "regex fallback produced 0 units"
                    );
                }
                (units, ParsePath::Regex)
            }
        }
    }
}
