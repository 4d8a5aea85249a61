use crate::errors::Result;
use crate::types::CodeUnit;

pub trait AstProvider {
    /// Parse source text and return language-agnostic units in source order.
    fn parse(source: &str) -> Result<Vec<CodeUnit>>;
}
