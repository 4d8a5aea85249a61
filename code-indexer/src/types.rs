//! Language-agnostic code units extracted from a source file.

use serde::{Deserialize, Serialize};

/// Source language of a file, routed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLanguage {
    Python,
    Typescript,
    Javascript,
}

impl SourceLanguage {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Self::Python),
            "ts" | "tsx" => Some(Self::Typescript),
            "js" | "jsx" | "mjs" => Some(Self::Javascript),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Typescript => "typescript",
            Self::Javascript => "javascript",
        }
    }
}

/// Kind of an extracted unit; mirrors the stored `code_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Function,
    Method,
    Class,
    Module,
}

/// One addressable definition: a function, a method with its class context,
/// or a class. Spans are 1-based inclusive lines covering the declaration to
/// the last line of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeUnit {
    pub kind: UnitKind,
    pub name: String,
    /// Enclosing class for methods; also set on class summary units.
    pub class_name: Option<String>,
    /// Verbatim declaration line of the enclosing class, for methods.
    pub class_line: Option<String>,
    /// First line of the declaration.
    pub signature: String,
    pub docstring: Option<String>,
    /// Declaration through end of body, verbatim from the source.
    pub content: String,
    pub line_start: u32,
    pub line_end: u32,
}

/// Which extraction path produced the units. The two paths never both run
/// for one file in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePath {
    Ast,
    Regex,
}
