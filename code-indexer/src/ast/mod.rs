//! AST extraction: one provider per language plus the routing logic.

pub mod ecma;
pub mod fallback;
pub mod interface;
pub mod javascript;
pub mod python;
pub mod router;
pub mod typescript;

pub(crate) fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}
