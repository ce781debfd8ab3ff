//! Tree-sitter integration for PHP sources.
//!
//! Parses PHP (with inline markup) into a concrete syntax tree, reports
//! recovered syntax errors as diagnostics, and lowers the tree into the
//! typed [`crate::ast::Node`] the dispatch engine walks.

pub mod diagnostics;
pub mod errors;
pub mod lower;
pub mod parser;

pub use diagnostics::{collect_diagnostics, Diagnostic, DiagnosticKind};
pub use errors::TreeSitterError;
pub use lower::lower;
pub use parser::{ErrorNode, ParsedSource, PhpParser};
