//! Non-fatal parse diagnostics.
//!
//! tree-sitter recovers from syntax errors by inserting ERROR and MISSING
//! nodes. Each becomes one [`Diagnostic`]; none of them stop tokenization.

use crate::ts::parser::ParsedSource;
use serde::{Serialize, Serializer};

/// Severity, serialized as its numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
}

impl DiagnosticKind {
    pub fn level(self) -> u8 {
        match self {
            DiagnosticKind::Error => 0,
        }
    }
}

impl Serialize for DiagnosticKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Byte offset of the problem.
    pub start: usize,
    /// Length in bytes; zero for missing tokens.
    pub length: usize,
}

/// Longest excerpt of unexpected text quoted in a message.
const MAX_EXCERPT: usize = 32;

/// Collect every recovered syntax error in source order.
pub fn collect_diagnostics(parsed: &ParsedSource<'_>) -> Vec<Diagnostic> {
    parsed
        .error_nodes()
        .into_iter()
        .map(|err| {
            let message = if err.missing {
                format!("'{}' expected.", err.kind)
            } else {
                format!(
                    "Unexpected '{}'",
                    excerpt(parsed.source.get(err.byte_start..err.byte_end).unwrap_or(""))
                )
            };
            Diagnostic {
                kind: DiagnosticKind::Error,
                message,
                start: err.byte_start,
                length: err.byte_end - err.byte_start,
            }
        })
        .collect()
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_EXCERPT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
