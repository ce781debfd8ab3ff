//! PHP Struct Tokens: structural token streams for PHP sources
//!
//! Converts a PHP file into a flat, ordered stream of structural tokens:
//! position-tagged markers for loops, conditionals, declarations,
//! assignments, calls and the like. The stream is meant for structural
//! comparison between files (similarity and plagiarism detection), not for
//! reconstructing the source.
//!
//! # Architecture
//!
//! tree-sitter parses the source (recovering from syntax errors), the
//! concrete tree is lowered into a typed [`ast::Node`] tree, and the
//! [`dispatch`] engine walks that tree once, choosing one emission rule per
//! node. Tokens land in an append-only [`TokenStream`].
//!
//! # Example
//!
//! ```no_run
//! use php_struct_tokens::{tokenize, TokenKind};
//!
//! let result = tokenize("<?php\nfor ($i = 0; $i < 3; $i++) { echo $i; }\n").unwrap();
//! assert_eq!(result.tokens.count_of(TokenKind::FOR_BEGIN), 1);
//! println!("{}", serde_json::to_string(&result.tokens).unwrap());
//! ```

pub mod ast;
pub mod dispatch;
pub mod emit;
pub mod pool;
pub mod position;
pub mod token;
pub mod ts;

use thiserror::Error;

// Re-exports
pub use dispatch::{dispatch, DispatchError, Engine, Recursion};
pub use emit::{EmittedToken, TokenStream};
pub use position::{Position, PositionError, PositionMap};
pub use token::{Mapping, TokenKind};
pub use ts::{Diagnostic, DiagnosticKind, PhpParser, TreeSitterError};

#[derive(Error, Debug)]
pub enum TokenizeError {
    #[error(transparent)]
    Parse(#[from] TreeSitterError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Output of one tokenization run.
#[derive(Debug, Clone)]
pub struct Tokenized {
    pub tokens: TokenStream,
    /// Recovered syntax errors; informational only.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse `source` and emit its structural tokens.
///
/// Syntax errors never fail this call; they are reported in
/// [`Tokenized::diagnostics`]. A node shape no rule can place is fatal and
/// no partial stream is returned.
pub fn tokenize(source: &str) -> Result<Tokenized, TokenizeError> {
    let tree = pool::with_parser(|parser| parser.parse(source))??;
    let parsed = ts::ParsedSource { source, tree };

    let positions = PositionMap::new(source);
    log::debug!(
        "parsed {} bytes over {} line(s)",
        source.len(),
        positions.line_count()
    );

    let diagnostics = if parsed.has_errors() {
        let diagnostics = ts::collect_diagnostics(&parsed);
        log::debug!("recovered from {} syntax error(s)", diagnostics.len());
        diagnostics
    } else {
        Vec::new()
    };

    let root = ts::lower(&parsed)?;
    log::debug!("lowered {} nodes", root.count());

    let tokens = dispatch(&root, &positions)?;
    log::debug!("emitted {} tokens", tokens.len());

    Ok(Tokenized {
        tokens,
        diagnostics,
    })
}
