//! Thread-local parser pooling.
//!
//! Creating a tree-sitter parser loads the PHP grammar; reusing one parser
//! per thread avoids paying that on every file.

use crate::ts::{PhpParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static PHP_PARSER: RefCell<Option<PhpParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use php_struct_tokens::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse("<?php echo 1;"))??;
/// assert_eq!(tree.root_node().kind(), "program");
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut PhpParser) -> R,
{
    PHP_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.take() {
            Some(parser) => parser,
            None => PhpParser::new()?,
        };
        Ok(f(slot.insert(parser)))
    })
}
