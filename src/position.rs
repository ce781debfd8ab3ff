//! Byte offset to line/column resolution.

use crate::ast::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("offset {offset} is past the end of the source ({len} bytes)")]
    OffsetOutOfRange { offset: usize, len: usize },
}

/// A 1-based line/column pair. Columns count bytes from the line start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn is_file_start(&self) -> bool {
        self.line == 1 && self.column == 1
    }
}

/// Precomputed line table for one source text.
#[derive(Debug, Clone)]
pub struct PositionMap {
    line_starts: Vec<usize>,
    len: usize,
}

impl PositionMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );

        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Resolve a byte offset. `offset == len` is allowed (end of file).
    pub fn position(&self, offset: usize) -> Result<Position, PositionError> {
        if offset > self.len {
            return Err(PositionError::OffsetOutOfRange {
                offset,
                len: self.len,
            });
        }

        // Index of the last line starting at or before `offset`.
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };

        Ok(Position {
            line: line_index + 1,
            column: offset - self.line_starts[line_index] + 1,
        })
    }

    /// Position of the first byte of `span`.
    pub fn start(&self, span: Span) -> Result<Position, PositionError> {
        self.position(span.start)
    }

    /// Position one past the last byte of `span`.
    pub fn end(&self, span: Span) -> Result<Position, PositionError> {
        self.position(span.end)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
