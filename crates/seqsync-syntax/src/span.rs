//! Source positions.
//!
//! A [`Span`] pins a token or node to the source both as a byte range (for
//! slicing and cursor math) and as a 1-based line/column pair (for
//! diagnostics). Columns count chars, not bytes, so non-ASCII participant
//! names report the column a user would see.

use std::ops::Range;

/// Location of a token or node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column, counted in chars.
    pub column: u32,
    /// Byte offset of the first byte.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// Byte offset one past the last byte.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// The span as a byte range.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// True if `offset` falls inside the span (end inclusive, so a caret
    /// sitting right after the last character still belongs to it).
    pub fn contains(&self, offset: usize) -> bool {
        self.offset <= offset && offset <= self.end()
    }
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { text, line_starts }
    }

    /// Line and column (both 1-based) of a byte offset.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line as u32 + 1, column as u32 + 1)
    }

    /// Build a span for a byte range.
    pub fn span(&self, range: Range<usize>) -> Span {
        let (line, column) = self.line_col(range.start);
        Span {
            line,
            column,
            offset: range.start,
            len: range.end.saturating_sub(range.start),
        }
    }

    /// Byte offset of the start of the line containing `offset`.
    pub fn line_start(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => self.line_starts[line],
            Err(next) => self.line_starts[next - 1],
        }
    }
}
