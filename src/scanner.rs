//! Single-character scanner with position tracking.

use crate::error::{Position, Result};
use crate::source::CharSource;

/// Returns true for the characters the parser treats as whitespace.
#[inline(always)]
pub fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\n' | '\t' | '\r')
}

/// Reads characters from a source, one at a time, tracking where it is.
///
/// There is no pushback: callers keep the "current character" themselves.
pub struct Scanner<S> {
    source: S,
    line: usize,
    col: usize,
    offset: usize,
}

impl<S: CharSource> Scanner<S> {
    /// Creates a scanner at the start of `source`.
    #[inline]
    pub fn new(source: S) -> Self {
        Self {
            source,
            line: 1,
            col: 1,
            offset: 0,
        }
    }

    /// Returns the position of the next character to be read.
    #[inline]
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.col,
            offset: self.offset,
        }
    }

    /// Reads the next character.
    ///
    /// Errors from the source are passed through untouched; an invalid UTF-8
    /// sequence still counts as one character for position tracking.
    #[inline]
    pub fn next(&mut self) -> Result<Option<char>> {
        match self.source.next_char() {
            Ok(Some(c)) => {
                self.advance(c);
                Ok(Some(c))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                self.advance(char::REPLACEMENT_CHARACTER);
                Err(e)
            }
        }
    }

    #[inline(always)]
    fn advance(&mut self, c: char) {
        self.offset += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
    }
}
