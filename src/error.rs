//! Error types and the recoverable-issue reporting protocol.
//!
//! Two kinds of failure exist. Hard failures ([`Error`]) end a parse or reject
//! a tree mutation. Recoverable anomalies ([`ParseIssue`]) are handed to an
//! [`ErrorHandler`], which decides whether parsing continues.

use serde::Serialize;
use std::fmt::{self, Display};
use std::io;

/// Result type alias for lenient_xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for parsing, tree mutation and serialization.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    position: Option<Position>,
}

/// Position information for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Character offset from start.
    pub offset: usize,
}

/// The kind of error that occurred.
#[derive(Debug)]
pub enum ErrorKind {
    /// An I/O error occurred in the character source or the output writer.
    Io(io::Error),
    /// The byte source contained an invalid UTF-8 sequence.
    InvalidUtf8,
    /// The error handler asked to stop parsing.
    Aborted {
        /// The issue that was refused.
        code: ErrorCode,
        /// Human readable description of the issue.
        description: String,
    },
    /// Attributes or children were added to a text element.
    TextElement,
    /// The element is already attached to a parent.
    AlreadyAttached,
    /// The element is not a child of the given parent.
    NotAChild,
    /// The node id does not belong to this document.
    UnknownNode,
    /// A child index was out of range.
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of children.
        len: usize,
    },
    /// Custom error message.
    Custom(String),
}

impl Error {
    /// Creates a new error with the given kind.
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, position: None }
    }

    /// Creates a new error with position information.
    #[inline]
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the position where the error occurred.
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Returns true if the parse was stopped by the error handler.
    #[inline]
    pub fn is_aborted(&self) -> bool {
        matches!(self.kind, ErrorKind::Aborted { .. })
    }

    /// Creates an abort error for a refused issue.
    pub fn aborted(issue: &ParseIssue) -> Self {
        Self::new(ErrorKind::Aborted {
            code: issue.code,
            description: issue.description.clone(),
        })
        .with_position(issue.position)
    }

    /// Creates an invalid UTF-8 error.
    #[inline]
    pub fn invalid_utf8() -> Self {
        Self::new(ErrorKind::InvalidUtf8)
    }

    /// Creates a text element error.
    #[inline]
    pub fn text_element() -> Self {
        Self::new(ErrorKind::TextElement)
    }

    /// Creates an already attached error.
    #[inline]
    pub fn already_attached() -> Self {
        Self::new(ErrorKind::AlreadyAttached)
    }

    /// Creates a not-a-child error.
    #[inline]
    pub fn not_a_child() -> Self {
        Self::new(ErrorKind::NotAChild)
    }

    /// Creates an unknown node error.
    #[inline]
    pub fn unknown_node() -> Self {
        Self::new(ErrorKind::UnknownNode)
    }

    /// Creates an index out of bounds error.
    #[inline]
    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::new(ErrorKind::IndexOutOfBounds { index, len })
    }

    /// Creates a custom error.
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::new(ErrorKind::Custom(msg.into()))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(e) => write!(f, "I/O error: {}", e),
            ErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8"),
            ErrorKind::Aborted { code, description } => {
                write!(f, "parsing aborted on {}: {}", code, description)
            }
            ErrorKind::TextElement => {
                write!(f, "text elements cannot have attributes or children")
            }
            ErrorKind::AlreadyAttached => write!(f, "an element can't have two parents"),
            ErrorKind::NotAChild => write!(f, "element is not a child of this element"),
            ErrorKind::UnknownNode => write!(f, "node does not belong to this document"),
            ErrorKind::IndexOutOfBounds { index, len } => {
                write!(f, "child index {} out of bounds (len {})", index, len)
            }
            ErrorKind::Custom(msg) => write!(f, "{}", msg),
        }?;

        if let Some(pos) = self.position {
            write!(f, " at line {}, column {} (offset {})", pos.line, pos.column, pos.offset)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::new(ErrorKind::Io(e))
    }
}

/// Codes for the recoverable anomalies reported during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The tag was rejected by the tag policy or the event handler.
    TagNotSupported,
    /// The element factory refused the attribute.
    AttributeNotSupported,
    /// The element factory refused the attribute value.
    AttributeValueInvalid,
    /// An element was closed by a non-matching end tag.
    NoCloseTag,
    /// A char entity could not be resolved.
    UnrecognizedCharEntity,
    /// A tag ended in the middle of an attribute, or a close tag had nothing to close.
    UnexpectedTagClosing,
    /// A character appeared where the syntax expected something else.
    UnexpectedCharacter,
    /// The document had more than one top-level node.
    MultipleRoots,
    /// The document had no top-level node.
    NoRoots,
    /// The byte source was not valid UTF-8.
    Encoding,
}

impl ErrorCode {
    /// Returns the stable upper-case name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TagNotSupported => "TAG_NOT_SUPPORTED",
            ErrorCode::AttributeNotSupported => "ATTRIBUTE_NOT_SUPPORTED",
            ErrorCode::AttributeValueInvalid => "ATTRIBUTE_VALUE_INVALID",
            ErrorCode::NoCloseTag => "NO_CLOSE_TAG",
            ErrorCode::UnrecognizedCharEntity => "UNRECOGNIZED_CHAR_ENTITY",
            ErrorCode::UnexpectedTagClosing => "UNEXPECTED_TAG_CLOSING",
            ErrorCode::UnexpectedCharacter => "UNEXPECTED_CHARACTER",
            ErrorCode::MultipleRoots => "MULTIPLE_ROOTS",
            ErrorCode::NoRoots => "NO_ROOTS",
            ErrorCode::Encoding => "ENCODING",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseIssue {
    /// What went wrong.
    pub code: ErrorCode,
    /// The tag being parsed, if any.
    pub tag: Option<String>,
    /// The attribute being parsed, if any.
    pub attribute: Option<String>,
    /// The attribute value, if any.
    pub value: Option<String>,
    /// Human readable description.
    pub description: String,
    /// Where the scanner was when the issue was found.
    pub position: Position,
}

impl ParseIssue {
    /// Creates an issue with only a code and a description.
    pub fn new<S: Into<String>>(code: ErrorCode, description: S) -> Self {
        Self {
            code,
            tag: None,
            attribute: None,
            value: None,
            description: description.into(),
            position: Position::default(),
        }
    }

    /// Sets the tag the issue refers to.
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the attribute the issue refers to.
    pub fn with_attribute<S: Into<String>>(mut self, attribute: S) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the attribute value the issue refers to.
    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the position of the issue.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }
}

impl Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at line {}, column {}",
            self.code, self.description, self.position.line, self.position.column
        )
    }
}

/// Receives recoverable parsing issues.
///
/// Returning `false` stops the parse: the parser returns
/// [`ErrorKind::Aborted`] and no tree.
pub trait ErrorHandler {
    /// Called once per issue. Return `true` to keep parsing.
    fn parsing_error(&mut self, issue: &ParseIssue) -> bool;
}

impl<F> ErrorHandler for F
where
    F: FnMut(&ParseIssue) -> bool,
{
    fn parsing_error(&mut self, issue: &ParseIssue) -> bool {
        self(issue)
    }
}

/// An error handler that keeps parsing after every issue.
#[derive(Debug, Default, Clone, Copy)]
pub struct Tolerant;

impl ErrorHandler for Tolerant {
    fn parsing_error(&mut self, _issue: &ParseIssue) -> bool {
        true
    }
}

/// An error handler that records every issue and keeps parsing.
#[derive(Debug, Default, Clone)]
pub struct IssueCollector {
    /// The issues seen so far, in order.
    pub issues: Vec<ParseIssue>,
}

impl IssueCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the codes of the collected issues.
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.issues.iter().map(|i| i.code).collect()
    }
}

impl ErrorHandler for IssueCollector {
    fn parsing_error(&mut self, issue: &ParseIssue) -> bool {
        self.issues.push(issue.clone());
        true
    }
}
