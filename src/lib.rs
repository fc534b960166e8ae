//! # lenient_xml
//!
//! A streaming, fault-tolerant XML parser for documents from servers that
//! don't always get XML right.
//!
//! ## Features
//!
//! - Builds an in-memory tree ([`Document`]) or reports start/end/attribute/text
//!   callbacks ([`EventHandler`]) from the same scanning logic
//! - Recovers from unclosed tags, stray close tags, bad entities, missing
//!   quotes and invalid UTF-8, reporting each anomaly to an [`ErrorHandler`]
//!   that decides whether to go on
//! - Built-in and user-defined char entities
//! - Pluggable tag policy and element factory for HTML-like dialects
//! - Serializer with pretty printing and ASCII-only output
//! - No recursion on input depth
//!
//! ## Quick Start
//!
//! ```rust
//! use lenient_xml::{parse, to_string};
//!
//! let doc = parse("<list><item>one<item>two</list>").unwrap().unwrap();
//! let list = doc.root();
//! assert_eq!(list.tag_name(), Some("list"));
//! assert_eq!(to_string(list), "<list><item>one<item>two</item></item></list>");
//! ```
//!
//! ## Watching for problems
//!
//! ```rust
//! use lenient_xml::{ErrorCode, ParseIssue, StrSource, XmlParser};
//!
//! let mut codes = Vec::new();
//! let doc = XmlParser::new()
//!     .parse_with(StrSource::new("<a>&bogus;</a><b/>"), &mut |issue: &ParseIssue| {
//!         codes.push(issue.code);
//!         true
//!     })
//!     .unwrap();
//! assert!(doc.is_some());
//! assert_eq!(codes, vec![ErrorCode::UnrecognizedCharEntity, ErrorCode::MultipleRoots]);
//! ```
//!
//! ## Event mode
//!
//! ```rust
//! use lenient_xml::{EventHandler, StrSource, XmlParser};
//!
//! #[derive(Default)]
//! struct Titles(Vec<String>, bool);
//!
//! impl EventHandler for Titles {
//!     fn start_tag(&mut self, name: &str) -> bool {
//!         self.1 = name == "title";
//!         true
//!     }
//!     fn text(&mut self, text: &str) {
//!         if self.1 {
//!             self.0.push(text.to_string());
//!         }
//!     }
//!     fn end_tag(&mut self, _name: &str) {
//!         self.1 = false;
//!     }
//! }
//!
//! let mut titles = Titles::default();
//! XmlParser::new()
//!     .event_parse(
//!         StrSource::new("<rss><item><title>A</title></item><item><title>B</title></item></rss>"),
//!         &mut titles,
//!     )
//!     .unwrap();
//! assert_eq!(titles.0, vec!["A", "B"]);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

mod builder;
pub mod config;
pub mod dom;
pub mod entities;
pub mod error;
pub mod escape;
pub mod event;
pub mod parser;
pub mod scanner;
pub mod source;
mod tag;
pub mod writer;

use std::io::Read;

// Re-export main types and functions
pub use config::{
    AttributeStatus, ConfiguredTagPolicy, DefaultFactory, DefaultTagPolicy, ElementFactory, ParserConfig,
    TagPolicy,
};
pub use dom::{Document, Element, Node, NodeId, DEPTH_INFINITE};
pub use entities::EntityTable;
pub use error::{
    Error, ErrorCode, ErrorHandler, ErrorKind, IssueCollector, ParseIssue, Position, Result, Tolerant,
};
pub use escape::{escape, unescape};
pub use event::{EventHandler, EventRecorder, XmlEvent};
pub use parser::XmlParser;
pub use source::{CharSource, ReadSource, StrSource};
pub use writer::{to_string, to_string_pretty, to_string_with, TreeWriter, WriterConfig};

/// Parses a string with the default settings.
pub fn parse(input: &str) -> Result<Option<Document>> {
    XmlParser::new().parse_str(input)
}

/// Parses UTF-8 bytes from a reader with the default settings.
pub fn parse_reader<R: Read>(reader: R) -> Result<Option<Document>> {
    XmlParser::new().parse_reader(reader)
}
