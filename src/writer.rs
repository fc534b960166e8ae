//! Tree serializer.
//!
//! Writes a [`Node`] and its subtree back out as XML text. Pretty printing
//! indents one unit per level, except inside elements that directly contain
//! text, where whitespace would change the content.

use crate::dom::{Document, Node, NodeId};
use crate::error::Result;
use crate::escape::{escape_ascii_to, escape_to};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Serializer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// One indentation unit. `None` writes everything on one line.
    pub indent: Option<String>,
    /// Escape `"`, `&`, `<`, `>` and `'` in names, values and text.
    pub escape: bool,
    /// Write non-ASCII characters as `&#N;`. Implies `escape`.
    pub ascii_only: bool,
    /// Start with an XML declaration.
    pub declaration: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            indent: None,
            escape: true,
            ascii_only: false,
            declaration: false,
        }
    }
}

impl WriterConfig {
    /// Compact output with escaping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-space indentation with escaping.
    pub fn pretty() -> Self {
        Self::default().with_indent("  ")
    }

    /// Sets the indentation unit.
    pub fn with_indent<S: Into<String>>(mut self, indent: S) -> Self {
        self.indent = Some(indent.into());
        self
    }

    /// Enables or disables escaping.
    pub fn with_escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Enables or disables ASCII-only output.
    pub fn with_ascii_only(mut self, ascii_only: bool) -> Self {
        self.ascii_only = ascii_only;
        self
    }

    /// Enables or disables the XML declaration.
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

/// Writes trees to an [`io::Write`](std::io::Write).
pub struct TreeWriter<W: Write> {
    writer: W,
    config: WriterConfig,
}

impl<W: Write> TreeWriter<W> {
    /// Creates a compact writer.
    #[inline]
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, WriterConfig::default())
    }

    /// Creates a writer with the given settings.
    #[inline]
    pub fn with_config(writer: W, config: WriterConfig) -> Self {
        Self { writer, config }
    }

    /// Returns the inner writer.
    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes `node` and its subtree.
    pub fn write(&mut self, node: Node<'_>) -> Result<()> {
        let mut out = String::new();
        render(node, &self.config, &mut out);
        self.writer.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Writes the root of `doc`.
    pub fn write_document(&mut self, doc: &Document) -> Result<()> {
        self.write(doc.root())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Serializes a subtree on one line.
pub fn to_string(node: Node<'_>) -> String {
    to_string_with(node, &WriterConfig::default())
}

/// Serializes a subtree with two-space indentation.
pub fn to_string_pretty(node: Node<'_>) -> String {
    to_string_with(node, &WriterConfig::pretty())
}

/// Serializes a subtree with the given settings.
pub fn to_string_with(node: Node<'_>, config: &WriterConfig) -> String {
    let mut out = String::new();
    render(node, config, &mut out);
    out
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_string(*self))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root(), f)
    }
}

enum Step {
    Enter { id: NodeId, inline: bool },
    Exit { id: NodeId, inline: bool, inline_children: bool },
}

fn push_escaped(out: &mut String, s: &str, config: &WriterConfig) {
    if config.ascii_only {
        escape_ascii_to(s, out);
    } else if config.escape {
        escape_to(s, out);
    } else {
        out.push_str(s);
    }
}

fn newline(out: &mut String, config: &WriterConfig, inline: bool) {
    if config.indent.is_some() && !inline {
        out.push('\n');
    }
}

/// Renders a subtree without recursion.
fn render(node: Node<'_>, config: &WriterConfig, out: &mut String) {
    let doc = node.document();
    let unit = config.indent.as_deref().unwrap_or("");
    let mut indent = String::new();

    if config.declaration {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
        newline(out, config, false);
    }

    let mut steps = vec![Step::Enter { id: node.id(), inline: false }];
    while let Some(step) = steps.pop() {
        match step {
            Step::Enter { id, inline } => {
                let Some(node) = doc.node(id) else { continue };
                let Some(name) = node.tag_name() else {
                    push_escaped(out, node.text().unwrap_or_default(), config);
                    continue;
                };

                if !inline {
                    out.push_str(&indent);
                }
                out.push('<');
                push_escaped(out, name, config);
                for (key, value) in node.attributes() {
                    out.push(' ');
                    push_escaped(out, key, config);
                    out.push_str("=\"");
                    push_escaped(out, value, config);
                    out.push('"');
                }

                if node.is_empty() {
                    out.push_str("/>");
                    newline(out, config, inline);
                    continue;
                }

                out.push('>');
                let inline_children = inline || node.has_text_child();
                newline(out, config, inline_children);
                indent.push_str(unit);
                steps.push(Step::Exit { id, inline, inline_children });
                let children: Vec<NodeId> = node.children().map(|c| c.id()).collect();
                steps.extend(
                    children
                        .into_iter()
                        .rev()
                        .map(|id| Step::Enter { id, inline: inline_children }),
                );
            }
            Step::Exit { id, inline, inline_children } => {
                indent.truncate(indent.len() - unit.len());
                if !inline_children {
                    out.push_str(&indent);
                }
                out.push_str("</");
                if let Some(name) = doc.node(id).and_then(|n| n.tag_name()) {
                    push_escaped(out, name, config);
                }
                out.push('>');
                newline(out, config, inline);
            }
        }
    }
}
