//! Event mode: structure reported through callbacks instead of a tree.
//!
//! An [`EventHandler`] sees every start tag, attribute, text run and end tag
//! in document order. Each accepted start tag gets exactly one `end_tag`
//! unless the input ends first; self-closed and empty tags get theirs right
//! away.

use crate::config::AttributeStatus;
use crate::error::{ParseIssue, Result};
use crate::parser::{Sink, TagEnd};
use serde::Serialize;

/// Callbacks for [`XmlParser::event_parse`](crate::XmlParser::event_parse).
///
/// Every method has a default that ignores the event.
pub trait EventHandler {
    /// A start tag. Return false to reject it: the tag is reported as
    /// `TAG_NOT_SUPPORTED`, its content is skipped and no `end_tag` follows.
    fn start_tag(&mut self, _name: &str) -> bool {
        true
    }

    /// An attribute of the current start tag.
    fn attribute(&mut self, _tag: &str, _name: &str, _value: &str) {}

    /// The end of an accepted tag.
    fn end_tag(&mut self, _name: &str) {}

    /// A text run or CDATA section.
    fn text(&mut self, _text: &str) {}

    /// A recoverable issue. Return false to abort.
    fn parsing_error(&mut self, _issue: &ParseIssue) -> bool {
        true
    }
}

/// One recorded callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum XmlEvent {
    /// `start_tag`.
    StartTag {
        /// Tag name.
        name: String,
    },
    /// `attribute`.
    Attribute {
        /// Owning tag.
        tag: String,
        /// Attribute name.
        name: String,
        /// Decoded value.
        value: String,
    },
    /// `end_tag`.
    EndTag {
        /// Tag name.
        name: String,
    },
    /// `text`.
    Text {
        /// The text.
        text: String,
    },
}

/// An [`EventHandler`] that records every event and issue.
#[derive(Debug, Default, Clone)]
pub struct EventRecorder {
    /// The events, in order.
    pub events: Vec<XmlEvent>,
    /// The issues, in order.
    pub issues: Vec<ParseIssue>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventHandler for EventRecorder {
    fn start_tag(&mut self, name: &str) -> bool {
        self.events.push(XmlEvent::StartTag { name: name.to_string() });
        true
    }

    fn attribute(&mut self, tag: &str, name: &str, value: &str) {
        self.events.push(XmlEvent::Attribute {
            tag: tag.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn end_tag(&mut self, name: &str) {
        self.events.push(XmlEvent::EndTag { name: name.to_string() });
    }

    fn text(&mut self, text: &str) {
        self.events.push(XmlEvent::Text { text: text.to_string() });
    }

    fn parsing_error(&mut self, issue: &ParseIssue) -> bool {
        self.issues.push(issue.clone());
        true
    }
}

/// The event-mode sink.
pub(crate) struct EventSink<'h> {
    handler: &'h mut dyn EventHandler,
    /// Whether the handler accepted the tag begun last.
    accepted: bool,
}

impl<'h> EventSink<'h> {
    pub(crate) fn new(handler: &'h mut dyn EventHandler) -> Self {
        Self {
            handler,
            accepted: false,
        }
    }
}

impl Sink for EventSink<'_> {
    fn begin_tag(&mut self, name: &str) -> bool {
        self.accepted = self.handler.start_tag(name);
        self.accepted
    }

    fn attribute(&mut self, tag: &str, name: &str, value: &str) -> Result<AttributeStatus> {
        self.handler.attribute(tag, name, value);
        Ok(AttributeStatus::Accepted)
    }

    fn finish_tag(&mut self, name: &str, end: TagEnd) -> Result<()> {
        match end {
            TagEnd::Closed => self.handler.end_tag(name),
            TagEnd::Skipped if self.accepted => self.handler.end_tag(name),
            TagEnd::Open | TagEnd::Skipped => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &str) {
        self.handler.end_tag(name);
    }

    fn text(&mut self, text: String) -> Result<()> {
        self.handler.text(&text);
        Ok(())
    }

    fn report(&mut self, issue: &ParseIssue) -> bool {
        self.handler.parsing_error(issue)
    }
}
