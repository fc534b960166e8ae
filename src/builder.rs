//! Builds a [`Document`] from what the content parser finds.

use crate::config::{AttributeStatus, ElementFactory};
use crate::dom::{Document, Element, NodeId};
use crate::error::{ErrorHandler, ParseIssue, Result};
use crate::parser::{Sink, TagEnd};

/// The DOM-mode sink.
///
/// The first top-level node becomes the document root. Later top-level
/// nodes are built detached, listed for the `MULTIPLE_ROOTS` report and
/// dropped from the returned document.
pub(crate) struct TreeBuilder<'a> {
    factory: &'a dyn ElementFactory,
    handler: &'a mut dyn ErrorHandler,
    doc: Option<Document>,
    /// Open tag elements, innermost last.
    stack: Vec<NodeId>,
    roots: Vec<NodeId>,
    /// The start tag being read.
    pending: Option<Element>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(factory: &'a dyn ElementFactory, handler: &'a mut dyn ErrorHandler) -> Self {
        Self {
            factory,
            handler,
            doc: None,
            stack: Vec::new(),
            roots: Vec::new(),
            pending: None,
        }
    }

    /// Moves an element into the tree under the innermost open tag.
    fn attach(&mut self, element: Element) -> Result<NodeId> {
        let Some(doc) = self.doc.as_mut() else {
            // nothing is open before the first node
            let doc = Document::new(element);
            let id = doc.root().id();
            self.doc = Some(doc);
            self.roots.push(id);
            return Ok(id);
        };
        let id = doc.insert(element);
        match self.stack.last() {
            Some(&parent) => doc.append_child(parent, id)?,
            None => self.roots.push(id),
        }
        Ok(id)
    }

    /// Describes each top-level node: the tag name, or the text for text
    /// nodes.
    pub(crate) fn root_summaries(&self) -> Vec<String> {
        let Some(doc) = &self.doc else {
            return Vec::new();
        };
        let first = self.roots.first().copied();
        self.roots
            .iter()
            .filter_map(|&id| doc.node(id))
            .map(|node| match (node.tag_name(), node.text()) {
                (Some(name), _) => name.to_string(),
                (None, text) if Some(node.id()) == first => format!("TEXT:{}", text.unwrap_or_default()),
                (None, text) => format!("Text ({})", text.unwrap_or_default()),
            })
            .collect()
    }

    /// Returns the document without the extra top-level nodes.
    pub(crate) fn into_document(self) -> Option<Document> {
        let mut doc = self.doc?;
        // every later root starts after the first root has closed, so the
        // extra roots and their subtrees fill the end of the arena
        if let Some(&extra) = self.roots.get(1) {
            doc.truncate(extra);
        }
        Some(doc)
    }
}

impl Sink for TreeBuilder<'_> {
    fn begin_tag(&mut self, name: &str) -> bool {
        self.pending = Some(self.factory.create_element(name));
        true
    }

    fn attribute(&mut self, _tag: &str, name: &str, value: &str) -> Result<AttributeStatus> {
        match self.pending.as_mut() {
            Some(element) => self.factory.set_attribute(element, name, value),
            None => Ok(AttributeStatus::Accepted),
        }
    }

    fn finish_tag(&mut self, name: &str, end: TagEnd) -> Result<()> {
        let element = match self.pending.take() {
            Some(element) => element,
            None => self.factory.create_element(name),
        };
        let id = self.attach(element)?;
        if end == TagEnd::Open {
            self.stack.push(id);
        }
        Ok(())
    }

    fn close(&mut self, _name: &str) {
        self.stack.pop();
    }

    fn text(&mut self, text: String) -> Result<()> {
        let element = self.factory.create_text(text);
        self.attach(element)?;
        Ok(())
    }

    fn report(&mut self, issue: &ParseIssue) -> bool {
        self.handler.parsing_error(issue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultFactory;
    use crate::error::{ErrorCode, IssueCollector, Tolerant};
    use crate::source::StrSource;
    use crate::XmlParser;

    #[test]
    fn test_builder_sequence() {
        let factory = DefaultFactory;
        let mut handler = Tolerant;
        let mut builder = TreeBuilder::new(&factory, &mut handler);

        assert!(builder.begin_tag("a"));
        builder.attribute("a", "id", "1").unwrap();
        builder.finish_tag("a", TagEnd::Open).unwrap();
        builder.text("hi".to_string()).unwrap();
        builder.begin_tag("br");
        builder.finish_tag("br", TagEnd::Closed).unwrap();
        builder.close("a");
        builder.text("tail".to_string()).unwrap();

        assert_eq!(builder.root_summaries(), vec!["a", "Text (tail)"]);
        let doc = builder.into_document().unwrap();
        let a = doc.root();
        assert_eq!(a.attribute("id"), Some("1"));
        assert_eq!(a.num_children(), 2);
        assert!(a.child_at(1).unwrap().is_empty());
    }

    #[test]
    fn test_text_first_root() {
        let mut issues = IssueCollector::new();
        let doc = XmlParser::new()
            .parse_with(StrSource::new("lead<a/>"), &mut issues)
            .unwrap()
            .unwrap();
        assert_eq!(doc.root().text(), Some("lead"));
        assert_eq!(issues.codes(), vec![ErrorCode::MultipleRoots]);
        assert!(issues.issues[0].description.contains("(TEXT:lead)"));
        assert!(issues.issues[0].description.ends_with("Excessive roots: a"));
    }

    #[test]
    fn test_extra_roots_dropped_from_arena() {
        let mut issues = IssueCollector::new();
        let doc = XmlParser::new()
            .parse_with(StrSource::new("<a><x/></a>mid<b><c/></b>"), &mut issues)
            .unwrap()
            .unwrap();
        assert_eq!(issues.codes(), vec![ErrorCode::MultipleRoots]);
        assert!(issues.issues[0].description.ends_with("Excessive roots: Text (mid),b"));
        assert_eq!(doc.node_count(), 2);
        assert_eq!(doc.root().num_children(), 1);
    }

    struct Strict;

    impl ElementFactory for Strict {
        fn set_attribute(&self, element: &mut Element, name: &str, value: &str) -> Result<AttributeStatus> {
            if name.starts_with("on") {
                return Ok(AttributeStatus::NotSupported);
            }
            if name == "width" && value.parse::<u32>().is_err() {
                return Ok(AttributeStatus::InvalidValue);
            }
            element.set_attribute(name, value)?;
            Ok(AttributeStatus::Accepted)
        }
    }

    #[test]
    fn test_factory_rejections_reported() {
        let parser = XmlParser::new().with_factory(Strict);
        let mut issues = IssueCollector::new();
        let doc = parser
            .parse_with(
                StrSource::new(r#"<img onclick="x()" width="wide" height="3"/>"#),
                &mut issues,
            )
            .unwrap()
            .unwrap();
        assert_eq!(
            issues.codes(),
            vec![ErrorCode::AttributeNotSupported, ErrorCode::AttributeValueInvalid]
        );
        let rejected = &issues.issues[1];
        assert_eq!(rejected.tag.as_deref(), Some("img"));
        assert_eq!(rejected.attribute.as_deref(), Some("width"));
        assert_eq!(rejected.value.as_deref(), Some("wide"));
        assert_eq!(doc.root().attributes(), &[("height".to_string(), "3".to_string())]);
    }
}
