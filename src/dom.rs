//! In-memory document tree.
//!
//! All elements of a tree live in a [`Document`] arena and are addressed by
//! [`NodeId`]. A parent's child list is the only ownership path; the parent
//! link is a plain id used for upward traversal. Trees are read through
//! [`Node`] handles and changed through the mutation methods on `Document`.
//!
//! ```
//! use lenient_xml::XmlParser;
//!
//! let doc = XmlParser::new()
//!     .parse_str(r#"<feed><entry id="1"><title>One</title></entry></feed>"#)
//!     .unwrap()
//!     .unwrap();
//! let root = doc.root();
//! let entry = root.element_by_id("1").unwrap();
//! let title = entry.first_child_by_tag_name("TITLE").unwrap();
//! assert_eq!(title.child_at(0).unwrap().text(), Some("One"));
//! ```

use crate::error::{Error, Result};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

/// Depth value meaning "search the whole subtree".
pub const DEPTH_INFINITE: usize = usize::MAX;

/// Index of an element inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ElementData {
    Tag {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

/// A tag or text element.
///
/// Attribute storage preserves insertion order; setting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    data: ElementData,
    comment: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element {
    /// Creates a tag element.
    pub fn tag<S: Into<String>>(name: S) -> Self {
        Self {
            data: ElementData::Tag {
                name: name.into(),
                attributes: Vec::new(),
            },
            comment: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates a text element.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            data: ElementData::Text(text.into()),
            comment: false,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Creates a comment-flagged element holding `content` in its
    /// `content` attribute.
    pub fn comment<S: Into<String>>(name: &str, content: S) -> Self {
        let mut element = Self::tag(name);
        element.comment = true;
        if let ElementData::Tag { attributes, .. } = &mut element.data {
            attributes.push(("content".to_string(), content.into()));
        }
        element
    }

    /// Returns true for text elements.
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, ElementData::Text(_))
    }

    /// Returns true for elements made from comments, declarations and
    /// processing instructions.
    #[inline]
    pub fn is_comment(&self) -> bool {
        self.comment
    }

    /// Returns the tag name, or `None` for text elements.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.data {
            ElementData::Tag { name, .. } => Some(name),
            ElementData::Text(_) => None,
        }
    }

    /// Returns the text, or `None` for tag elements.
    pub fn text_content(&self) -> Option<&str> {
        match &self.data {
            ElementData::Text(text) => Some(text),
            ElementData::Tag { .. } => None,
        }
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the attributes in insertion order.
    pub fn attributes(&self) -> &[(String, String)] {
        match &self.data {
            ElementData::Tag { attributes, .. } => attributes,
            ElementData::Text(_) => &[],
        }
    }

    /// Sets an attribute, replacing an existing value.
    pub fn set_attribute<N, V>(&mut self, name: N, value: V) -> Result<()>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let ElementData::Tag { attributes, .. } = &mut self.data else {
            return Err(Error::text_element());
        };
        let name = name.into();
        let value = value.into();
        match attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => attributes.push((name, value)),
        }
        Ok(())
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let ElementData::Tag { attributes, .. } = &mut self.data else {
            return None;
        };
        let index = attributes.iter().position(|(key, _)| key == name)?;
        Some(attributes.remove(index).1)
    }

    /// Replaces the text of a text element.
    pub fn set_text<S: Into<String>>(&mut self, text: S) -> Result<()> {
        match &mut self.data {
            ElementData::Text(current) => {
                *current = text.into();
                Ok(())
            }
            ElementData::Tag { .. } => Err(Error::custom("only text elements hold text")),
        }
    }
}

/// An arena holding a tree of elements.
///
/// A document always has a root. Elements created through the document
/// start out detached and become part of the tree once attached. Detached
/// elements, including removed children, keep their slot and their
/// [`NodeId`] until the document is dropped, so they can be attached again.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
}

impl Document {
    /// Creates a document with `root` as its root element.
    pub fn new(root: Element) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.insert(root);
        doc
    }

    /// Moves an element into the arena as a detached node.
    pub fn insert(&mut self, mut element: Element) -> NodeId {
        element.parent = None;
        element.children.clear();
        let id = NodeId(self.nodes.len());
        self.nodes.push(element);
        id
    }

    /// Returns the number of elements in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drops `id` and every element inserted after it. No element before
    /// `id` may refer to one of them.
    pub(crate) fn truncate(&mut self, id: NodeId) {
        self.nodes.truncate(id.0);
    }

    /// Creates a detached tag element.
    pub fn create_element<S: Into<String>>(&mut self, name: S) -> NodeId {
        self.insert(Element::tag(name))
    }

    /// Creates a detached text element.
    pub fn create_text<S: Into<String>>(&mut self, text: S) -> NodeId {
        self.insert(Element::text(text))
    }

    /// Returns the element data for an id.
    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Element> {
        self.nodes.get_mut(id.0).ok_or_else(Error::unknown_node)
    }

    /// Returns a handle for an id.
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        self.get(id).map(|_| Node { doc: self, id })
    }

    /// Returns the root element.
    pub fn root(&self) -> Node<'_> {
        Node {
            doc: self,
            id: self.root,
        }
    }

    /// Makes a detached element the document root.
    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        if self.get_mut(id)?.parent.is_some() {
            return Err(Error::already_attached());
        }
        self.root = id;
        Ok(())
    }

    /// Checks that `child` may be attached under `parent`.
    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_el = self.get(parent).ok_or_else(Error::unknown_node)?;
        let child_el = self.get(child).ok_or_else(Error::unknown_node)?;
        if parent_el.is_text() {
            return Err(Error::text_element());
        }
        if child_el.parent.is_some() || self.root == child {
            return Err(Error::already_attached());
        }
        if parent == child {
            return Err(Error::already_attached());
        }
        // attaching an ancestor would create a cycle; a leaf is nobody's ancestor
        if !child_el.children.is_empty() {
            let mut cursor = self.nodes[parent.0].parent;
            while let Some(id) = cursor {
                if id == child {
                    return Err(Error::already_attached());
                }
                cursor = self.nodes[id.0].parent;
            }
        }
        Ok(())
    }

    /// Appends a detached element to `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Inserts a detached element at `index` in `parent`'s children.
    pub fn insert_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.check_attach(parent, child)?;
        let len = self.nodes[parent.0].children.len();
        if index > len {
            return Err(Error::index_out_of_bounds(index, len));
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        Ok(())
    }

    /// Detaches the child at `index` and returns its id.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let children = &mut self.get_mut(parent)?.children;
        if index >= children.len() {
            return Err(Error::index_out_of_bounds(index, children.len()));
        }
        let child = children.remove(index);
        self.nodes[child.0].parent = None;
        Ok(child)
    }

    /// Replaces `old` (a child of `parent`) with the detached `new`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<()> {
        self.check_attach(parent, new)?;
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or_else(Error::not_a_child)?;
        self.nodes[parent.0].children[index] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    /// Sets an attribute on a tag element.
    pub fn set_attribute<N, V>(&mut self, id: NodeId, name: N, value: V) -> Result<()>
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.get_mut(id)?.set_attribute(name, value)
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        Ok(self.get_mut(id)?.remove_attribute(name))
    }

    /// Replaces the text of a text element.
    pub fn set_text<S: Into<String>>(&mut self, id: NodeId, text: S) -> Result<()> {
        self.get_mut(id)?.set_text(text)
    }
}

/// A read-only handle to an element of a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag_name() {
            Some(name) => write!(f, "Node({:?}, <{}>)", self.id, name),
            None => write!(f, "Node({:?}, {:?})", self.id, self.text().unwrap_or_default()),
        }
    }
}

impl<'a> Node<'a> {
    #[inline]
    fn data(&self) -> &'a Element {
        &self.doc.nodes[self.id.0]
    }

    #[inline]
    fn wrap(&self, id: NodeId) -> Node<'a> {
        Node { doc: self.doc, id }
    }

    /// Returns the id of this element.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the document this element belongs to.
    #[inline]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Returns the element data.
    #[inline]
    pub fn element(&self) -> &'a Element {
        self.data()
    }

    /// Returns true for text elements.
    #[inline]
    pub fn is_text(&self) -> bool {
        self.data().is_text()
    }

    /// Returns true for comment-flagged elements.
    #[inline]
    pub fn is_comment(&self) -> bool {
        self.data().is_comment()
    }

    /// Returns the tag name, or `None` for text elements.
    #[inline]
    pub fn tag_name(&self) -> Option<&'a str> {
        self.data().tag_name()
    }

    /// Returns the text, or `None` for tag elements.
    #[inline]
    pub fn text(&self) -> Option<&'a str> {
        self.data().text_content()
    }

    /// Returns the value of an attribute.
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.data().attribute(name)
    }

    /// Returns the attributes in insertion order.
    #[inline]
    pub fn attributes(&self) -> &'a [(String, String)] {
        self.data().attributes()
    }

    /// Returns the parent element.
    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent.map(|id| self.wrap(id))
    }

    /// Iterates over the direct children.
    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        self.data().children.iter().map(move |&id| Node { doc, id })
    }

    /// Returns the number of direct children.
    #[inline]
    pub fn num_children(&self) -> usize {
        self.data().children.len()
    }

    /// Returns true if there are no children.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data().children.is_empty()
    }

    /// Returns the child at `index`.
    pub fn child_at(&self, index: usize) -> Option<Node<'a>> {
        self.data().children.get(index).map(|&id| self.wrap(id))
    }

    /// Returns the position of `child` among the children.
    pub fn child_index(&self, child: Node<'_>) -> Option<usize> {
        if !std::ptr::eq(self.doc, child.doc) {
            return None;
        }
        self.data().children.iter().position(|&id| id == child.id)
    }

    /// Returns true if any direct child is a text element.
    pub fn has_text_child(&self) -> bool {
        self.children().any(|c| c.is_text())
    }

    fn has_tag_name(&self, name: &str) -> bool {
        self.tag_name().is_some_and(|tag| names_match(tag, name))
    }

    /// Returns the first direct child with the given tag name, ignoring case.
    pub fn first_child_by_tag_name(&self, name: &str) -> Option<Node<'a>> {
        self.children().find(|c| c.has_tag_name(name))
    }

    /// Returns the direct children with the given tag name.
    pub fn children_by_tag_name(&self, name: &str) -> Vec<Node<'a>> {
        self.descendants_by_tag_name(name, 1)
    }

    /// Returns descendants with the given tag name, at most `depth` levels
    /// down, in document order.
    ///
    /// A depth of 1 searches the children only; [`DEPTH_INFINITE`] searches
    /// the whole subtree.
    pub fn descendants_by_tag_name(&self, name: &str, depth: usize) -> Vec<Node<'a>> {
        let mut found = Vec::new();
        self.collect(depth, &mut found, &|n| n.has_tag_name(name));
        found
    }

    /// Like [`descendants_by_tag_name`](Self::descendants_by_tag_name), keeping
    /// only elements whose `attribute` is present and non-empty.
    pub fn descendants_by_tag_name_and_attribute(
        &self,
        name: &str,
        attribute: &str,
        depth: usize,
    ) -> Vec<Node<'a>> {
        let mut found = Vec::new();
        self.collect(depth, &mut found, &|n| {
            n.has_tag_name(name) && n.attribute(attribute).is_some_and(|v| !v.is_empty())
        });
        found
    }

    /// Returns text descendants containing `text`, at most `depth` levels
    /// down. `None` matches every text element.
    pub fn text_descendants(
        &self,
        text: Option<&str>,
        case_sensitive: bool,
        depth: usize,
    ) -> Vec<Node<'a>> {
        let needle = text.map(|t| if case_sensitive { t.to_string() } else { t.to_lowercase() });
        let mut found = Vec::new();
        self.collect(depth, &mut found, &|n| match (n.text(), &needle) {
            (Some(_), None) => true,
            (Some(content), Some(needle)) if case_sensitive => content.contains(needle.as_str()),
            (Some(content), Some(needle)) => content.to_lowercase().contains(needle.as_str()),
            (None, _) => false,
        });
        found
    }

    /// Returns the text children containing `text`.
    pub fn text_children(&self, text: Option<&str>, case_sensitive: bool) -> Vec<Node<'a>> {
        self.text_descendants(text, case_sensitive, 1)
    }

    /// Pre-order walk of the subtree below this element, bounded by `depth`.
    fn collect(&self, depth: usize, found: &mut Vec<Node<'a>>, matches: &dyn Fn(&Node<'a>) -> bool) {
        if depth == 0 {
            return;
        }
        // (node, levels below self)
        let mut stack = Vec::new();
        push_children(&mut stack, *self, 1);
        while let Some((node, level)) = stack.pop() {
            if matches(&node) {
                found.push(node);
            }
            if level < depth {
                push_children(&mut stack, node, level + 1);
            }
        }
    }

    /// Returns the first element, in document order starting with this one,
    /// whose `id` attribute equals `id`.
    pub fn element_by_id(&self, id: &str) -> Option<Node<'a>> {
        let mut stack = vec![(*self, 0)];
        while let Some((node, level)) = stack.pop() {
            if node.attribute("id") == Some(id) {
                return Some(node);
            }
            push_children(&mut stack, node, level + 1);
        }
        None
    }

    /// Returns true if `other` is this element or one of its descendants.
    pub fn contains(&self, other: Node<'_>) -> bool {
        if !std::ptr::eq(self.doc, other.doc) {
            return false;
        }
        let mut cursor = Some(other.id);
        while let Some(id) = cursor {
            if id == self.id {
                return true;
            }
            cursor = self.doc.nodes[id.0].parent;
        }
        false
    }
}

/// Compares tag names ignoring case.
pub(crate) fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.chars().flat_map(char::to_lowercase).eq(b.chars().flat_map(char::to_lowercase))
}

/// Pushes the children of `node` so that they pop in document order.
fn push_children<'a>(stack: &mut Vec<(Node<'a>, usize)>, node: Node<'a>, level: usize) {
    let start = stack.len();
    stack.extend(node.children().map(|child| (child, level)));
    stack[start..].reverse();
}

struct Attributes<'a>(&'a [(String, String)]);

impl Serialize for Attributes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct Children<'a>(Node<'a>);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.num_children()))?;
        for child in self.0.children() {
            seq.serialize_element(&child)?;
        }
        seq.end()
    }
}

/// Tags serialize as `{"tag", "attributes", "children"}`, text as `{"text"}`.
///
/// Each level of the tree nests one more call into the serializer, so a very
/// deep tree can exhaust the stack. [`crate::to_string`] walks iteratively
/// and has no such limit.
impl Serialize for Node<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.tag_name() {
            Some(name) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("tag", name)?;
                map.serialize_entry("attributes", &Attributes(self.attributes()))?;
                map.serialize_entry("children", &Children(*self))?;
                map.end()
            }
            None => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("text", self.text().unwrap_or_default())?;
                map.end()
            }
        }
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}
