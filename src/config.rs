//! Parser configuration and the pluggable strategies it installs.
//!
//! [`ParserConfig`] is plain data and can be loaded with serde. The parser
//! consults a [`TagPolicy`] for each tag it sees and builds elements through
//! an [`ElementFactory`]; both are trait objects so callers can substitute
//! their own.

use crate::dom::Element;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Settings for an [`XmlParser`](crate::XmlParser).
///
/// ```
/// use lenient_xml::ParserConfig;
///
/// let config: ParserConfig = serde_json::from_str(
///     r#"{ "empty_tags": ["br", "img"], "char_entities": { "nbsp": 160 } }"#,
/// ).unwrap();
/// assert!(!config.case_sensitive);
/// assert_eq!(config.empty_tags, vec!["br", "img"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Keep whitespace-only runs between tags as single-space text nodes.
    pub include_whitespace_between_tags: bool,
    /// Keep tag and attribute names as written instead of lower-casing them.
    pub case_sensitive: bool,
    /// Tags that never have content, such as `br`.
    pub empty_tags: Vec<String>,
    /// Tags reported as `TAG_NOT_SUPPORTED`.
    pub unsupported_tags: Vec<String>,
    /// Unsupported tags whose content is still parsed instead of skipped.
    pub evaluated_tags: Vec<String>,
    /// User char entities, symbol to code point.
    pub char_entities: HashMap<String, u32>,
}

impl ParserConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whitespace significance.
    pub fn with_whitespace_between_tags(mut self, include: bool) -> Self {
        self.include_whitespace_between_tags = include;
        self
    }

    /// Sets case sensitivity of names.
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Adds tags that never have content.
    pub fn with_empty_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.empty_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds tags that are reported as unsupported.
    pub fn with_unsupported_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsupported_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds unsupported tags whose content is still parsed.
    pub fn with_evaluated_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evaluated_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds a user char entity.
    pub fn with_char_entity<S: Into<String>>(mut self, symbol: S, code: u32) -> Self {
        self.char_entities.insert(symbol.into(), code);
        self
    }
}

/// Decides how the parser treats each tag name.
///
/// Names are passed as the parser stores them (lower-cased unless the parser
/// is case sensitive).
pub trait TagPolicy: Send + Sync {
    /// Returns false to report the tag as `TAG_NOT_SUPPORTED`.
    fn is_supported(&self, _name: &str) -> bool {
        true
    }

    /// For unsupported tags: returns true to parse the content anyway,
    /// false to skip it.
    fn should_evaluate(&self, _name: &str) -> bool {
        true
    }

    /// Returns true for tags that never have content.
    fn is_empty_tag(&self, _name: &str) -> bool {
        false
    }
}

/// Supports every tag and knows no empty tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTagPolicy;

impl TagPolicy for DefaultTagPolicy {}

/// A tag policy driven by the lists in a [`ParserConfig`].
///
/// Lookups ignore case.
#[derive(Debug, Default, Clone)]
pub struct ConfiguredTagPolicy {
    empty: HashSet<String>,
    unsupported: HashSet<String>,
    evaluated: HashSet<String>,
}

fn lowered(tags: &[String]) -> HashSet<String> {
    tags.iter().map(|t| t.to_lowercase()).collect()
}

impl ConfiguredTagPolicy {
    /// Builds the policy from the tag lists of `config`.
    pub fn from_config(config: &ParserConfig) -> Self {
        Self {
            empty: lowered(&config.empty_tags),
            unsupported: lowered(&config.unsupported_tags),
            evaluated: lowered(&config.evaluated_tags),
        }
    }
}

impl TagPolicy for ConfiguredTagPolicy {
    fn is_supported(&self, name: &str) -> bool {
        !self.unsupported.contains(&name.to_lowercase())
    }

    fn should_evaluate(&self, name: &str) -> bool {
        self.evaluated.contains(&name.to_lowercase())
    }

    fn is_empty_tag(&self, name: &str) -> bool {
        self.empty.contains(&name.to_lowercase())
    }
}

/// Outcome of storing an attribute through an [`ElementFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeStatus {
    /// The attribute was stored.
    Accepted,
    /// The attribute name is not allowed; reported as `ATTRIBUTE_NOT_SUPPORTED`.
    NotSupported,
    /// The value is not allowed; reported as `ATTRIBUTE_VALUE_INVALID`.
    InvalidValue,
}

/// Builds the elements of a parsed tree.
///
/// Implement this to validate attributes or decorate elements, e.g. for an
/// HTML dialect. The default methods build plain elements.
pub trait ElementFactory: Send + Sync {
    /// Creates a tag element.
    fn create_element(&self, name: &str) -> Element {
        Element::tag(name)
    }

    /// Creates a text element.
    fn create_text(&self, text: String) -> Element {
        Element::text(text)
    }

    /// Stores an attribute on a freshly created element.
    fn set_attribute(&self, element: &mut Element, name: &str, value: &str) -> Result<AttributeStatus> {
        element.set_attribute(name, value)?;
        Ok(AttributeStatus::Accepted)
    }
}

/// Builds plain [`Element`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFactory;

impl ElementFactory for DefaultFactory {}
