//! The content parser and the public [`XmlParser`] entry points.
//!
//! Both consumption modes share one scanning loop. What the loop finds is
//! handed to a [`Sink`]: the tree builder in DOM mode, the event dispatcher
//! in event mode. Open elements live on an explicit frame stack, so nesting
//! depth is bounded by memory only.

use crate::builder::TreeBuilder;
use crate::config::{AttributeStatus, ConfiguredTagPolicy, DefaultFactory, ElementFactory, ParserConfig, TagPolicy};
use crate::dom::{names_match, Document};
use crate::entities::EntityTable;
use crate::error::{Error, ErrorCode, ErrorHandler, ErrorKind, ParseIssue, Result, Tolerant};
use crate::event::{EventHandler, EventSink};
use crate::scanner::{is_whitespace, Scanner};
use crate::source::{CharSource, ReadSource, StrSource};
use crate::tag::Markup;
use std::fmt;
use std::io::Read;
use tracing::{debug, trace, warn};

/// How a tag ended, as seen by a [`Sink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagEnd {
    /// `<name ...>`: content follows until the matching close.
    Open,
    /// `<name .../>` or an empty tag: no content, closed right away.
    Closed,
    /// Rejected or unsupported: the raw content was skipped.
    Skipped,
}

/// Receives what the content parser finds.
pub(crate) trait Sink {
    /// A tag name was read. Returns false to reject the tag.
    fn begin_tag(&mut self, name: &str) -> bool;

    /// An attribute of the tag begun last.
    fn attribute(&mut self, tag: &str, name: &str, value: &str) -> Result<AttributeStatus>;

    /// The start tag begun last is complete.
    fn finish_tag(&mut self, name: &str, end: TagEnd) -> Result<()>;

    /// The innermost open tag was closed.
    fn close(&mut self, name: &str);

    /// A text run or a CDATA section.
    fn text(&mut self, text: String) -> Result<()>;

    /// A recoverable issue. Returns false to abort.
    fn report(&mut self, issue: &ParseIssue) -> bool;
}

/// One open element on the nesting stack.
#[derive(Debug)]
struct Frame {
    /// `None` for the document level.
    name: Option<String>,
    leading_space: bool,
    has_children: bool,
}

impl Frame {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            leading_space: false,
            has_children: false,
        }
    }
}

/// The state of one parse call.
pub(crate) struct Run<'p, S, K> {
    pub(crate) parser: &'p XmlParser,
    scanner: Scanner<S>,
    pub(crate) sink: K,
    frames: Vec<Frame>,
    issues: usize,
}

impl<'p, S: CharSource, K: Sink> Run<'p, S, K> {
    pub(crate) fn new(parser: &'p XmlParser, source: S, sink: K) -> Self {
        Self {
            parser,
            scanner: Scanner::new(source),
            sink,
            frames: vec![Frame::new(None)],
            issues: 0,
        }
    }

    /// Reads the next character.
    ///
    /// Invalid UTF-8 is reported as `ENCODING` and replaced with U+FFFD;
    /// every other source error is fatal.
    pub(crate) fn bump(&mut self) -> Result<Option<char>> {
        match self.scanner.next() {
            Ok(c) => Ok(c),
            Err(e) if matches!(e.kind(), ErrorKind::InvalidUtf8) => {
                self.notify(ParseIssue::new(
                    ErrorCode::Encoding,
                    "Invalid UTF-8 sequence, replaced with U+FFFD",
                ))?;
                Ok(Some(char::REPLACEMENT_CHARACTER))
            }
            Err(e) => {
                let position = self.scanner.position();
                Err(e.with_position(position))
            }
        }
    }

    /// Hands an issue to the error handler and logs it.
    pub(crate) fn notify(&mut self, issue: ParseIssue) -> Result<()> {
        let issue = issue.with_position(self.scanner.position());
        self.issues += 1;
        if self.sink.report(&issue) {
            debug!(code = %issue.code, tag = ?issue.tag, line = issue.position.line, "{}", issue.description);
            Ok(())
        } else {
            warn!(code = %issue.code, tag = ?issue.tag, line = issue.position.line, "parse aborted: {}", issue.description);
            Err(Error::aborted(&issue))
        }
    }

    /// Applies the case setting to a tag or attribute name.
    pub(crate) fn normalize(&self, name: String) -> String {
        if self.parser.config.case_sensitive {
            name
        } else {
            name.to_lowercase()
        }
    }

    /// Decodes a char entity symbol into `out`, reporting it if unknown.
    pub(crate) fn push_entity(&mut self, symbol: &str, out: &mut String) -> Result<()> {
        match self.parser.entities.decode(symbol) {
            Ok(c) => out.push(c),
            Err(literal) => {
                self.notify(ParseIssue::new(
                    ErrorCode::UnrecognizedCharEntity,
                    format!("Unrecognized char entity: {}", symbol),
                ))?;
                out.push_str(&literal);
            }
        }
        Ok(())
    }

    fn top(&mut self) -> &mut Frame {
        // the document frame is never popped
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Parses content until the end of the stream.
    pub(crate) fn content(&mut self) -> Result<()> {
        let mut text: Option<String> = None;
        let mut entity: Option<String> = None;

        while let Some(c) = self.bump()? {
            if c == '<' {
                let whitespace = self.parser.config.include_whitespace_between_tags;
                let top = self.top();
                if whitespace && top.leading_space && text.is_none() && top.has_children {
                    text = Some(String::new());
                }
                self.flush(text.take(), entity.take())?;
                if !self.markup_step()? {
                    return Ok(());
                }
                continue;
            }

            let Some(run) = text.as_mut() else {
                if c == '&' {
                    entity = Some(String::new());
                    text = Some(String::new());
                } else if is_whitespace(c) {
                    self.top().leading_space = true;
                } else {
                    text = Some(c.to_string());
                }
                continue;
            };

            if c == '&' {
                if let Some(stale) = entity.replace(String::new()) {
                    run.push('&');
                    run.push_str(&stale);
                }
            } else if let Some(symbol) = entity.as_mut() {
                if c == ';' {
                    let symbol = std::mem::take(symbol);
                    entity = None;
                    self.push_entity(&symbol, run)?;
                } else if crate::entities::is_entity_char(c) {
                    symbol.push(c);
                } else {
                    run.push('&');
                    run.push_str(symbol);
                    run.push(c);
                    entity = None;
                }
            } else {
                run.push(c);
            }
        }

        // text inside an unfinished element is kept, stray text at the
        // document level is not a root
        if self.frames.len() > 1 {
            self.flush(text, entity)?;
        }
        Ok(())
    }

    /// Emits a pending text run.
    fn flush(&mut self, text: Option<String>, entity: Option<String>) -> Result<()> {
        let Some(mut text) = text else {
            return Ok(());
        };
        if let Some(symbol) = entity {
            text.push('&');
            text.push_str(&symbol);
        }
        let top = self.top();
        if top.leading_space {
            text.insert(0, ' ');
            top.leading_space = false;
        }
        top.has_children = true;
        self.sink.text(text)
    }

    /// Parses one piece of markup. Returns false at the end of the stream.
    fn markup_step(&mut self) -> Result<bool> {
        match self.markup()? {
            Markup::Opened(name) => {
                self.top().has_children = true;
                trace!(tag = %name, depth = self.frames.len(), "open");
                self.frames.push(Frame::new(Some(name)));
            }
            Markup::Child => self.top().has_children = true,
            Markup::Text(cdata) => {
                self.top().has_children = true;
                self.sink.text(cdata)?;
            }
            Markup::Comment(element) => {
                trace!(kind = ?element.tag_name(), "dropping comment");
            }
            Markup::End(name) => self.close_tag(name.trim())?,
            Markup::Ignored => {}
            Markup::Eof => return Ok(false),
        }
        Ok(true)
    }

    /// Handles `</name>`.
    ///
    /// Only the current element is compared. A close tag for anything else
    /// still ends the current element, reported as unclosed, and its parent
    /// carries on.
    fn close_tag(&mut self, name: &str) -> Result<()> {
        let matches_current = self.frames[1..]
            .last()
            .and_then(|f| f.name.as_deref())
            .is_some_and(|open| names_match(open, name));

        if !matches_current {
            if self.parser.policy.is_empty_tag(&self.normalize(name.to_string())) {
                trace!(tag = name, "ignoring close of empty tag");
                return Ok(());
            }
            if self.frames.len() == 1 {
                return self.notify(
                    ParseIssue::new(
                        ErrorCode::UnexpectedTagClosing,
                        format!("Closing tag {} has no open element", name),
                    )
                    .with_tag(name),
                );
            }
        }

        let Some(Frame { name: Some(current), .. }) = self.frames.pop() else {
            return Ok(());
        };
        if !matches_current {
            self.notify(
                ParseIssue::new(
                    ErrorCode::NoCloseTag,
                    format!("Malformed XML - no appropriate closing tag for {}", current),
                )
                .with_tag(current.as_str()),
            )?;
        }
        self.sink.close(&current);
        Ok(())
    }

    pub(crate) fn issues(&self) -> usize {
        self.issues
    }
}

/// A fault-tolerant XML parser.
///
/// A parser holds configuration only; every parse call keeps its own state,
/// so one parser can serve any number of parses.
///
/// ```
/// use lenient_xml::{ErrorCode, IssueCollector, StrSource, XmlParser};
///
/// let parser = XmlParser::new();
/// let mut issues = IssueCollector::new();
/// let doc = parser
///     .parse_with(StrSource::new("<a><b></a>"), &mut issues)
///     .unwrap()
///     .unwrap();
/// assert_eq!(doc.root().tag_name(), Some("a"));
/// assert_eq!(issues.codes(), vec![ErrorCode::NoCloseTag]);
/// ```
pub struct XmlParser {
    pub(crate) config: ParserConfig,
    pub(crate) entities: EntityTable,
    pub(crate) policy: Box<dyn TagPolicy>,
    pub(crate) factory: Box<dyn ElementFactory>,
}

impl Default for XmlParser {
    fn default() -> Self {
        Self::with_config(ParserConfig::default())
    }
}

impl fmt::Debug for XmlParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlParser")
            .field("config", &self.config)
            .field("user_entities", &self.entities.user_len())
            .finish_non_exhaustive()
    }
}

impl XmlParser {
    /// Creates a parser with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser from a configuration.
    ///
    /// The tag lists become a [`ConfiguredTagPolicy`] and the entity map is
    /// loaded into the entity table.
    pub fn with_config(config: ParserConfig) -> Self {
        let mut entities = EntityTable::new();
        for (symbol, &code) in &config.char_entities {
            entities.add_char_entity(symbol, code);
        }
        Self {
            policy: Box::new(ConfiguredTagPolicy::from_config(&config)),
            factory: Box::new(DefaultFactory),
            entities,
            config,
        }
    }

    /// Replaces the tag policy.
    ///
    /// The policy built from the configured `empty_tags`, `unsupported_tags`
    /// and `evaluated_tags` is dropped. A custom policy that should honor
    /// those lists can wrap [`ConfiguredTagPolicy::from_config`] and defer
    /// to it.
    pub fn with_tag_policy<P: TagPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Replaces the element factory.
    pub fn with_factory<F: ElementFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Returns the entity table.
    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    /// Keeps whitespace-only runs between tags as single-space text nodes.
    pub fn set_include_whitespaces_between_tags(&mut self, include: bool) {
        self.config.include_whitespace_between_tags = include;
    }

    /// Keeps names as written instead of lower-casing them.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.config.case_sensitive = case_sensitive;
    }

    /// Returns true if names are kept as written.
    pub fn is_case_sensitive(&self) -> bool {
        self.config.case_sensitive
    }

    /// Adds a user char entity. `symbol` may include the `&` and `;`.
    pub fn add_char_entity(&mut self, symbol: &str, code: u32) {
        self.entities.add_char_entity(symbol, code);
    }

    /// Adds consecutive user char entities starting at `start_code`.
    pub fn add_char_entities_range<I, T>(&mut self, symbols: I, start_code: u32)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.entities.add_char_entities_range(symbols, start_code);
    }

    /// Parses a document, continuing past every recoverable issue.
    pub fn parse<S: CharSource>(&self, source: S) -> Result<Option<Document>> {
        self.parse_with(source, &mut Tolerant)
    }

    /// Parses a string.
    pub fn parse_str(&self, input: &str) -> Result<Option<Document>> {
        self.parse(StrSource::new(input))
    }

    /// Parses UTF-8 bytes from a reader.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Option<Document>> {
        self.parse(ReadSource::new(reader))
    }

    /// Parses a document, reporting issues to `handler`.
    ///
    /// Returns `Ok(None)` if the input has no root element, and an
    /// [`ErrorKind::Aborted`] error if the handler stops the parse.
    pub fn parse_with<S: CharSource>(
        &self,
        source: S,
        handler: &mut dyn ErrorHandler,
    ) -> Result<Option<Document>> {
        trace!("dom parse started");
        let mut run = Run::new(self, source, TreeBuilder::new(self.factory.as_ref(), handler));
        run.content()?;

        let roots = run.sink.root_summaries();
        if roots.is_empty() {
            run.notify(ParseIssue::new(ErrorCode::NoRoots, "XML document contains no root element."))?;
            debug!(issues = run.issues(), "dom parse finished without a root");
            return Ok(None);
        }
        if roots.len() > 1 {
            run.notify(ParseIssue::new(
                ErrorCode::MultipleRoots,
                format!(
                    "XML document contains multiple root elements, only the first root ({}) will be used. Excessive roots: {}",
                    roots[0],
                    roots[1..].join(",")
                ),
            ))?;
        }
        debug!(issues = run.issues(), "dom parse finished");
        Ok(run.sink.into_document())
    }

    /// Parses a document, reporting structure to `handler` as it is found.
    pub fn event_parse<S: CharSource>(&self, source: S, handler: &mut dyn EventHandler) -> Result<()> {
        trace!("event parse started");
        let mut run = Run::new(self, source, EventSink::new(handler));
        run.content()?;
        debug!(issues = run.issues(), "event parse finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Node, DEPTH_INFINITE};
    use crate::error::IssueCollector;

    fn parse(input: &str) -> (Option<Document>, Vec<ErrorCode>) {
        let mut issues = IssueCollector::new();
        let doc = XmlParser::new()
            .parse_with(StrSource::new(input), &mut issues)
            .unwrap();
        (doc, issues.codes())
    }

    fn texts(node: Node<'_>) -> Vec<String> {
        node.text_descendants(None, true, DEPTH_INFINITE)
            .iter()
            .map(|t| t.text().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_nested_elements() {
        let (doc, issues) = parse("<a><b>hi</b></a>");
        let doc = doc.unwrap();
        assert!(issues.is_empty());
        let a = doc.root();
        assert_eq!(a.tag_name(), Some("a"));
        assert_eq!(a.num_children(), 1);
        let b = a.child_at(0).unwrap();
        assert_eq!(b.tag_name(), Some("b"));
        assert_eq!(b.child_at(0).unwrap().text(), Some("hi"));
    }

    #[test]
    fn test_text_entities() {
        let (doc, issues) = parse("<a>x &amp; y</a>");
        assert!(issues.is_empty());
        assert_eq!(texts(doc.unwrap().root()), vec!["x & y"]);
    }

    #[test]
    fn test_cdata_is_verbatim() {
        let (doc, issues) = parse("<a><![CDATA[<raw>&untouched]]></a>");
        assert!(issues.is_empty());
        assert_eq!(texts(doc.unwrap().root()), vec!["<raw>&untouched"]);
    }

    #[test]
    fn test_cdata_extra_bracket() {
        let (doc, _) = parse("<a><![CDATA[x]]]></a>");
        assert_eq!(texts(doc.unwrap().root()), vec!["x]"]);
    }

    #[test]
    fn test_mismatched_close() {
        let (doc, issues) = parse("<a><b></a>");
        let doc = doc.unwrap();
        assert_eq!(issues, vec![ErrorCode::NoCloseTag]);
        let a = doc.root();
        assert_eq!(a.tag_name(), Some("a"));
        assert_eq!(a.child_at(0).unwrap().tag_name(), Some("b"));
    }

    #[test]
    fn test_foreign_close_ends_only_current() {
        let (doc, issues) = parse("<a><b><c></a><d/></b></a>");
        assert_eq!(issues, vec![ErrorCode::NoCloseTag]);
        let doc = doc.unwrap();
        let a = doc.root();
        assert_eq!(a.num_children(), 1);
        let b = a.child_at(0).unwrap();
        let kids: Vec<_> = b.children().map(|c| c.tag_name()).collect();
        assert_eq!(kids, vec![Some("c"), Some("d")]);
    }

    #[test]
    fn test_foreign_close_reports_current_tag() {
        let mut issues = IssueCollector::new();
        XmlParser::new()
            .parse_with(StrSource::new("<a><b><c></a><d/></b>"), &mut issues)
            .unwrap();
        assert_eq!(issues.codes(), vec![ErrorCode::NoCloseTag]);
        assert_eq!(issues.issues[0].tag.as_deref(), Some("c"));
    }

    #[test]
    fn test_unknown_close_closes_current() {
        let (doc, issues) = parse("<a><b></x>t</a>");
        assert_eq!(issues, vec![ErrorCode::NoCloseTag]);
        let doc = doc.unwrap();
        let a = doc.root();
        assert_eq!(a.num_children(), 2);
        assert_eq!(a.child_at(1).unwrap().text(), Some("t"));
    }

    #[test]
    fn test_multiple_roots() {
        let mut issues = IssueCollector::new();
        let doc = XmlParser::new()
            .parse_with(StrSource::new("<a/><b/>"), &mut issues)
            .unwrap()
            .unwrap();
        assert_eq!(doc.root().tag_name(), Some("a"));
        assert_eq!(issues.codes(), vec![ErrorCode::MultipleRoots]);
        assert!(issues.issues[0].description.contains("Excessive roots: b"));
    }

    #[test]
    fn test_no_roots() {
        let (doc, issues) = parse("just text");
        assert!(doc.is_none());
        assert_eq!(issues, vec![ErrorCode::NoRoots]);

        let (doc, issues) = parse("");
        assert!(doc.is_none());
        assert_eq!(issues, vec![ErrorCode::NoRoots]);
    }

    #[test]
    fn test_declaration_and_comments_dropped() {
        let (doc, issues) = parse(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE note>\n<note><!-- hidden --><to>x</to></note>",
        );
        let doc = doc.unwrap();
        assert!(issues.is_empty());
        let note = doc.root();
        assert_eq!(note.tag_name(), Some("note"));
        assert_eq!(note.num_children(), 1);
    }

    #[test]
    fn test_attributes() {
        let (doc, issues) = parse(r#"<a HREF="/x?a=1&b=2" title='a &lt; b' n=5 flag>t</a>"#);
        let doc = doc.unwrap();
        let a = doc.root();
        assert_eq!(a.attribute("href"), Some("/x?a=1&b=2"));
        assert_eq!(a.attribute("title"), Some("a < b"));
        assert_eq!(a.attribute("n"), Some("5"));
        assert_eq!(a.attribute("flag"), None);
        assert_eq!(issues, vec![ErrorCode::UnexpectedTagClosing]);
        assert_eq!(texts(a), vec!["t"]);
    }

    #[test]
    fn test_attribute_without_value() {
        let (doc, issues) = parse("<a x y=\"1\"/>");
        let doc = doc.unwrap();
        assert_eq!(issues, vec![ErrorCode::UnexpectedCharacter]);
        assert_eq!(doc.root().attribute("y"), Some("1"));
        assert_eq!(doc.root().attribute("x"), None);
    }

    #[test]
    fn test_self_closed_after_attributes() {
        let (doc, issues) = parse(r#"<a><img src="p.png"/><b/>text</a>"#);
        let doc = doc.unwrap();
        assert!(issues.is_empty());
        let names: Vec<_> = doc.root().children().map(|c| c.tag_name()).collect();
        assert_eq!(names, vec![Some("img"), Some("b"), None]);
    }

    #[test]
    fn test_slash_without_gt() {
        let (doc, issues) = parse("<a/ ></a>");
        assert_eq!(issues, vec![ErrorCode::UnexpectedCharacter]);
        assert_eq!(doc.unwrap().root().tag_name(), Some("a"));
    }

    #[test]
    fn test_names_lower_cased() {
        let (doc, issues) = parse("<Root><CHILD Attr='v'></child></ROOT>");
        let doc = doc.unwrap();
        assert!(issues.is_empty());
        let root = doc.root();
        assert_eq!(root.tag_name(), Some("root"));
        let child = root.child_at(0).unwrap();
        assert_eq!(child.tag_name(), Some("child"));
        assert_eq!(child.attribute("attr"), Some("v"));
    }

    #[test]
    fn test_case_sensitive() {
        let mut parser = XmlParser::new();
        parser.set_case_sensitive(true);
        let doc = parser.parse_str("<Root Attr='v'/>").unwrap().unwrap();
        assert_eq!(doc.root().tag_name(), Some("Root"));
        assert_eq!(doc.root().attribute("Attr"), Some("v"));
    }

    #[test]
    fn test_custom_policy_replaces_configured_lists() {
        let config = ParserConfig {
            empty_tags: vec!["br".to_string()],
            ..ParserConfig::default()
        };
        let configured = XmlParser::with_config(config.clone());
        let doc = configured.parse_str("<p><br>x</p>").unwrap().unwrap();
        assert_eq!(doc.root().num_children(), 2);

        let replaced = XmlParser::with_config(config).with_tag_policy(crate::config::DefaultTagPolicy);
        let doc = replaced.parse_str("<p><br>x</p>").unwrap().unwrap();
        let br = doc.root().child_at(0).unwrap();
        assert_eq!(br.tag_name(), Some("br"));
        assert_eq!(br.child_at(0).unwrap().text(), Some("x"));
    }

    #[test]
    fn test_leading_space() {
        let (doc, _) = parse("<a>  x <b/>y</a>");
        let doc = doc.unwrap();
        let a = doc.root();
        assert_eq!(a.child_at(0).unwrap().text(), Some(" x "));
        assert_eq!(a.child_at(2).unwrap().text(), Some("y"));
    }

    #[test]
    fn test_whitespace_between_tags() {
        let input = "<a>\n  <b/>\n  <c/>\n</a>";
        let doc = XmlParser::new().parse_str(input).unwrap().unwrap();
        assert_eq!(doc.root().num_children(), 2);

        let mut parser = XmlParser::new();
        parser.set_include_whitespaces_between_tags(true);
        let doc = parser.parse_str(input).unwrap().unwrap();
        let kids: Vec<_> = doc.root().children().map(|c| c.text().map(str::to_string)).collect();
        assert_eq!(kids, vec![None, Some(" ".to_string()), None, Some(" ".to_string())]);
    }

    #[test]
    fn test_unknown_entity_kept() {
        let (doc, issues) = parse("<a>&nbsp;x</a>");
        assert_eq!(issues, vec![ErrorCode::UnrecognizedCharEntity]);
        assert_eq!(texts(doc.unwrap().root()), vec!["&nbsp;x"]);

        let mut parser = XmlParser::new();
        parser.add_char_entity("nbsp", 160);
        let doc = parser.parse_str("<a>&nbsp;x</a>").unwrap().unwrap();
        assert_eq!(texts(doc.root()), vec!["\u{a0}x"]);
    }

    #[test]
    fn test_bare_ampersand_in_text() {
        let (doc, issues) = parse("<a>fish & chips &amp; a&b</a>");
        assert!(issues.is_empty());
        assert_eq!(texts(doc.unwrap().root()), vec!["fish & chips & a&b"]);
    }

    #[test]
    fn test_stray_close_at_document_level() {
        let (doc, issues) = parse("<a/></b>");
        assert_eq!(issues, vec![ErrorCode::UnexpectedTagClosing]);
        assert_eq!(doc.unwrap().root().tag_name(), Some("a"));
    }

    #[test]
    fn test_empty_tags() {
        let parser = XmlParser::with_config(ParserConfig::new().with_empty_tags(["br"]));
        let mut issues = IssueCollector::new();
        let doc = parser
            .parse_with(StrSource::new("<p>a<br>b<br></br>c</p>"), &mut issues)
            .unwrap()
            .unwrap();
        assert!(issues.issues.is_empty());
        let kids: Vec<_> = doc
            .root()
            .children()
            .map(|c| c.tag_name().or(c.text()).unwrap_or_default().to_string())
            .collect();
        assert_eq!(kids, vec!["a", "br", "b", "br", "c"]);
    }

    #[test]
    fn test_unsupported_tag_skipped() {
        let parser = XmlParser::with_config(ParserConfig::new().with_unsupported_tags(["script"]));
        let mut issues = IssueCollector::new();
        let doc = parser
            .parse_with(
                StrSource::new("<p><script type='x'>if (a<b) { x = '</p>' }</SCRIPT>after</p>"),
                &mut issues,
            )
            .unwrap()
            .unwrap();
        assert_eq!(issues.codes(), vec![ErrorCode::TagNotSupported]);
        let p = doc.root();
        let script = p.child_at(0).unwrap();
        assert_eq!(script.tag_name(), Some("script"));
        assert!(script.attributes().is_empty());
        assert!(script.is_empty());
        assert_eq!(p.child_at(1).unwrap().text(), Some("after"));
    }

    #[test]
    fn test_unsupported_but_evaluated() {
        let config = ParserConfig::new()
            .with_unsupported_tags(["font"])
            .with_evaluated_tags(["font"]);
        let parser = XmlParser::with_config(config);
        let mut issues = IssueCollector::new();
        let doc = parser
            .parse_with(StrSource::new("<p><font size='2'>x</font></p>"), &mut issues)
            .unwrap()
            .unwrap();
        assert_eq!(issues.codes(), vec![ErrorCode::TagNotSupported]);
        let font = doc.root().child_at(0).unwrap();
        assert_eq!(font.attribute("size"), Some("2"));
        assert_eq!(texts(font), vec!["x"]);
    }

    #[test]
    fn test_skip_is_not_nesting_aware() {
        let parser = XmlParser::with_config(ParserConfig::new().with_unsupported_tags(["u"]));
        let doc = parser.parse_str("<p><u><u></u>tail</u></p>").unwrap().unwrap();
        let p = doc.root();
        // the skip stops at the inner close, so "tail" lands in <p>
        assert_eq!(p.child_at(1).unwrap().text(), Some("tail"));
    }

    #[test]
    fn test_abort() {
        let mut seen = 0;
        let mut stop = |_: &ParseIssue| {
            seen += 1;
            false
        };
        let err = XmlParser::new()
            .parse_with(StrSource::new("<a><b></a><c>"), &mut stop)
            .unwrap_err();
        assert!(err.is_aborted());
        match err.kind() {
            ErrorKind::Aborted { code, .. } => assert_eq!(*code, ErrorCode::NoCloseTag),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.position().unwrap().line, 1);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_unterminated_input() {
        let (doc, issues) = parse("<a><b>text");
        let doc = doc.unwrap();
        assert!(issues.is_empty());
        assert_eq!(texts(doc.root()), vec!["text"]);

        let (doc, _) = parse("<a><b attr=\"unterminated");
        assert_eq!(doc.unwrap().root().tag_name(), Some("a"));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 50_000;
        let input = format!("{}{}", "<d>".repeat(depth), "</d>".repeat(depth));
        let doc = XmlParser::new().parse_str(&input).unwrap().unwrap();
        let mut node = doc.root();
        let mut levels = 1;
        while let Some(child) = node.child_at(0) {
            node = child;
            levels += 1;
        }
        assert_eq!(levels, depth);
    }

    #[test]
    fn test_invalid_utf8_reported() {
        let mut issues = IssueCollector::new();
        let bytes: &[u8] = b"<a>x\xffy</a>";
        let doc = XmlParser::new()
            .parse_with(ReadSource::new(bytes), &mut issues)
            .unwrap()
            .unwrap();
        assert_eq!(issues.codes(), vec![ErrorCode::Encoding]);
        assert_eq!(texts(doc.root()), vec!["x\u{fffd}y"]);
    }

    #[test]
    fn test_parser_is_reusable() {
        let parser = XmlParser::new();
        for input in ["<a/>", "<b>x</b>", "<c><d/></c>"] {
            assert!(parser.parse_str(input).unwrap().is_some());
        }
    }
}
