//! Markup parsing: everything between a `<` and its `>`.
//!
//! Start tags are reported to the sink as they are read; the content
//! parser only learns whether content follows.

use crate::config::AttributeStatus;
use crate::dom::Element;
use crate::entities::is_entity_char;
use crate::error::{ErrorCode, ParseIssue, Result};
use crate::parser::{Run, Sink, TagEnd};
use crate::scanner::is_whitespace;
use crate::source::CharSource;

/// What a piece of markup turned out to be.
#[derive(Debug)]
pub(crate) enum Markup {
    /// A start tag whose content follows.
    Opened(String),
    /// A tag without content: self-closed, empty or skipped.
    Child,
    /// A close tag, with the raw name.
    End(String),
    /// A CDATA section.
    Text(String),
    /// A comment, declaration or processing instruction.
    Comment(Element),
    /// Markup without a tag name.
    Ignored,
    /// The stream ended inside the markup.
    Eof,
}

/// Reads the next character, or returns `$eof` from the enclosing function
/// at the end of the stream.
macro_rules! next_or {
    ($run:expr, $eof:expr) => {
        match $run.bump()? {
            Some(c) => c,
            None => return Ok($eof),
        }
    };
}

const CDATA_REST: &str = "DATA[";

impl<S: CharSource, K: Sink> Run<'_, S, K> {
    /// Parses markup; the `<` has been consumed.
    pub(crate) fn markup(&mut self) -> Result<Markup> {
        let mut c = next_or!(self, Markup::Eof);
        match c {
            '/' => return self.close_markup(),
            '!' => return self.bang(),
            '?' => {
                let content = self.inert(">", String::new())?;
                return Ok(Markup::Comment(Element::comment("XML declaration", content)));
            }
            _ => {}
        }

        while is_whitespace(c) {
            c = next_or!(self, Markup::Eof);
        }
        let mut name = String::new();
        while !is_whitespace(c) && c != '>' && c != '/' {
            name.push(c);
            c = next_or!(self, Markup::Eof);
        }
        while is_whitespace(c) {
            c = next_or!(self, Markup::Eof);
        }

        if name.is_empty() {
            self.notify(ParseIssue::new(ErrorCode::UnexpectedCharacter, "Tag without a name"))?;
            while c != '>' {
                c = next_or!(self, Markup::Eof);
            }
            return Ok(Markup::Ignored);
        }
        let tag = self.normalize(name);

        let accepted = self.sink.begin_tag(&tag);
        if !accepted || !self.parser.policy.is_supported(&tag) {
            self.notify(
                ParseIssue::new(
                    ErrorCode::TagNotSupported,
                    format!("The tag '{}' is not supported", tag),
                )
                .with_tag(tag.as_str()),
            )?;
            if !accepted || !self.parser.policy.should_evaluate(&tag) {
                return self.skip_element(&tag, c);
            }
        }

        self.tag_body(tag, c)
    }

    /// Reads the raw name of a close tag.
    fn close_markup(&mut self) -> Result<Markup> {
        let mut name = String::new();
        loop {
            match next_or!(self, Markup::Eof) {
                '>' => return Ok(Markup::End(name)),
                c => name.push(c),
            }
        }
    }

    /// Parses `<!--`, `<![CDATA[` and `<!...>` markup.
    fn bang(&mut self) -> Result<Markup> {
        let c = next_or!(self, Markup::Eof);
        if c == '>' {
            return Ok(Markup::Comment(Element::comment("XML declaration", "")));
        }
        let c2 = next_or!(self, Markup::Eof);

        if c == '-' && c2 == '-' {
            let content = self.inert("-->", String::new())?;
            return Ok(Markup::Comment(Element::comment("comment", content)));
        }

        let mut seen = String::from(c);
        if c2 == '>' {
            return Ok(Markup::Comment(Element::comment("XML declaration", seen)));
        }
        seen.push(c2);

        if c == '[' && c2 == 'C' {
            let mut matched = true;
            for expected in CDATA_REST.chars() {
                let c = next_or!(self, Markup::Eof);
                if c == '>' {
                    return Ok(Markup::Comment(Element::comment("XML declaration", seen)));
                }
                seen.push(c);
                if c != expected {
                    matched = false;
                    break;
                }
            }
            if matched {
                return Ok(Markup::Text(self.inert("]]>", String::new())?));
            }
        }

        let content = self.inert(">", seen)?;
        Ok(Markup::Comment(Element::comment("XML declaration", content)))
    }

    /// Collects raw characters up to `end`.
    ///
    /// A partial match is put back into the content; for `]]>` a run of
    /// extra `]` keeps all but the last two. The end of the stream ends the
    /// content.
    fn inert(&mut self, end: &str, mut content: String) -> Result<String> {
        let end: Vec<char> = end.chars().collect();
        let mut matched = 0;

        while let Some(c) = self.bump()? {
            if c == end[matched] {
                matched += 1;
                if matched == end.len() {
                    break;
                }
                continue;
            }
            if matched != 0 {
                if c == end[0] && matched > 1 {
                    content.push(c);
                    continue;
                }
                content.extend(&end[..matched]);
                matched = 0;
            }
            content.push(c);
        }
        Ok(content)
    }

    /// Skips an unsupported element: the rest of its start tag and, unless
    /// it was self-closed, everything up to `</tag>`.
    ///
    /// The search is a plain substring match, so a nested element with the
    /// same name ends the skip early.
    fn skip_element(&mut self, tag: &str, mut c: char) -> Result<Markup> {
        let mut last = c;
        while c != '>' {
            last = c;
            c = next_or!(self, Markup::Eof);
        }

        if last != '/' {
            let close: Vec<char> = format!("</{}>", tag.to_ascii_lowercase()).chars().collect();
            let mut index = 0;
            while index < close.len() {
                let c = next_or!(self, Markup::Eof).to_ascii_lowercase();
                if c == close[index] {
                    index += 1;
                } else if c == close[0] {
                    index = 1;
                } else {
                    index = 0;
                }
            }
        }

        self.sink.finish_tag(tag, TagEnd::Skipped)?;
        Ok(Markup::Child)
    }

    /// Parses the attributes and the end of a start tag. `c` is the first
    /// character after the name and its trailing whitespace.
    fn tag_body(&mut self, tag: String, mut c: char) -> Result<Markup> {
        loop {
            match c {
                '>' => return self.open(tag),
                '/' => {
                    c = next_or!(self, Markup::Eof);
                    if c == '>' {
                        self.sink.finish_tag(&tag, TagEnd::Closed)?;
                        return Ok(Markup::Child);
                    }
                    self.notify(
                        ParseIssue::new(ErrorCode::UnexpectedCharacter, "XML malformed - no > after /")
                            .with_tag(tag.as_str()),
                    )?;
                    continue;
                }
                _ if is_whitespace(c) => {
                    c = next_or!(self, Markup::Eof);
                    continue;
                }
                _ => {}
            }

            let mut name = String::from(c);
            c = next_or!(self, Markup::Eof);
            while !is_whitespace(c) && c != '=' && c != '>' && c != '/' {
                name.push(c);
                c = next_or!(self, Markup::Eof);
            }
            let name = self.normalize(name);

            if c == '>' {
                self.notify(
                    ParseIssue::new(
                        ErrorCode::UnexpectedTagClosing,
                        format!("Unexpected tag closing in tag {}, attribute={}", tag, name),
                    )
                    .with_tag(tag.as_str())
                    .with_attribute(name),
                )?;
                return self.open(tag);
            }

            while is_whitespace(c) {
                c = next_or!(self, Markup::Eof);
            }
            if c != '=' {
                self.notify(
                    ParseIssue::new(
                        ErrorCode::UnexpectedCharacter,
                        format!(
                            "Unexpected character {}, expected '=' after attribute {} in tag {}",
                            c, name, tag
                        ),
                    )
                    .with_tag(tag.as_str())
                    .with_attribute(name),
                )?;
                continue;
            }

            c = next_or!(self, Markup::Eof);
            while is_whitespace(c) {
                c = next_or!(self, Markup::Eof);
            }
            let Some((value, after)) = self.attribute_value(c)? else {
                return Ok(Markup::Eof);
            };
            self.store_attribute(&tag, &name, &value)?;
            c = after;
        }
    }

    /// Ends a start tag at its `>`.
    fn open(&mut self, tag: String) -> Result<Markup> {
        if self.parser.policy.is_empty_tag(&tag) {
            self.sink.finish_tag(&tag, TagEnd::Closed)?;
            return Ok(Markup::Child);
        }
        self.sink.finish_tag(&tag, TagEnd::Open)?;
        Ok(Markup::Opened(tag))
    }

    /// Reads an attribute value starting at `c`. Returns the value and the
    /// first character after it, or `None` at the end of the stream.
    fn attribute_value(&mut self, c: char) -> Result<Option<(String, char)>> {
        let mut value = String::new();
        let mut entity: Option<String> = None;

        let quote = match c {
            '"' | '\'' => Some(c),
            '>' => return Ok(Some((value, c))),
            _ => {
                self.value_char(c, &mut value, &mut entity)?;
                None
            }
        };

        let after = loop {
            let c = next_or!(self, None);
            if Some(c) == quote {
                break next_or!(self, None);
            }
            if quote.is_none() && (c == '/' || c == '>' || is_whitespace(c)) {
                break c;
            }
            self.value_char(c, &mut value, &mut entity)?;
        };

        if let Some(symbol) = entity {
            value.push('&');
            value.push_str(&symbol);
        }
        Ok(Some((value, after)))
    }

    /// Adds one character to an attribute value, decoding entities.
    fn value_char(&mut self, c: char, value: &mut String, entity: &mut Option<String>) -> Result<()> {
        if c == '&' {
            if let Some(stale) = entity.replace(String::new()) {
                value.push('&');
                value.push_str(&stale);
            }
            return Ok(());
        }
        let Some(symbol) = entity.as_mut() else {
            value.push(c);
            return Ok(());
        };
        if c == ';' {
            let symbol = std::mem::take(symbol);
            *entity = None;
            self.push_entity(&symbol, value)?;
        } else if is_entity_char(c) {
            symbol.push(c);
        } else {
            value.push('&');
            value.push_str(symbol);
            value.push(c);
            *entity = None;
        }
        Ok(())
    }

    /// Stores an attribute through the sink and reports what it refused.
    fn store_attribute(&mut self, tag: &str, name: &str, value: &str) -> Result<()> {
        let description = match self.sink.attribute(tag, name, value)? {
            AttributeStatus::Accepted => return Ok(()),
            AttributeStatus::NotSupported => (
                ErrorCode::AttributeNotSupported,
                format!("Attribute '{}' is not supported for tag '{}'.", name, tag),
            ),
            AttributeStatus::InvalidValue => (
                ErrorCode::AttributeValueInvalid,
                format!("Attribute '{}' in tag '{}' has an invalid value ({})", name, tag, value),
            ),
        };
        self.notify(
            ParseIssue::new(description.0, description.1)
                .with_tag(tag)
                .with_attribute(name)
                .with_value(value),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{ErrorCode, IssueCollector};
    use crate::source::StrSource;
    use crate::XmlParser;

    fn parse(input: &str) -> (crate::Document, Vec<ErrorCode>) {
        let mut issues = IssueCollector::new();
        let doc = XmlParser::new()
            .parse_with(StrSource::new(input), &mut issues)
            .unwrap()
            .unwrap();
        (doc, issues.codes())
    }

    #[test]
    fn test_comment_variants_are_dropped() {
        for input in [
            "<a><!-- c --></a>",
            "<a><!-- a -- b --></a>",
            "<a><!DOCTYPE x></a>",
            "<a><!></a>",
            "<a><!x></a>",
            "<a><?pi data?></a>",
            "<a><![CDX[y]></a>",
        ] {
            let (doc, issues) = parse(input);
            assert!(doc.root().is_empty(), "{}", input);
            assert!(issues.is_empty(), "{}", input);
        }
    }

    #[test]
    fn test_comment_with_dashes() {
        let (doc, _) = parse("<a><!-- x --- y ---><b/></a>");
        assert_eq!(doc.root().num_children(), 1);
    }

    #[test]
    fn test_cdata_keeps_markup() {
        let (doc, _) = parse("<a><![CDATA[a]b]]c]]></a>");
        assert_eq!(doc.root().child_at(0).unwrap().text(), Some("a]b]]c"));
    }

    #[test]
    fn test_whitespace_in_tags() {
        let (doc, issues) = parse("< a  x = \"1\"  y='2' >t</a>");
        assert!(issues.is_empty());
        let a = doc.root();
        assert_eq!(a.tag_name(), Some("a"));
        assert_eq!(a.attribute("x"), Some("1"));
        assert_eq!(a.attribute("y"), Some("2"));
    }

    #[test]
    fn test_close_tag_with_whitespace() {
        let (doc, issues) = parse("<a><b>x</b ></a>");
        assert!(issues.is_empty());
        assert_eq!(doc.root().child_at(0).unwrap().tag_name(), Some("b"));
    }

    #[test]
    fn test_nameless_tag() {
        let (doc, issues) = parse("<a><>x</a>");
        assert_eq!(issues, vec![ErrorCode::UnexpectedCharacter]);
        assert_eq!(doc.root().child_at(0).unwrap().text(), Some("x"));
    }

    #[test]
    fn test_unquoted_values() {
        let (doc, _) = parse("<a x=1 y=two/>");
        let a = doc.root();
        assert_eq!(a.attribute("x"), Some("1"));
        assert_eq!(a.attribute("y"), Some("two"));
        assert!(a.is_empty());
    }

    #[test]
    fn test_attribute_entities() {
        let (doc, issues) = parse(r#"<a v="&lt;&#65;&bogus;&amp" w="a&&lt;"/>"#);
        let a = doc.root();
        assert_eq!(a.attribute("v"), Some("<A&bogus;&amp"));
        assert_eq!(a.attribute("w"), Some("a&<"));
        assert_eq!(issues, vec![ErrorCode::UnrecognizedCharEntity]);
    }

    #[test]
    fn test_quote_terminates_immediately() {
        let (doc, _) = parse(r#"<a v="x'y" w='p"q'/>"#);
        let a = doc.root();
        assert_eq!(a.attribute("v"), Some("x'y"));
        assert_eq!(a.attribute("w"), Some("p\"q"));
    }

    #[test]
    fn test_repeated_attribute_last_wins() {
        let (doc, _) = parse("<a x='1' y='2' X='3'/>");
        let attrs = doc.root().attributes();
        assert_eq!(attrs, &[("x".to_string(), "3".to_string()), ("y".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_self_closed_unsupported_tag() {
        use crate::config::ParserConfig;
        let parser = XmlParser::with_config(ParserConfig::new().with_unsupported_tags(["embed"]));
        let doc = parser.parse_str("<a><embed src='x'/>after</a>").unwrap().unwrap();
        let a = doc.root();
        assert_eq!(a.child_at(0).unwrap().tag_name(), Some("embed"));
        assert_eq!(a.child_at(1).unwrap().text(), Some("after"));
    }
}
