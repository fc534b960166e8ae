//! XML escape and unescape utilities.
//!
//! Escaping covers the five characters with built-in entities. Unescaping is
//! lenient: references that do not resolve are kept as literal text.

use crate::entities::EntityTable;
use memchr::{memchr2, memchr3};
use std::borrow::Cow;

/// Escapes XML special characters in a string.
///
/// Returns a `Cow<str>` to avoid allocation when no escaping is needed.
#[inline]
pub fn escape(s: &str) -> Cow<'_, str> {
    if !needs_escape(s.as_bytes()) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + s.len() / 8);
    escape_to(s, &mut result);
    Cow::Owned(result)
}

/// Checks if a byte slice needs escaping.
#[inline]
fn needs_escape(bytes: &[u8]) -> bool {
    memchr3(b'<', b'>', b'&', bytes).is_some() || memchr2(b'"', b'\'', bytes).is_some()
}

#[inline]
fn entity_for(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&apos;"),
        _ => None,
    }
}

/// Escapes XML special characters and appends to the given string.
#[inline]
pub fn escape_to(s: &str, out: &mut String) {
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if let Some(escaped) = entity_for(c) {
            out.push_str(&s[start..i]);
            out.push_str(escaped);
            start = i + 1;
        }
    }

    out.push_str(&s[start..]);
}

/// Escapes XML special characters and writes every non-ASCII character as
/// a decimal character reference.
///
/// The output is pure ASCII, for transports that cannot carry UTF-8.
pub fn escape_ascii_to(s: &str, out: &mut String) {
    let mut buf = itoa::Buffer::new();
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if let Some(escaped) = entity_for(c) {
            out.push_str(&s[start..i]);
            out.push_str(escaped);
            start = i + 1;
        } else if !c.is_ascii() {
            out.push_str(&s[start..i]);
            out.push_str("&#");
            out.push_str(buf.format(c as u32));
            out.push(';');
            start = i + c.len_utf8();
        }
    }

    out.push_str(&s[start..]);
}

/// Unescapes the built-in XML entities and numeric references in a string.
///
/// Unresolvable references and stray `&` characters are left untouched.
#[inline]
pub fn unescape(s: &str) -> Cow<'_, str> {
    EntityTable::new().decode_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_no_special_chars() {
        let s = "Hello, World!";
        let escaped = escape(s);
        assert!(matches!(escaped, Cow::Borrowed(_)));
        assert_eq!(escaped, s);
    }

    #[test]
    fn test_escape_each_char() {
        assert_eq!(escape("<"), "&lt;");
        assert_eq!(escape(">"), "&gt;");
        assert_eq!(escape("&"), "&amp;");
        assert_eq!(escape("\""), "&quot;");
        assert_eq!(escape("'"), "&apos;");
    }

    #[test]
    fn test_escape_mixed() {
        assert_eq!(
            escape("<div class=\"foo\">Hello & goodbye</div>"),
            "&lt;div class=&quot;foo&quot;&gt;Hello &amp; goodbye&lt;/div&gt;"
        );
    }

    #[test]
    fn test_escape_keeps_multibyte() {
        assert_eq!(escape("café & crème"), "café &amp; crème");
    }

    #[test]
    fn test_escape_ascii() {
        let mut out = String::new();
        escape_ascii_to("€5 < 6€", &mut out);
        assert_eq!(out, "&#8364;5 &lt; 6&#8364;");
    }

    #[test]
    fn test_unescape() {
        assert!(matches!(unescape("plain"), Cow::Borrowed(_)));
        assert_eq!(unescape("&lt;b&gt; &#x41;"), "<b> A");
        assert_eq!(unescape("p?a=1&b=2"), "p?a=1&b=2");
        assert_eq!(unescape("&nbsp;"), "&nbsp;");
    }

    #[test]
    fn test_roundtrip() {
        let original = "<div class=\"foo\">Hello & 'goodbye'</div>";
        let escaped = escape(original);
        assert_eq!(unescape(&escaped), original);
    }
}
