//! Character entity resolution.
//!
//! Symbols are looked up without their `&` and `;`. Numeric references
//! (`#65`, `#x41`) decode directly; named ones are looked up in the five
//! built-in XML entities and then in a user table.

use std::borrow::Cow;
use std::collections::HashMap;

/// The built-in XML entities.
const XML_ENTITIES: [(&str, char); 5] = [
    ("lt", '<'),
    ("gt", '>'),
    ("amp", '&'),
    ("quot", '"'),
    ("apos", '\''),
];

/// Returns true if `c` may appear between `&` and `;`.
#[inline]
pub fn is_entity_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '#'
}

/// Strips a leading `&` and a trailing `;` from a symbol.
fn trim_symbol(symbol: &str) -> &str {
    let symbol = symbol.strip_prefix('&').unwrap_or(symbol);
    symbol.strip_suffix(';').unwrap_or(symbol)
}

/// A char entity table: the built-in XML entities plus user definitions.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    user: HashMap<String, u32>,
}

impl EntityTable {
    /// Creates a table holding only the built-in entities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user entity. `symbol` may include the `&` and `;`.
    pub fn add_char_entity(&mut self, symbol: &str, code: u32) {
        self.user.insert(trim_symbol(symbol).to_string(), code);
    }

    /// Adds consecutive user entities starting at `start_code`.
    ///
    /// Empty symbols are skipped but still consume a code, so a table can
    /// leave holes in a range.
    pub fn add_char_entities_range<I, S>(&mut self, symbols: I, start_code: u32)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (code, symbol) in (start_code..).zip(symbols) {
            let symbol = symbol.as_ref();
            if !symbol.is_empty() {
                self.add_char_entity(symbol, code);
            }
        }
    }

    /// Returns the number of user entities.
    pub fn user_len(&self) -> usize {
        self.user.len()
    }

    /// Resolves a symbol to a character.
    pub fn resolve(&self, symbol: &str) -> Option<char> {
        if let Some(number) = symbol.strip_prefix('#') {
            return decode_numeric(number);
        }

        XML_ENTITIES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(symbol))
            .map(|&(_, c)| c)
            .or_else(|| self.user.get(symbol).copied().and_then(char::from_u32))
    }

    /// Decodes a symbol, or returns the literal `&symbol;` text if it does
    /// not resolve.
    pub fn decode(&self, symbol: &str) -> Result<char, String> {
        self.resolve(symbol).ok_or_else(|| format!("&{};", symbol))
    }

    /// Decodes every entity in `s`, leaving unresolvable ones as they are.
    pub fn decode_str<'a>(&self, s: &'a str) -> Cow<'a, str> {
        if !s.contains('&') {
            return Cow::Borrowed(s);
        }

        let mut out = String::with_capacity(s.len());
        let mut rest = s;
        while let Some(amp) = rest.find('&') {
            out.push_str(&rest[..amp]);
            let after = &rest[amp + 1..];
            let len = after.find(|c: char| !is_entity_char(c)).unwrap_or(after.len());
            if after[len..].starts_with(';') {
                match self.resolve(&after[..len]) {
                    Some(c) => out.push(c),
                    None => out.push_str(&rest[amp..amp + len + 2]),
                }
                rest = &after[len + 1..];
            } else {
                out.push('&');
                rest = after;
            }
        }
        out.push_str(rest);
        Cow::Owned(out)
    }
}

/// Decodes the digits of a numeric character reference (after the `#`).
fn decode_numeric(number: &str) -> Option<char> {
    let hex = number.strip_prefix('x').or_else(|| number.strip_prefix('X'));
    let (radix, digits) = match hex {
        Some(hex) => (16, hex),
        None => (10, number),
    };
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, radix).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entities() {
        let table = EntityTable::new();
        assert_eq!(table.resolve("lt"), Some('<'));
        assert_eq!(table.resolve("gt"), Some('>'));
        assert_eq!(table.resolve("amp"), Some('&'));
        assert_eq!(table.resolve("quot"), Some('"'));
        assert_eq!(table.resolve("apos"), Some('\''));
        assert_eq!(table.resolve("AMP"), Some('&'));
    }

    #[test]
    fn test_numeric_entities() {
        let table = EntityTable::new();
        assert_eq!(table.resolve("#65"), Some('A'));
        assert_eq!(table.resolve("#x41"), Some('A'));
        assert_eq!(table.resolve("#X20AC"), Some('€'));
        assert_eq!(table.resolve("#"), None);
        assert_eq!(table.resolve("#x"), None);
        assert_eq!(table.resolve("#12ab"), None);
        assert_eq!(table.resolve("#xD800"), None);
    }

    #[test]
    fn test_unknown_entity_keeps_literal() {
        let table = EntityTable::new();
        assert_eq!(table.decode("nbsp"), Err("&nbsp;".to_string()));
    }

    #[test]
    fn test_user_entities() {
        let mut table = EntityTable::new();
        table.add_char_entity("&nbsp;", 160);
        table.add_char_entity("euro", 8364);
        assert_eq!(table.resolve("nbsp"), Some('\u{a0}'));
        assert_eq!(table.resolve("euro"), Some('€'));
        // user symbols are case sensitive
        assert_eq!(table.resolve("EURO"), None);
    }

    #[test]
    fn test_builtin_wins_over_user() {
        let mut table = EntityTable::new();
        table.add_char_entity("lt", 'x' as u32);
        assert_eq!(table.resolve("lt"), Some('<'));
    }

    #[test]
    fn test_entities_range() {
        let mut table = EntityTable::new();
        table.add_char_entities_range(["iexcl", "", "pound"], 161);
        assert_eq!(table.resolve("iexcl"), Some('¡'));
        assert_eq!(table.resolve("pound"), Some('£'));
        assert_eq!(table.user_len(), 2);
    }

    #[test]
    fn test_decode_str() {
        let table = EntityTable::new();
        assert!(matches!(table.decode_str("plain"), Cow::Borrowed(_)));
        assert_eq!(table.decode_str("x &amp; y"), "x & y");
        assert_eq!(table.decode_str("a=1&b=2"), "a=1&b=2");
        assert_eq!(table.decode_str("&bogus; &#65;"), "&bogus; A");
        assert_eq!(table.decode_str("trailing &"), "trailing &");
    }
}
