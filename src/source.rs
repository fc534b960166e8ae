//! Pull-based character sources.
//!
//! The parser never looks further ahead than one character, so a source only
//! has to hand out characters one at a time. Two sources are provided: one
//! over an in-memory string and one that decodes UTF-8 from any
//! [`std::io::Read`].

use crate::error::{Error, Result};
use encoding_rs::{Decoder, DecoderResult, UTF_8};
use std::io::{self, Read};
use std::str::Chars;

/// Size of the read buffer used by [`ReadSource`].
const BUFFER_SIZE: usize = 8192;

/// A forward-only stream of characters.
pub trait CharSource {
    /// Returns the next character, or `None` at the end of the stream.
    ///
    /// An [`ErrorKind::InvalidUtf8`](crate::ErrorKind::InvalidUtf8) error is
    /// recoverable: the offending bytes have been consumed and the source can
    /// be read again. Any other error is fatal.
    fn next_char(&mut self) -> Result<Option<char>>;
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    #[inline]
    fn next_char(&mut self) -> Result<Option<char>> {
        (**self).next_char()
    }
}

/// A source over a string slice.
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    /// Creates a source reading `s` from the start.
    #[inline]
    pub fn new(s: &'a str) -> Self {
        Self { chars: s.chars() }
    }
}

impl CharSource for StrSource<'_> {
    #[inline]
    fn next_char(&mut self) -> Result<Option<char>> {
        Ok(self.chars.next())
    }
}

/// A buffered source decoding UTF-8 from a byte reader.
///
/// A leading byte order mark is dropped. Each malformed byte sequence is
/// reported once, as a recoverable error, at the point it occurs.
pub struct ReadSource<R: Read> {
    reader: R,
    decoder: Decoder,
    bytes: Box<[u8]>,
    /// Undecoded input is `bytes[start..end]`.
    start: usize,
    end: usize,
    /// Decoded characters not yet handed out start at `chars[pos..]`.
    chars: String,
    pos: usize,
    /// A malformed sequence follows the decoded characters.
    malformed: bool,
    eof: bool,
    finished: bool,
}

impl<R: Read> ReadSource<R> {
    /// Creates a source over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: UTF_8.new_decoder_with_bom_removal(),
            bytes: vec![0; BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            chars: String::with_capacity(BUFFER_SIZE),
            pos: 0,
            malformed: false,
            eof: false,
            finished: false,
        }
    }

    /// Returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the next chunk when all input so far has been decoded.
    fn fill(&mut self) -> io::Result<()> {
        if self.start < self.end || self.eof {
            return Ok(());
        }
        loop {
            match self.reader.read(&mut self.bytes) {
                Ok(n) => {
                    self.start = 0;
                    self.end = n;
                    self.eof = n == 0;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Decodes more input into `chars`. Returns false once the stream is done.
    fn decode_more(&mut self) -> io::Result<bool> {
        if self.finished {
            return Ok(false);
        }
        self.fill()?;
        self.chars.clear();
        self.pos = 0;

        let src = &self.bytes[self.start..self.end];
        let room = self
            .decoder
            .max_utf8_buffer_length_without_replacement(src.len())
            .unwrap_or(src.len() * 3 + 4);
        self.chars.reserve(room);

        let (result, read) = self
            .decoder
            .decode_to_string_without_replacement(src, &mut self.chars, self.eof);
        self.start += read;
        match result {
            DecoderResult::InputEmpty => self.finished = self.eof,
            DecoderResult::OutputFull => {}
            DecoderResult::Malformed(_, _) => self.malformed = true,
        }
        Ok(true)
    }
}

impl<R: Read> CharSource for ReadSource<R> {
    fn next_char(&mut self) -> Result<Option<char>> {
        loop {
            if let Some(c) = self.chars[self.pos..].chars().next() {
                self.pos += c.len_utf8();
                return Ok(Some(c));
            }
            if self.malformed {
                self.malformed = false;
                return Err(Error::invalid_utf8());
            }
            if !self.decode_more()? {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn drain<S: CharSource>(mut source: S) -> (String, usize) {
        let mut out = String::new();
        let mut errors = 0;
        loop {
            match source.next_char() {
                Ok(Some(c)) => out.push(c),
                Ok(None) => break,
                Err(e) => {
                    assert!(matches!(e.kind(), ErrorKind::InvalidUtf8));
                    errors += 1;
                }
            }
        }
        (out, errors)
    }

    #[test]
    fn test_str_source() {
        let (out, errors) = drain(StrSource::new("<a>héllo</a>"));
        assert_eq!(out, "<a>héllo</a>");
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_read_source_multibyte() {
        let input = "<p>€ and 😀</p>";
        let (out, errors) = drain(ReadSource::new(input.as_bytes()));
        assert_eq!(out, input);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_read_source_across_buffer_boundary() {
        let mut input = "x".repeat(BUFFER_SIZE - 1);
        input.push('€');
        input.push_str("tail");
        let (out, errors) = drain(ReadSource::new(input.as_bytes()));
        assert_eq!(out, input);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_read_source_invalid_bytes_recover() {
        let bytes: &[u8] = b"a\xFFb\xE2\x82c";
        let (out, errors) = drain(ReadSource::new(bytes));
        assert_eq!(out, "abc");
        assert_eq!(errors, 2);
    }

    #[test]
    fn test_read_source_drops_bom() {
        let bytes: &[u8] = b"\xEF\xBB\xBF<a/>";
        let (out, errors) = drain(ReadSource::new(bytes));
        assert_eq!(out, "<a/>");
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_read_source_truncated_tail() {
        let bytes: &[u8] = b"ok\xE2\x82";
        let (out, errors) = drain(ReadSource::new(bytes));
        assert_eq!(out, "ok");
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_read_source_io_error_is_fatal() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let err = ReadSource::new(Failing).next_char().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
    }
}
