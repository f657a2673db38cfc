//! Positional field reader and writer.
//!
//! A record is a sequence of tokens, each followed by exactly one space.
//! Tokens are escaped so they never contain a space, a backslash that is not
//! an escape, a control byte, or any byte of the file's [`LineBreak`]:
//!
//! | byte(s)                 | written as |
//! |-------------------------|------------|
//! | space                   | `\s`       |
//! | backslash               | `\\`       |
//! | control / delimiter     | `\xHH`     |
//! | absent value (`None`)   | `\0`       |
//!
//! The empty string is an empty token, so `None` and `Some("")` stay
//! distinct.

use super::error::DecodeError;
use super::line_break::LineBreak;
use std::fmt::{Display, Write as _};
use std::str::FromStr;

/// Token written for an absent optional value.
pub const NULL_TOKEN: &[u8] = b"\\0";

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Appends escaped tokens to a byte buffer.
#[derive(Debug)]
pub struct FieldWriter<'a> {
    buf: &'a mut Vec<u8>,
    line_break: LineBreak,
    scratch: String,
}

impl<'a> FieldWriter<'a> {
    /// Creates a writer appending to `buf`, escaping the bytes of `line_break`.
    pub fn new(buf: &'a mut Vec<u8>, line_break: LineBreak) -> Self {
        Self {
            buf,
            line_break,
            scratch: String::new(),
        }
    }

    /// Writes `token` verbatim.
    ///
    /// The caller guarantees the token needs no escaping (keywords, numbers,
    /// stamps). Debug builds check it.
    pub fn write_raw(&mut self, token: &[u8]) {
        debug_assert!(
            token.iter().all(|&b| !self.needs_escape(b)),
            "raw token needs escaping"
        );
        self.buf.extend_from_slice(token);
        self.buf.push(b' ');
    }

    /// Writes a string field.
    pub fn write_str(&mut self, value: &str) {
        for &b in value.as_bytes() {
            match b {
                b'\\' => self.buf.extend_from_slice(b"\\\\"),
                b' ' => self.buf.extend_from_slice(b"\\s"),
                _ if self.needs_escape(b) => {
                    self.buf.extend_from_slice(&[
                        b'\\',
                        b'x',
                        HEX[(b >> 4) as usize],
                        HEX[(b & 0x0F) as usize],
                    ]);
                }
                _ => self.buf.push(b),
            }
        }
        self.buf.push(b' ');
    }

    /// Writes an optional string field, `None` as the null token.
    pub fn write_opt_str(&mut self, value: Option<&str>) {
        match value {
            Some(v) => self.write_str(v),
            None => self.write_null(),
        }
    }

    /// Writes the null token.
    pub fn write_null(&mut self) {
        self.buf.extend_from_slice(NULL_TOKEN);
        self.buf.push(b' ');
    }

    /// Writes any [`Display`] value as an escaped string field.
    pub fn write_display<T: Display + ?Sized>(&mut self, value: &T) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        // Writing to a String cannot fail.
        let _ = write!(scratch, "{value}");
        self.write_str(&scratch);
        self.scratch = scratch;
    }

    /// Writes an optional [`Display`] value, `None` as the null token.
    pub fn write_opt_display<T: Display>(&mut self, value: Option<&T>) {
        match value {
            Some(v) => self.write_display(v),
            None => self.write_null(),
        }
    }

    /// Writes an unsigned integer field.
    pub fn write_u64(&mut self, value: u64) {
        self.write_display(&value);
    }

    /// Writes a signed integer field.
    pub fn write_i64(&mut self, value: i64) {
        self.write_display(&value);
    }

    /// Writes a boolean field as `true` / `false`.
    pub fn write_bool(&mut self, value: bool) {
        self.write_raw(if value { b"true" } else { b"false" });
    }

    #[inline]
    fn needs_escape(&self, b: u8) -> bool {
        b == b' ' || b == b'\\' || b < 0x20 || b == 0x7F || self.line_break.contains(b)
    }
}

/// Reads tokens from one record, front to back.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader over the bytes of one record (delimiter excluded).
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns `true` once every token has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Number of tokens not yet consumed.
    #[must_use]
    pub fn remaining_fields(&self) -> usize {
        self.data[self.pos.min(self.data.len())..]
            .iter()
            .filter(|&&b| b == b' ')
            .count()
    }

    /// Fails with [`DecodeError::TrailingFields`] unless every token was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::TrailingFields`] when tokens remain.
    pub fn expect_end(&self) -> Result<(), DecodeError> {
        if self.is_exhausted() {
            Ok(())
        } else {
            Err(DecodeError::TrailingFields {
                count: self.remaining_fields().max(1),
            })
        }
    }

    /// Reads the next token without unescaping it.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MissingField`] at the end of the record,
    /// [`DecodeError::UnterminatedField`] if the token lacks its space.
    pub fn read_raw(&mut self, field: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.is_exhausted() {
            return Err(DecodeError::MissingField { field });
        }
        let start = self.pos;
        let rest = &self.data[start..];
        let len = rest
            .iter()
            .position(|&b| b == b' ')
            .ok_or(DecodeError::UnterminatedField { position: start })?;
        self.pos = start + len + 1;
        Ok(&rest[..len])
    }

    /// Skips one token.
    ///
    /// # Errors
    ///
    /// Same as [`read_raw`](Self::read_raw).
    pub fn skip(&mut self, field: &'static str) -> Result<(), DecodeError> {
        self.read_raw(field).map(|_| ())
    }

    /// Reads a mandatory string field.
    ///
    /// # Errors
    ///
    /// Fails on a missing token, the null token, a bad escape or invalid UTF-8.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        self.read_opt_string(field)?
            .ok_or(DecodeError::UnexpectedNull { field })
    }

    /// Reads an optional string field.
    ///
    /// # Errors
    ///
    /// Fails on a missing token, a bad escape or invalid UTF-8.
    pub fn read_opt_string(&mut self, field: &'static str) -> Result<Option<String>, DecodeError> {
        let token = self.read_raw(field)?;
        if token == NULL_TOKEN {
            return Ok(None);
        }
        let bytes = unescape(token)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    /// Reads a mandatory field and parses it with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Fails like [`read_string`](Self::read_string), or with
    /// [`DecodeError::InvalidField`] when parsing fails.
    pub fn read_parsed<T>(&mut self, field: &'static str) -> Result<T, DecodeError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.read_opt_parsed(field)?
            .ok_or(DecodeError::UnexpectedNull { field })
    }

    /// Reads an optional field and parses it with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Fails like [`read_opt_string`](Self::read_opt_string), or with
    /// [`DecodeError::InvalidField`] when parsing fails.
    pub fn read_opt_parsed<T>(&mut self, field: &'static str) -> Result<Option<T>, DecodeError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(text) = self.read_opt_string(field)? else {
            return Ok(None);
        };
        text.parse::<T>()
            .map(Some)
            .map_err(|e| DecodeError::InvalidField {
                field,
                value: text.clone(),
                reason: e.to_string(),
            })
    }

    /// Reads an unsigned integer field.
    ///
    /// # Errors
    ///
    /// See [`read_parsed`](Self::read_parsed).
    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.read_parsed(field)
    }

    /// Reads a signed integer field.
    ///
    /// # Errors
    ///
    /// See [`read_parsed`](Self::read_parsed).
    pub fn read_i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.read_parsed(field)
    }

    /// Reads a boolean field.
    ///
    /// # Errors
    ///
    /// See [`read_parsed`](Self::read_parsed).
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        self.read_parsed(field)
    }
}

/// Reverses the escaping done by [`FieldWriter::write_str`].
fn unescape(token: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(token.len());
    let mut i = 0;
    while i < token.len() {
        let b = token[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        match token.get(i + 1) {
            Some(b'\\') => {
                out.push(b'\\');
                i += 2;
            }
            Some(b's') => {
                out.push(b' ');
                i += 2;
            }
            Some(b'x') => {
                let hi = token.get(i + 2).and_then(|&c| hex_value(c));
                let lo = token.get(i + 3).and_then(|&c| hex_value(c));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
                    _ => return Err(DecodeError::InvalidEscape { position: i }),
                }
                i += 4;
            }
            _ => return Err(DecodeError::InvalidEscape { position: i }),
        }
    }
    Ok(out)
}

#[inline]
fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
