//! Record delimiters.
//!
//! A journal file is a sequence of records separated by a [`LineBreak`] of
//! one or two bytes. The delimiter is a property of the whole file, fixed
//! when the file is created; it is not self-describing, so a reader must be
//! configured with the same line break the writer used.
//!
//! Delimiter bytes must never appear in a written token. Tokens escape
//! arbitrary bytes using backslash sequences made of ASCII letters and
//! digits, and keywords such as `SchemaVersion` are written verbatim, so
//! ASCII alphanumerics, the space and the backslash are rejected as
//! delimiter bytes.

use super::error::JournalError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A one- or two-byte record delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineBreak {
    bytes: [u8; 2],
    len: u8,
}

impl LineBreak {
    /// Carriage return (`\r`).
    pub const CR: LineBreak = LineBreak::single(b'\r');

    /// Line feed (`\n`).
    pub const LF: LineBreak = LineBreak::single(b'\n');

    /// Carriage return followed by line feed (`\r\n`).
    pub const CR_LF: LineBreak = LineBreak::double(b'\r', b'\n');

    /// A single-byte delimiter.
    #[must_use]
    pub const fn single(byte: u8) -> Self {
        Self {
            bytes: [byte, 0],
            len: 1,
        }
    }

    /// A two-byte delimiter; `first` is the byte scanned for.
    #[must_use]
    pub const fn double(first: u8, second: u8) -> Self {
        Self {
            bytes: [first, second],
            len: 2,
        }
    }

    /// Builds a line break from its raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] unless `bytes` holds one or
    /// two bytes that are usable as a delimiter (see [`validate`](Self::validate)).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, JournalError> {
        let line_break = match *bytes {
            [b] => Self::single(b),
            [a, b] => Self::double(a, b),
            _ => {
                return Err(JournalError::invalid_config(format!(
                    "a line break must have 1 or 2 bytes, got {}",
                    bytes.len()
                )));
            }
        };
        line_break.validate()?;
        Ok(line_break)
    }

    /// Checks that no delimiter byte can occur inside a written token.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] if a byte is an ASCII letter
    /// or digit, a space or a backslash.
    pub fn validate(&self) -> Result<(), JournalError> {
        match self.as_bytes().iter().find(|&&b| is_token_byte(b)) {
            Some(&b) => Err(JournalError::invalid_config(format!(
                "line break {self} contains {:?}, which may appear inside a token",
                char::from(b)
            ))),
            None => Ok(()),
        }
    }

    /// The delimiter bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// The byte the slicer scans for.
    #[inline]
    #[must_use]
    pub fn first(&self) -> u8 {
        self.bytes[0]
    }

    /// The byte that must follow [`first`](Self::first), for two-byte delimiters.
    #[inline]
    #[must_use]
    pub fn second(&self) -> Option<u8> {
        (self.len == 2).then_some(self.bytes[1])
    }

    /// Number of bytes in the delimiter (1 or 2).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always `false`; a line break has at least one byte.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns `true` if `byte` is part of this delimiter.
    #[inline]
    #[must_use]
    pub fn contains(&self, byte: u8) -> bool {
        self.as_bytes().contains(&byte)
    }
}

#[inline]
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b' ' || b == b'\\'
}

impl Default for LineBreak {
    fn default() -> Self {
        LineBreak::CR_LF
    }
}

impl fmt::Display for LineBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LineBreak::CR => f.write_str("CR"),
            LineBreak::LF => f.write_str("LF"),
            LineBreak::CR_LF => f.write_str("CRLF"),
            _ => {
                f.write_str("0x")?;
                for b in self.as_bytes() {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for LineBreak {
    type Err = JournalError;

    /// Parses `CR`, `LF`, `CRLF` (case-insensitive) or a hex form such as
    /// `0x0D` / `0x0D0A`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CR" => return Ok(LineBreak::CR),
            "LF" => return Ok(LineBreak::LF),
            "CRLF" => return Ok(LineBreak::CR_LF),
            _ => {}
        }

        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| JournalError::invalid_config(format!("unknown line break {s:?}")))?;
        if !hex.is_ascii() || hex.is_empty() || hex.len() % 2 != 0 || hex.len() > 4 {
            return Err(JournalError::invalid_config(format!(
                "line break {s:?} must be 1 or 2 hex-encoded bytes"
            )));
        }
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| JournalError::invalid_config(format!("line break {s:?}: {e}")))?;
        LineBreak::from_bytes(&bytes)
    }
}

impl TryFrom<String> for LineBreak {
    type Error = JournalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LineBreak> for String {
    fn from(value: LineBreak) -> Self {
        value.to_string()
    }
}
