//! Error types for the journal subsystem.
//!
//! [`JournalError`] covers every failure mode of reading, writing and
//! recovering a journal. [`DecodeError`] is the narrower, field-level error
//! produced by the positional field codec and by header/body decoders; the
//! reader wraps it together with the index of the offending record.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Field-level decoding failures.
///
/// Returned by [`FieldReader`](super::fields::FieldReader) and by
/// implementations of the decoder traits in [`codec`](super::codec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The record ended before the named field could be read.
    #[error("missing field `{field}`")]
    MissingField {
        /// Name of the field the decoder expected.
        field: &'static str,
    },

    /// Fields were left over after the command body was fully decoded.
    #[error("{count} unexpected trailing field(s)")]
    TrailingFields {
        /// Number of tokens that were not consumed.
        count: usize,
    },

    /// A token could not be converted to the expected type.
    #[error("invalid value {value:?} for field `{field}`: {reason}")]
    InvalidField {
        /// Name of the field being decoded.
        field: &'static str,
        /// The raw (escaped) token text.
        value: String,
        /// Why the token was rejected.
        reason: String,
    },

    /// A backslash escape sequence is malformed.
    #[error("invalid escape sequence at byte {position}")]
    InvalidEscape {
        /// Byte position within the token.
        position: usize,
    },

    /// A token is not valid UTF-8 after unescaping.
    #[error("field `{field}` is not valid UTF-8")]
    InvalidUtf8 {
        /// Name of the field being decoded.
        field: &'static str,
    },

    /// A token was missing its terminating space.
    #[error("unterminated field at byte {position}")]
    UnterminatedField {
        /// Byte position where the token started.
        position: usize,
    },

    /// The null token appeared where a value is mandatory.
    #[error("field `{field}` must not be null")]
    UnexpectedNull {
        /// Name of the field being decoded.
        field: &'static str,
    },
}

/// Errors that can occur within the journal subsystem.
///
/// Every variant aborts the current operation. Nothing in the journal
/// skips a record and carries on, with the single exception of unknown
/// command names, which are counted rather than reported as errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JournalError {
    /// An I/O error occurred while reading, writing or renaming a journal file.
    #[error("journal I/O error{}: {source}", display_path(.path))]
    Io {
        /// The file path involved, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A data record could not be decoded.
    #[error("journal decode error at record {record}: {source}")]
    Decode {
        /// Zero-based index of the data record (the schema header is not counted).
        record: u64,
        /// The field-level failure.
        #[source]
        source: DecodeError,
    },

    /// The schema header line could not be parsed.
    #[error("invalid journal schema header: {source}")]
    InvalidSchemaHeader {
        /// The field-level failure.
        #[source]
        source: DecodeError,
    },

    /// The journal was written with a schema version this reader does not accept.
    #[error("journal schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch {
        /// Schema version the reader was configured with.
        expected: u32,
        /// Schema version found in the file.
        found: u32,
    },

    /// A slice grew beyond the configured maximum without reaching a delimiter.
    #[error(
        "slice starting at byte {offset} exceeds the maximum length of {limit} bytes \
         (corrupt file or wrong line break?)"
    )]
    SliceTooLong {
        /// Byte offset in the stream where the slice started.
        offset: u64,
        /// The configured `slice_maximum_length`.
        limit: usize,
    },

    /// The input ended with bytes that were never terminated by a delimiter.
    #[error("input ends with {length} unterminated byte(s) at offset {offset}")]
    UnterminatedSlice {
        /// Byte offset in the stream where the unterminated slice started.
        offset: u64,
        /// Number of unterminated bytes.
        length: usize,
    },

    /// A journal component was used out of sequence.
    #[error("precondition violated in {operation}: {reason}")]
    Precondition {
        /// The operation that was attempted.
        operation: &'static str,
        /// What was wrong with the current state.
        reason: String,
    },

    /// The configuration is unusable.
    #[error("invalid journal configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" at {}", p.display()),
        None => String::new(),
    }
}

impl JournalError {
    /// Wraps an I/O error together with the path it concerns.
    #[cold]
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: io::Error) -> Self {
        JournalError::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Builds a [`JournalError::Precondition`].
    #[cold]
    pub(crate) fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        JournalError::Precondition {
            operation,
            reason: reason.into(),
        }
    }

    /// Builds a [`JournalError::InvalidConfig`].
    #[cold]
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        JournalError::InvalidConfig {
            message: message.into(),
        }
    }
}

impl From<io::Error> for JournalError {
    #[cold]
    fn from(source: io::Error) -> Self {
        JournalError::Io { path: None, source }
    }
}
