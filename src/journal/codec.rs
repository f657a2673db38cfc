//! Pluggable record codecs.
//!
//! The journal never interprets command payloads itself. A record is
//! `<header> <command-name> <body fields>`, and each part is handled by one
//! of the traits below:
//!
//! - [`HeaderEncoder`] / [`HeaderDecoder`] for the per-record metadata
//!   (see [`HeaderCodec`](super::header::HeaderCodec) for the bundled one)
//! - [`CommandBodyEncoder`] / [`CommandBodyDecoder`] for the command name and
//!   its positional fields, supplied by the application
//!
//! Decoders return [`DecodeError`] for malformed input. A body decoder that
//! does not recognize a command name returns `Ok(None)`; the journal counts
//! and skips such records so that older readers can replay journals written
//! by newer code.

use super::error::DecodeError;
use super::fields::{FieldReader, FieldWriter};

/// Decodes the metadata at the front of every data record.
pub trait HeaderDecoder {
    /// The decoded header type.
    type Header;

    /// Reads the header fields, leaving the reader positioned on the command name.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when a header field is missing or malformed.
    fn decode(&self, reader: &mut FieldReader<'_>) -> Result<Self::Header, DecodeError>;
}

/// Encodes the metadata at the front of every data record.
pub trait HeaderEncoder {
    /// The header type being encoded.
    type Header;

    /// Writes the header fields.
    fn encode(&self, header: &Self::Header, writer: &mut FieldWriter<'_>);
}

/// Decodes a command body given its header and name.
pub trait CommandBodyDecoder {
    /// The header type produced by the matching [`HeaderDecoder`].
    type Header;
    /// The decoded command type.
    type Command;

    /// Decodes the body of the command called `command_name`.
    ///
    /// Returns `Ok(None)` when the name is not recognized. Must consume
    /// exactly the fields of the body; leftovers are reported by the caller
    /// as a field-count mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when a known command has missing or
    /// malformed fields.
    fn decode_body(
        &self,
        header: &Self::Header,
        command_name: &str,
        reader: &mut FieldReader<'_>,
    ) -> Result<Option<Self::Command>, DecodeError>;
}

/// Encodes a command name and body.
pub trait CommandBodyEncoder {
    /// The command type being encoded.
    type Command;

    /// The name the command is recorded under.
    fn command_name<'a>(&'a self, command: &'a Self::Command) -> &'a str;

    /// Writes the command's positional fields (not its name).
    fn encode_body(&self, command: &Self::Command, writer: &mut FieldWriter<'_>);
}
