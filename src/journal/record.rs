//! Conversion between slices and decoded records.
//!
//! [`RecordDecoder`] turns one slice produced by the
//! [`Slicer`](super::slicer::Slicer) into a [`Decoded`] value; the first
//! slice of a file goes through
//! [`decode_schema_header`](RecordDecoder::decode_schema_header) instead.
//! [`RecordEncoder`] is the mirror image used by the writer.

use super::codec::{CommandBodyDecoder, CommandBodyEncoder, HeaderDecoder, HeaderEncoder};
use super::error::{DecodeError, JournalError};
use super::fields::{FieldReader, FieldWriter};
use super::header::SchemaHeader;
use super::line_break::LineBreak;

/// The outcome of decoding one data slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<H, C> {
    /// A recognized command.
    Record {
        /// The decoded header.
        header: H,
        /// The decoded command.
        command: C,
    },
    /// A well-formed record whose command name the body decoder does not know.
    Unknown {
        /// The decoded header.
        header: H,
        /// The unrecognized command name.
        command_name: String,
    },
    /// An empty slice, which carries no record.
    ///
    /// [`JournalReader`](super::reader::JournalReader) skips blank slices and
    /// reads on rather than treating them as the end of useful input.
    Blank,
}

/// Decodes data slices with a header decoder and a command body decoder.
#[derive(Debug, Clone)]
pub struct RecordDecoder<HD, BD> {
    header_decoder: HD,
    body_decoder: BD,
}

impl<HD, BD> RecordDecoder<HD, BD>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
{
    /// Creates a record decoder.
    pub fn new(header_decoder: HD, body_decoder: BD) -> Self {
        Self {
            header_decoder,
            body_decoder,
        }
    }

    /// Parses the schema header slice and checks its version.
    ///
    /// # Errors
    ///
    /// - [`JournalError::InvalidSchemaHeader`] if the line is malformed.
    /// - [`JournalError::SchemaMismatch`] if the version is not `expected_version`.
    pub fn decode_schema_header(
        &self,
        slice: &[u8],
        expected_version: u32,
    ) -> Result<SchemaHeader, JournalError> {
        let schema = SchemaHeader::decode(&mut FieldReader::new(slice))
            .map_err(|source| JournalError::InvalidSchemaHeader { source })?;
        if schema.schema_version != expected_version {
            return Err(JournalError::SchemaMismatch {
                expected: expected_version,
                found: schema.schema_version,
            });
        }
        Ok(schema)
    }

    /// Decodes one data slice.
    ///
    /// `record` is the zero-based index of the slice among data records and
    /// only serves error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Decode`] if the header or body is malformed
    /// or if fields remain after the body.
    pub fn decode_slice(
        &self,
        record: u64,
        slice: &[u8],
    ) -> Result<Decoded<HD::Header, BD::Command>, JournalError> {
        if slice.is_empty() {
            return Ok(Decoded::Blank);
        }
        self.decode_fields(slice)
            .map_err(|source| JournalError::Decode { record, source })
    }

    fn decode_fields(
        &self,
        slice: &[u8],
    ) -> Result<Decoded<HD::Header, BD::Command>, DecodeError> {
        let mut reader = FieldReader::new(slice);
        let header = self.header_decoder.decode(&mut reader)?;
        let command_name = reader.read_string("command_name")?;
        match self
            .body_decoder
            .decode_body(&header, &command_name, &mut reader)?
        {
            Some(command) => {
                reader.expect_end()?;
                Ok(Decoded::Record { header, command })
            }
            None => Ok(Decoded::Unknown {
                header,
                command_name,
            }),
        }
    }
}

/// Encodes records into delimiter-terminated lines.
#[derive(Debug, Clone)]
pub struct RecordEncoder<HE, BE> {
    header_encoder: HE,
    body_encoder: BE,
    line_break: LineBreak,
}

impl<HE, BE> RecordEncoder<HE, BE>
where
    HE: HeaderEncoder,
    BE: CommandBodyEncoder,
{
    /// Creates a record encoder terminating lines with `line_break`.
    pub fn new(header_encoder: HE, body_encoder: BE, line_break: LineBreak) -> Self {
        Self {
            header_encoder,
            body_encoder,
            line_break,
        }
    }

    /// The line break appended after every line.
    #[must_use]
    pub fn line_break(&self) -> LineBreak {
        self.line_break
    }

    /// Appends the schema header line to `buf`.
    pub fn encode_schema_header(&self, schema: &SchemaHeader, buf: &mut Vec<u8>) {
        schema.encode(&mut FieldWriter::new(buf, self.line_break));
        buf.extend_from_slice(self.line_break.as_bytes());
    }

    /// Appends one data line to `buf`.
    pub fn encode_record(&self, header: &HE::Header, command: &BE::Command, buf: &mut Vec<u8>) {
        {
            let mut writer = FieldWriter::new(buf, self.line_break);
            self.header_encoder.encode(header, &mut writer);
            writer.write_str(self.body_encoder.command_name(command));
            self.body_encoder.encode_body(command, &mut writer);
        }
        buf.extend_from_slice(self.line_break.as_bytes());
    }
}
