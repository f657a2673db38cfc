//! Lazy, forward-only replay of a journal file.
//!
//! [`JournalReader`] composes a [`Slicer`] over the file with a
//! [`RecordDecoder`]. Opening the reader consumes and checks the schema
//! header line; iteration then skips `start_offset` data records without
//! decoding them and decodes the rest one at a time.
//!
//! A reader is read-once. To resume from a saved cursor, open a fresh
//! reader with that cursor as `start_offset`.
//!
//! An empty slice ([`Decoded::Blank`]) ends nothing: the reader skips it and
//! keeps reading, and it does not count towards `records_consumed`. A blank
//! line in the middle of a file therefore never hides the records after it.

use super::codec::{CommandBodyDecoder, HeaderDecoder};
use super::config::JournalConfig;
use super::error::JournalError;
use super::header::SchemaHeader;
use super::record::{Decoded, RecordDecoder};
use super::slicer::Slicer;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// One decoded journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord<H, C> {
    /// The record metadata.
    pub header: H,
    /// The command.
    pub command: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Reading,
    Finished,
    Failed,
}

/// Replays the records of one journal.
///
/// Yields `Result<JournalRecord, JournalError>`; after the first error the
/// reader yields nothing more.
pub struct JournalReader<HD, BD, R = File>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
{
    path: Option<PathBuf>,
    slicer: Slicer<R>,
    decoder: RecordDecoder<HD, BD>,
    schema: Option<SchemaHeader>,
    start_offset: u64,
    records_consumed: u64,
    records_yielded: u64,
    skipped_unknown: u64,
    state: ReaderState,
}

impl<HD, BD> JournalReader<HD, BD, File>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
{
    /// Opens the journal at `path` and reads its schema header.
    ///
    /// Records before `start_offset` (a count of data records) are skipped
    /// without being decoded. An empty file yields no records.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Io`] if the file cannot be opened or read.
    /// - [`JournalError::InvalidSchemaHeader`] / [`JournalError::SchemaMismatch`]
    ///   if the header line is unacceptable.
    /// - Any slicing error raised while reading the header line.
    pub fn open(
        path: impl AsRef<Path>,
        start_offset: u64,
        config: &JournalConfig,
        decoder: RecordDecoder<HD, BD>,
    ) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| JournalError::io_at(path, e))?;
        Self::build(file, Some(path.to_path_buf()), start_offset, config, decoder)
    }
}

impl<HD, BD, R> JournalReader<HD, BD, R>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
    R: Read,
{
    /// Reads a journal from any byte source.
    ///
    /// # Errors
    ///
    /// Same as [`JournalReader::open`], without the open step.
    pub fn from_source(
        source: R,
        start_offset: u64,
        config: &JournalConfig,
        decoder: RecordDecoder<HD, BD>,
    ) -> Result<Self, JournalError> {
        Self::build(source, None, start_offset, config, decoder)
    }

    /// Like [`from_source`](Self::from_source), with the path reported in errors.
    pub(crate) fn with_path(
        source: R,
        path: Option<PathBuf>,
        start_offset: u64,
        config: &JournalConfig,
        decoder: RecordDecoder<HD, BD>,
    ) -> Result<Self, JournalError> {
        Self::build(source, path, start_offset, config, decoder)
    }

    /// The byte source being read.
    pub(crate) fn source(&self) -> &R {
        self.slicer.get_ref()
    }

    fn build(
        source: R,
        path: Option<PathBuf>,
        start_offset: u64,
        config: &JournalConfig,
        decoder: RecordDecoder<HD, BD>,
    ) -> Result<Self, JournalError> {
        config.line_break.validate()?;
        let slicer = Slicer::new(
            source,
            config.line_break,
            config.chunk_maximum_length,
            config.slice_maximum_length,
        )?
        .may_lack_trailing_break(config.may_lack_trailing_break);

        let mut reader = Self {
            path,
            slicer,
            decoder,
            schema: None,
            start_offset,
            records_consumed: 0,
            records_yielded: 0,
            skipped_unknown: 0,
            state: ReaderState::Reading,
        };
        reader.read_schema_header(config.schema_version)?;
        Ok(reader)
    }

    fn read_schema_header(&mut self, expected_version: u32) -> Result<(), JournalError> {
        let slice = match self.slicer.next_slice() {
            Ok(Some(slice)) => slice,
            Ok(None) => {
                match &self.path {
                    Some(path) => {
                        warn!(path = %path.display(), "journal is empty, no schema header")
                    }
                    None => debug!("journal stream is empty"),
                }
                self.state = ReaderState::Finished;
                return Ok(());
            }
            Err(e) => return Err(attach_path(e, &self.path)),
        };
        let schema = self.decoder.decode_schema_header(slice, expected_version)?;
        debug!(
            path = %display_path(&self.path),
            schema_version = schema.schema_version,
            application_version = %schema.application_version,
            start_offset = self.start_offset,
            "journal opened for replay"
        );
        self.schema = Some(schema);
        Ok(())
    }

    /// The schema header, or `None` for an empty file.
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaHeader> {
        self.schema.as_ref()
    }

    /// The file being read, when opened from a path.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of data records consumed from the file so far, including
    /// skipped ones. Pass it as `start_offset` to resume after them.
    #[must_use]
    pub fn records_consumed(&self) -> u64 {
        self.records_consumed
    }

    /// Number of records yielded so far.
    #[must_use]
    pub fn records_yielded(&self) -> u64 {
        self.records_yielded
    }

    /// Number of records skipped because their command name was unknown.
    #[must_use]
    pub fn skipped_unknown(&self) -> u64 {
        self.skipped_unknown
    }

    /// `true` once the end of the file was reached without error.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == ReaderState::Finished
    }

    fn fail(
        &mut self,
        error: JournalError,
    ) -> Option<Result<JournalRecord<HD::Header, BD::Command>, JournalError>> {
        self.state = ReaderState::Failed;
        Some(Err(attach_path(error, &self.path)))
    }
}

impl<HD, BD, R> Iterator for JournalReader<HD, BD, R>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
    R: Read,
{
    type Item = Result<JournalRecord<HD::Header, BD::Command>, JournalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != ReaderState::Reading {
            return None;
        }

        loop {
            let record = self.records_consumed;
            let decoded = match self.slicer.next_slice() {
                Ok(Some(slice)) if slice.is_empty() => continue,
                Ok(Some(_)) if record < self.start_offset => {
                    self.records_consumed = record.saturating_add(1);
                    continue;
                }
                Ok(Some(slice)) => self.decoder.decode_slice(record, slice),
                Ok(None) => {
                    self.state = ReaderState::Finished;
                    debug!(
                        path = %display_path(&self.path),
                        records = self.records_consumed,
                        yielded = self.records_yielded,
                        skipped_unknown = self.skipped_unknown,
                        "journal replay reached end of file"
                    );
                    return None;
                }
                Err(e) => return self.fail(e),
            };
            self.records_consumed = record.saturating_add(1);

            match decoded {
                Ok(Decoded::Record { header, command }) => {
                    self.records_yielded = self.records_yielded.saturating_add(1);
                    #[cfg(feature = "metrics")]
                    metrics::counter!("journal_records_replayed").increment(1);
                    trace!(record, "journal record decoded");
                    return Some(Ok(JournalRecord { header, command }));
                }
                Ok(Decoded::Unknown { command_name, .. }) => {
                    self.skipped_unknown = self.skipped_unknown.saturating_add(1);
                    #[cfg(feature = "metrics")]
                    metrics::counter!("journal_unknown_commands_skipped").increment(1);
                    warn!(
                        record,
                        command = %command_name,
                        "skipping record with unknown command name"
                    );
                }
                Ok(Decoded::Blank) => {}
                Err(e) => return self.fail(e),
            }
        }
    }
}

impl<HD, BD, R> std::fmt::Debug for JournalReader<HD, BD, R>
where
    HD: HeaderDecoder,
    BD: CommandBodyDecoder<Header = HD::Header>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalReader")
            .field("path", &self.path)
            .field("schema", &self.schema)
            .field("start_offset", &self.start_offset)
            .field("records_consumed", &self.records_consumed)
            .field("skipped_unknown", &self.skipped_unknown)
            .field("state", &self.state)
            .finish()
    }
}

/// Adds the file path to I/O errors raised below the reader.
fn attach_path(error: JournalError, path: &Option<PathBuf>) -> JournalError {
    match (error, path) {
        (JournalError::Io { path: None, source }, Some(p)) => {
            JournalError::io_at(p.clone(), source)
        }
        (other, _) => other,
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map_or_else(|| "<stream>".to_string(), |p| p.display().to_string())
}
