//! Buffered, append-only journal writer.
//!
//! [`JournalWriter`] creates a fresh journal file, writes its schema header
//! and then appends one line per accepted command. Lines go through an
//! in-memory buffer of `buffer_capacity` bytes which is written to the file:
//!
//! - whenever the next line would not fit,
//! - according to the configured [`FlushPolicy`],
//! - on [`flush`](JournalWriter::flush),
//! - on [`close`](JournalWriter::close), which also syncs the file to disk.
//!
//! Records accepted before a successful `close` survive a crash of the
//! process or the machine. Records accepted since the last flush are lost on
//! a crash; a record cut short by a crash shows up as an unterminated last
//! line, which the reader reports.

use super::codec::{CommandBodyEncoder, HeaderEncoder};
use super::config::{FlushPolicy, JournalConfig};
use super::error::JournalError;
use super::header::SchemaHeader;
use super::record::RecordEncoder;
use crate::utils::{fsync_file, fsync_parent};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, trace, warn};

/// Appends encoded records to a journal file.
pub struct JournalWriter<HE, BE>
where
    HE: HeaderEncoder,
    BE: CommandBodyEncoder,
{
    /// `None` once closed.
    file: Option<File>,
    path: PathBuf,
    encoder: RecordEncoder<HE, BE>,
    buffer: Vec<u8>,
    /// Scratch space for the line being encoded.
    line: Vec<u8>,
    capacity: usize,
    flush_policy: FlushPolicy,
    sync_on_flush: bool,
    records_written: u64,
    /// Set after a failed write; the file may end with a partial line.
    poisoned: bool,
}

impl<HE, BE> JournalWriter<HE, BE>
where
    HE: HeaderEncoder,
    BE: CommandBodyEncoder,
{
    /// Creates the journal file at `path` and writes its schema header.
    ///
    /// The file must not exist yet: an existing file may be a journal that
    /// still has to be recovered.
    ///
    /// # Errors
    ///
    /// - [`JournalError::InvalidConfig`] if `config` does not validate or its
    ///   line break differs from the encoder's.
    /// - [`JournalError::Io`] if the file exists or cannot be created,
    ///   written or synced.
    pub fn create(
        path: impl AsRef<Path>,
        config: &JournalConfig,
        encoder: RecordEncoder<HE, BE>,
    ) -> Result<Self, JournalError> {
        config.validate()?;
        if encoder.line_break() != config.line_break {
            return Err(JournalError::invalid_config(format!(
                "encoder line break {} differs from configured line break {}",
                encoder.line_break(),
                config.line_break
            )));
        }

        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| JournalError::io_at(path, e))?;

        let schema = SchemaHeader::new(config.schema_version, config.application_version.clone());
        let mut header_line = Vec::new();
        encoder.encode_schema_header(&schema, &mut header_line);
        file.write_all(&header_line)
            .and_then(|()| fsync_file(&file))
            .and_then(|()| fsync_parent(path))
            .map_err(|e| JournalError::io_at(path, e))?;

        info!(
            path = %path.display(),
            schema_version = schema.schema_version,
            line_break = %config.line_break,
            "journal created"
        );

        Ok(Self {
            file: Some(file),
            path: path.to_path_buf(),
            encoder,
            buffer: Vec::with_capacity(config.buffer_capacity),
            line: Vec::new(),
            capacity: config.buffer_capacity,
            flush_policy: config.flush_policy,
            sync_on_flush: config.sync_on_flush,
            records_written: 0,
            poisoned: false,
        })
    }

    /// Encodes one record and appends it to the buffer.
    ///
    /// May write to the file, depending on the buffer fill level and the
    /// flush policy. A record longer than the whole buffer is written
    /// directly.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Io`] if a write fails; the writer is unusable afterwards.
    /// - [`JournalError::Precondition`] if an earlier write failed.
    pub fn accept(
        &mut self,
        header: &HE::Header,
        command: &BE::Command,
    ) -> Result<(), JournalError> {
        self.ensure_usable("accept")?;

        self.line.clear();
        self.encoder.encode_record(header, command, &mut self.line);

        if self.buffer.len() + self.line.len() > self.capacity {
            self.write_buffer()?;
        }
        if self.line.len() > self.capacity {
            trace!(bytes = self.line.len(), "record larger than buffer, writing directly");
            let line = std::mem::take(&mut self.line);
            let written = self.write_out(&line);
            self.line = line;
            written?;
        } else {
            self.buffer.extend_from_slice(&self.line);
        }

        self.records_written += 1;
        #[cfg(feature = "metrics")]
        metrics::counter!("journal_records_written").increment(1);

        match self.flush_policy {
            FlushPolicy::AfterEveryRecord => self.write_buffer(),
            FlushPolicy::SizeThreshold(threshold) if self.buffer.len() >= threshold => {
                self.write_buffer()
            }
            _ => Ok(()),
        }
    }

    /// Writes the buffer to the file.
    ///
    /// Syncs the file data too when `sync_on_flush` is set.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept).
    pub fn flush(&mut self) -> Result<(), JournalError> {
        self.ensure_usable("flush")?;
        self.write_buffer()
    }

    /// Flushes the buffer and syncs the file to disk.
    ///
    /// Once this returns `Ok`, every accepted record is durable.
    ///
    /// # Errors
    ///
    /// Same as [`accept`](Self::accept), plus [`JournalError::Io`] if the
    /// final sync fails.
    pub fn close(mut self) -> Result<(), JournalError> {
        self.ensure_usable("close")?;
        self.write_buffer()?;
        if let Some(file) = self.file.take() {
            fsync_file(&file).map_err(|e| JournalError::io_at(&self.path, e))?;
        }
        info!(
            path = %self.path.display(),
            records = self.records_written,
            "journal closed"
        );
        Ok(())
    }

    /// Number of records accepted so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Bytes accepted but not yet written to the file.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Path of the journal file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_usable(&self, operation: &'static str) -> Result<(), JournalError> {
        if self.poisoned {
            return Err(JournalError::precondition(
                operation,
                format!("an earlier write to {} failed", self.path.display()),
            ));
        }
        if self.file.is_none() {
            return Err(JournalError::precondition(operation, "journal writer is closed"));
        }
        Ok(())
    }

    fn write_buffer(&mut self) -> Result<(), JournalError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let buffer = std::mem::take(&mut self.buffer);
        let written = self.write_out(&buffer);
        self.buffer = buffer;
        written?;
        trace!(bytes = self.buffer.len(), "journal buffer flushed");
        self.buffer.clear();
        #[cfg(feature = "metrics")]
        metrics::counter!("journal_flushes").increment(1);
        Ok(())
    }

    fn write_out(&mut self, bytes: &[u8]) -> Result<(), JournalError> {
        let Some(file) = self.file.as_mut() else {
            return Err(JournalError::precondition("write", "journal writer is closed"));
        };
        if let Err(e) = write_and_sync(file, bytes, self.sync_on_flush) {
            self.poisoned = true;
            return Err(JournalError::io_at(&self.path, e));
        }
        Ok(())
    }
}

fn write_and_sync(file: &mut File, bytes: &[u8], sync: bool) -> io::Result<()> {
    file.write_all(bytes)?;
    if sync {
        file.sync_data()?;
    }
    Ok(())
}

impl<HE, BE> Drop for JournalWriter<HE, BE>
where
    HE: HeaderEncoder,
    BE: CommandBodyEncoder,
{
    fn drop(&mut self) {
        if self.file.is_none() || self.poisoned {
            return;
        }
        if let Err(e) = self.write_buffer() {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to flush journal writer on drop"
            );
        }
    }
}

impl<HE, BE> std::fmt::Debug for JournalWriter<HE, BE>
where
    HE: HeaderEncoder,
    BE: CommandBodyEncoder,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalWriter")
            .field("path", &self.path)
            .field("open", &self.file.is_some())
            .field("buffered", &self.buffer.len())
            .field("capacity", &self.capacity)
            .field("flush_policy", &self.flush_policy)
            .field("records_written", &self.records_written)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
