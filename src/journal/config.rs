//! Journal configuration.
//!
//! [`JournalConfig`] gathers every tunable of the reader, writer and
//! recovery coordinator. It derives `serde` traits with defaults for every
//! field, so a partial JSON document is enough:
//!
//! ```json
//! {
//!   "base_path": "/var/lib/service/my.intraday",
//!   "line_break": "CRLF",
//!   "flush_policy": { "size_threshold": 65536 },
//!   "schema_version": 2
//! }
//! ```

use super::error::JournalError;
use super::line_break::LineBreak;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Suffix of the file being replayed after an unclean shutdown.
pub const RECOVERY_SUFFIX: &str = ".recovery";

/// Suffix of a file whose replay completed.
pub const RECOVERED_SUFFIX: &str = ".recovered";

/// Default read chunk size in bytes (64 KiB).
pub const DEFAULT_CHUNK_MAXIMUM_LENGTH: usize = 64 * 1024;

/// Default maximum record length in bytes (1 MiB).
pub const DEFAULT_SLICE_MAXIMUM_LENGTH: usize = 1024 * 1024;

/// Default writer buffer capacity in bytes (64 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// When the writer pushes its buffer to the file.
///
/// Whatever the policy, the buffer is also flushed when it is full, on
/// [`JournalWriter::flush`](super::writer::JournalWriter::flush) and on
/// [`JournalWriter::close`](super::writer::JournalWriter::close).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// Only when full or asked to.
    #[default]
    Manual,
    /// After every accepted record.
    AfterEveryRecord,
    /// As soon as the buffer holds at least this many bytes.
    SizeThreshold(usize),
}

/// Configuration shared by the journal reader, writer and recovery coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Path of the active journal file; recovery names derive from it.
    pub base_path: PathBuf,
    /// Record delimiter of the file.
    pub line_break: LineBreak,
    /// Size of each read from the file.
    pub chunk_maximum_length: usize,
    /// Longest record accepted by the reader; longer ones abort the read.
    pub slice_maximum_length: usize,
    /// Accept a final record without a trailing delimiter.
    pub may_lack_trailing_break: bool,
    /// Capacity of the writer buffer.
    pub buffer_capacity: usize,
    /// When the writer flushes.
    pub flush_policy: FlushPolicy,
    /// Also `fsync` on every flush, not only on close.
    pub sync_on_flush: bool,
    /// Schema version written to and expected in the header line.
    pub schema_version: u32,
    /// Application version written to the header line.
    pub application_version: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("journal"),
            line_break: LineBreak::default(),
            chunk_maximum_length: DEFAULT_CHUNK_MAXIMUM_LENGTH,
            slice_maximum_length: DEFAULT_SLICE_MAXIMUM_LENGTH,
            may_lack_trailing_break: false,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_policy: FlushPolicy::Manual,
            sync_on_flush: false,
            schema_version: 0,
            application_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl JournalConfig {
    /// Creates a default configuration for the journal at `base_path`.
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] if the JSON is malformed or
    /// the values do not validate.
    pub fn from_json_str(json: &str) -> Result<Self, JournalError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| JournalError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| JournalError::io_at(path, e))?;
        Self::from_json_str(&text)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<(), JournalError> {
        if self.base_path.file_name().is_none() {
            return Err(JournalError::invalid_config(format!(
                "base_path {} does not name a file",
                self.base_path.display()
            )));
        }
        self.line_break.validate()?;
        if self.chunk_maximum_length == 0 {
            return Err(JournalError::invalid_config(
                "chunk_maximum_length must be at least 1",
            ));
        }
        if self.slice_maximum_length == 0 {
            return Err(JournalError::invalid_config(
                "slice_maximum_length must be at least 1",
            ));
        }
        if self.buffer_capacity == 0 {
            return Err(JournalError::invalid_config(
                "buffer_capacity must be at least 1",
            ));
        }
        if let FlushPolicy::SizeThreshold(threshold) = self.flush_policy
            && (threshold == 0 || threshold > self.buffer_capacity)
        {
            return Err(JournalError::invalid_config(format!(
                "size threshold {threshold} must be between 1 and buffer_capacity ({})",
                self.buffer_capacity
            )));
        }
        Ok(())
    }

    /// Path of the active journal (`<base>`).
    #[must_use]
    pub fn active_path(&self) -> PathBuf {
        self.base_path.clone()
    }

    /// Path of the file being recovered (`<base>.recovery`).
    #[must_use]
    pub fn recovery_path(&self) -> PathBuf {
        with_suffix(&self.base_path, RECOVERY_SUFFIX)
    }

    /// Path of the fully replayed file (`<base>.recovered`).
    #[must_use]
    pub fn recovered_path(&self) -> PathBuf {
        with_suffix(&self.base_path, RECOVERED_SUFFIX)
    }
}

/// Appends `suffix` to the file name, keeping any existing extension.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}
