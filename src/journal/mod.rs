//! Command journal: append-only persistence and crash recovery.
//!
//! A journal is a text file holding one schema header line followed by one
//! line per command processed by a stateful service. Lines are terminated by
//! a configurable one or two byte [`LineBreak`].
//!
//! # Types
//!
//! - [`Slicer`]: splits a byte stream read in chunks into delimiter-separated slices
//! - [`FieldReader`] / [`FieldWriter`]: the positional, space-separated field codec
//! - [`HeaderDecoder`], [`HeaderEncoder`], [`CommandBodyDecoder`],
//!   [`CommandBodyEncoder`]: codec traits implemented by applications
//! - [`Header`], [`Stamp`], [`HeaderCodec`]: the bundled record header
//! - [`SessionHeader`], [`SessionHeaderCodec`]: a compact stamp and session header
//! - [`RecordDecoder`] / [`RecordEncoder`]: one line to one record and back
//! - [`JournalReader`]: lazy replay of a journal from a record offset
//! - [`JournalWriter`]: buffered appender with a [`FlushPolicy`]
//! - [`RecoveryCoordinator`]: rename-based recovery after an unclean shutdown
//! - [`JournalConfig`]: the tunables of all of the above
//! - [`JournalError`]: error type for journal operations
//!
//! # Lifecycle
//!
//! ```text
//! start ──► RecoveryCoordinator::resolve_recovery_file   (<base> → <base>.recovery)
//!       ──► RecoveryCoordinator::replay                   (apply every record)
//!       ──► RecoveryCoordinator::rename_recovery_file_to_recovered
//!       ──► JournalWriter::create(<base>) ── accept … ── close
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod fields;
pub mod header;
pub mod line_break;
pub mod reader;
pub mod record;
pub mod recovery;
pub mod slicer;
pub mod writer;


pub use codec::{CommandBodyDecoder, CommandBodyEncoder, HeaderDecoder, HeaderEncoder};
pub use config::{
    DEFAULT_BUFFER_CAPACITY, DEFAULT_CHUNK_MAXIMUM_LENGTH, DEFAULT_SLICE_MAXIMUM_LENGTH,
    FlushPolicy, JournalConfig, RECOVERED_SUFFIX, RECOVERY_SUFFIX,
};
pub use error::{DecodeError, JournalError};
pub use fields::{FieldReader, FieldWriter, NULL_TOKEN};
pub use header::{
    Header, HeaderCodec, Kind, SchemaHeader, SessionHeader, SessionHeaderCodec, Stamp, StampClock,
};
pub use line_break::LineBreak;
pub use reader::{JournalReader, JournalRecord};
pub use record::{Decoded, RecordDecoder, RecordEncoder};
pub use recovery::{
    FileIdentity, RecoveryCoordinator, RecoveryState, ReplayReader, ReplaySource, ReplayStats,
};
pub use slicer::{OwnedSlices, Slicer};
pub use writer::JournalWriter;
