//! Prelude module that re-exports commonly used types and traits.
//!
//! ```rust
//! use journal_rs::prelude::*;
//! ```
//!
//! This imports everything needed to write, replay and recover a journal.

// Configuration and errors
pub use crate::journal::{DecodeError, FlushPolicy, JournalConfig, JournalError, LineBreak};

// Codec traits and the bundled header
pub use crate::journal::{
    CommandBodyDecoder, CommandBodyEncoder, FieldReader, FieldWriter, Header, HeaderCodec,
    HeaderDecoder, HeaderEncoder, Kind, SchemaHeader, SessionHeader, SessionHeaderCodec, Stamp,
    StampClock,
};

// Reading, writing and recovery
pub use crate::journal::{
    FileIdentity, JournalReader, JournalRecord, JournalWriter, RecordDecoder, RecordEncoder,
    RecoveryCoordinator, RecoveryState, ReplayStats, Slicer,
};

// Utility functions
pub use crate::utils::current_time_millis;
