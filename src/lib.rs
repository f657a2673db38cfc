//! # Crash-Recoverable Command Journal
//!
//! An append-only journal for stateful services that rebuild their in-memory
//! state by replaying every command they ever processed. The crate provides
//! the three pieces such a service needs at its storage boundary:
//!
//! - a **chunked slicer** that tokenizes an arbitrarily chunked byte stream
//!   into delimiter-separated records, with one or two byte delimiters that
//!   may straddle chunk boundaries;
//! - a **journal reader and writer** that replay and append records through
//!   pluggable header and command codecs;
//! - a **recovery coordinator** that uses atomic renames so that restarting
//!   after a crash, even a crash during recovery, is safe and idempotent.
//!
//! ## Key Features
//!
//! - **Streaming**: files are read in fixed-size chunks and at most one
//!   partial record is buffered, so memory use does not depend on the
//!   journal size.
//! - **Exact replay**: records come back in append order, with nothing lost,
//!   duplicated or reordered. Every malformed record aborts the replay.
//! - **Forward compatibility**: records whose command name the application
//!   does not know are skipped and counted instead of failing the replay.
//! - **Explicit durability**: a [`FlushPolicy`](journal::FlushPolicy) fixed at
//!   construction, and a `close` that syncs every accepted record to disk.
//!
//! ## File Format
//!
//! A journal is line oriented. The first line is the schema header, each
//! following line one record; every token is followed by a single space:
//!
//! ```text
//! SchemaVersion 1 ApplicationVersion 0.1.0 ⏎
//! 1700000000000:0 alice UPWARD \0 \0 Deposit acc-1 250 ⏎
//! 1700000000000:1 alice DOWNWARD 1700000000000:0 \0 Ack ⏎
//! ```
//!
//! The line break (`⏎`) is `CR`, `LF`, `CRLF` or any other one or two byte
//! sequence, chosen per file through [`JournalConfig`](journal::JournalConfig).
//!
//! ## File Names
//!
//! | name               | meaning                          |
//! |--------------------|----------------------------------|
//! | `<base>`           | active journal                   |
//! | `<base>.recovery`  | being replayed after a restart   |
//! | `<base>.recovered` | replay completed                 |
//!
//! ## Example
//!
//! ```rust,no_run
//! use journal_rs::prelude::*;
//!
//! # fn run<BE, BD>(body_encoder: BE, body_decoder: BD, commands: Vec<BE::Command>)
//! #     -> Result<(), JournalError>
//! # where BE: CommandBodyEncoder, BD: CommandBodyDecoder<Header = Header> {
//! let config = JournalConfig::load("journal.json")?;
//!
//! // Recover whatever an earlier run left behind.
//! let mut recovery = RecoveryCoordinator::new(config.clone())?;
//! recovery.resolve_recovery_file()?;
//! let decoder = RecordDecoder::new(HeaderCodec, body_decoder);
//! recovery.replay(0, decoder, |record| {
//!     // apply record.command to the in-memory state
//!     # let _ = record;
//!     Ok::<(), JournalError>(())
//! })?;
//! recovery.rename_recovery_file_to_recovered()?;
//!
//! // Start a fresh journal.
//! let encoder = RecordEncoder::new(HeaderCodec, body_encoder, config.line_break);
//! let mut writer = JournalWriter::create(config.active_path(), &config, encoder)?;
//! let mut clock = StampClock::new();
//! for command in &commands {
//!     writer.accept(&Header::upward(clock.next_stamp(), "session-1"), command)?;
//! }
//! writer.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging and Metrics
//!
//! The crate logs through [`tracing`] and never installs a subscriber.
//! With the `metrics` feature it also increments the counters
//! `journal_records_written`, `journal_records_replayed`,
//! `journal_unknown_commands_skipped` and `journal_flushes`.

pub mod journal;

pub mod prelude;
mod utils;

pub use journal::{
    CommandBodyDecoder, CommandBodyEncoder, DecodeError, FlushPolicy, Header, HeaderCodec,
    HeaderDecoder, HeaderEncoder, JournalConfig, JournalError, JournalReader, JournalRecord,
    JournalWriter, LineBreak, RecordDecoder, RecordEncoder, RecoveryCoordinator, Slicer, Stamp,
};
pub use utils::current_time_millis;
