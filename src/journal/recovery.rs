//! Crash recovery through file renames.
//!
//! A logical journal has three possible names:
//!
//! | name               | meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `<base>`           | active file, written by the running process |
//! | `<base>.recovery`  | being replayed after a restart            |
//! | `<base>.recovered` | fully replayed, kept for audit            |
//!
//! [`RecoveryCoordinator`] moves a journal through these names with atomic
//! renames so that a crash at any point leaves a state the next start can
//! pick up:
//!
//! - crash before [`resolve_recovery_file`](RecoveryCoordinator::resolve_recovery_file):
//!   `<base>` is untouched and is resolved again on the next start;
//! - crash during replay: `<base>.recovery` stays in place and is replayed
//!   again from the start, so applying records must be idempotent;
//! - crash after [`rename_recovery_file_to_recovered`](RecoveryCoordinator::rename_recovery_file_to_recovered):
//!   there is nothing left to recover.

use super::codec::{CommandBodyDecoder, HeaderDecoder};
use super::config::JournalConfig;
use super::error::JournalError;
use super::reader::{JournalReader, JournalRecord};
use super::record::RecordDecoder;
use crate::utils::fsync_parent;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which of the three journal names currently exists on disk.
///
/// When more than one exists the most advanced unfinished one wins:
/// `Recovering`, then `Active`, then `Recovered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileIdentity {
    /// None of the three files exists.
    Absent,
    /// Only an active journal (and possibly an old `.recovered`) exists.
    Active,
    /// A `.recovery` file exists; an earlier replay did not complete.
    Recovering,
    /// Only a `.recovered` file exists.
    Recovered,
}

impl FileIdentity {
    /// Inspects the file system for the journal described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Io`] if a path cannot be checked.
    pub fn detect(config: &JournalConfig) -> Result<Self, JournalError> {
        if exists(&config.recovery_path())? {
            Ok(FileIdentity::Recovering)
        } else if exists(&config.active_path())? {
            Ok(FileIdentity::Active)
        } else if exists(&config.recovered_path())? {
            Ok(FileIdentity::Recovered)
        } else {
            Ok(FileIdentity::Absent)
        }
    }
}

/// Progress of one [`RecoveryCoordinator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryState {
    /// [`resolve_recovery_file`](RecoveryCoordinator::resolve_recovery_file)
    /// has not run yet.
    Unresolved,
    /// The file to replay is known. `None` means there is nothing to recover.
    Resolved {
        /// The `.recovery` file, if any.
        recovery_file: Option<PathBuf>,
    },
    /// Every record of the recovery file was read.
    Replayed {
        /// The `.recovery` file, if any.
        recovery_file: Option<PathBuf>,
    },
    /// The recovery file was renamed to `.recovered`.
    Recovered {
        /// The `.recovered` file, if there was anything to recover.
        recovered_file: Option<PathBuf>,
    },
}

impl RecoveryState {
    fn name(&self) -> &'static str {
        match self {
            RecoveryState::Unresolved => "unresolved",
            RecoveryState::Resolved { .. } => "resolved",
            RecoveryState::Replayed { .. } => "replayed",
            RecoveryState::Recovered { .. } => "recovered",
        }
    }
}

/// Byte source of a replay: the recovery file, or nothing at all.
///
/// Only [`RecoveryCoordinator::open_replay`] creates one. It remembers which
/// file it reads so that [`RecoveryCoordinator::finish_replay`] can refuse a
/// reader that did not replay the coordinator's own recovery file.
#[derive(Debug)]
pub struct ReplaySource {
    origin: Option<(PathBuf, File)>,
}

impl ReplaySource {
    fn file(path: PathBuf, file: File) -> Self {
        Self {
            origin: Some((path, file)),
        }
    }

    fn nothing() -> Self {
        Self { origin: None }
    }

    /// The recovery file being read, `None` when there was nothing to recover.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.origin.as_ref().map(|(path, _)| path.as_path())
    }
}

impl Read for ReplaySource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.origin {
            Some((_, file)) => file.read(buf),
            None => Ok(0),
        }
    }
}

/// Counters of a completed replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayStats {
    /// Records handed to the application.
    pub records_applied: u64,
    /// Records skipped because their command name was unknown.
    pub skipped_unknown: u64,
    /// Data records read from the file, including those before the start offset.
    pub records_consumed: u64,
}

/// Replay reader produced by [`RecoveryCoordinator::open_replay`].
pub type ReplayReader<HD, BD> = JournalReader<HD, BD, ReplaySource>;

/// Drives one logical journal through the recovery protocol.
///
/// ```no_run
/// # use journal_rs::journal::*;
/// # fn demo<HD, BD>(
/// #     config: JournalConfig,
/// #     decoder: RecordDecoder<HD, BD>,
/// # ) -> Result<(), JournalError>
/// # where HD: HeaderDecoder, BD: CommandBodyDecoder<Header = HD::Header> {
/// let mut coordinator = RecoveryCoordinator::new(config)?;
/// coordinator.resolve_recovery_file()?;
/// let stats = coordinator.replay(0, decoder, |record| {
///     // apply record.command to the in-memory state
///     # let _ = record;
///     Ok::<(), JournalError>(())
/// })?;
/// coordinator.rename_recovery_file_to_recovered()?;
/// # let _ = stats;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RecoveryCoordinator {
    config: JournalConfig,
    state: RecoveryState,
}

impl RecoveryCoordinator {
    /// Creates a coordinator for the journal described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: JournalConfig) -> Result<Self, JournalError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RecoveryState::Unresolved,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &RecoveryState {
        &self.state
    }

    /// Determines which file to replay, renaming the active journal aside if needed.
    ///
    /// - An existing `<base>.recovery` is used as is; `<base>` is not touched.
    /// - Otherwise an existing `<base>` is renamed to `<base>.recovery`.
    /// - Otherwise there is nothing to recover and `Ok(None)` is returned.
    ///
    /// Calling it again before the final rename returns the same answer
    /// without touching the file system.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Precondition`] once recovery is complete.
    /// - [`JournalError::Io`] if a path cannot be checked or the rename fails.
    pub fn resolve_recovery_file(&mut self) -> Result<Option<&Path>, JournalError> {
        match self.state {
            RecoveryState::Unresolved => {
                let recovery_file = self.resolve_on_disk()?;
                self.state = RecoveryState::Resolved { recovery_file };
            }
            RecoveryState::Resolved { .. } | RecoveryState::Replayed { .. } => {}
            RecoveryState::Recovered { .. } => {
                return Err(JournalError::precondition(
                    "resolve_recovery_file",
                    "recovery already completed",
                ));
            }
        }
        match &self.state {
            RecoveryState::Resolved { recovery_file }
            | RecoveryState::Replayed { recovery_file } => Ok(recovery_file.as_deref()),
            _ => Ok(None),
        }
    }

    fn resolve_on_disk(&self) -> Result<Option<PathBuf>, JournalError> {
        let active = self.config.active_path();
        let recovery = self.config.recovery_path();

        if exists(&recovery)? {
            if exists(&active)? {
                warn!(
                    active = %active.display(),
                    recovery = %recovery.display(),
                    "active journal found next to an unfinished recovery file; leaving it untouched"
                );
            }
            info!(path = %recovery.display(), "resuming interrupted journal recovery");
            return Ok(Some(recovery));
        }

        if exists(&active)? {
            fs::rename(&active, &recovery).map_err(|e| JournalError::io_at(&active, e))?;
            fsync_parent(&recovery).map_err(|e| JournalError::io_at(&recovery, e))?;
            info!(
                from = %active.display(),
                to = %recovery.display(),
                "journal moved aside for recovery"
            );
            return Ok(Some(recovery));
        }

        info!(path = %active.display(), "no journal to recover");
        Ok(None)
    }

    /// Opens a reader over the resolved recovery file.
    ///
    /// With nothing to recover the reader yields no records.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Precondition`] unless the state is `Resolved`.
    /// - Any error of [`JournalReader::open`].
    pub fn open_replay<HD, BD>(
        &self,
        start_offset: u64,
        decoder: RecordDecoder<HD, BD>,
    ) -> Result<ReplayReader<HD, BD>, JournalError>
    where
        HD: HeaderDecoder,
        BD: CommandBodyDecoder<Header = HD::Header>,
    {
        let RecoveryState::Resolved { recovery_file } = &self.state else {
            return Err(JournalError::precondition(
                "open_replay",
                format!(
                    "recovery file must be resolved first (state is {})",
                    self.state.name()
                ),
            ));
        };

        let source = match recovery_file {
            Some(path) => {
                let file = File::open(path).map_err(|e| JournalError::io_at(path, e))?;
                ReplaySource::file(path.clone(), file)
            }
            None => ReplaySource::nothing(),
        };
        debug!(start_offset, "opening journal replay");
        JournalReader::with_path(
            source,
            recovery_file.clone(),
            start_offset,
            &self.config,
            decoder,
        )
    }

    /// Takes back a reader that has been driven to the end of its file.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::Precondition`] if the state is not `Resolved`,
    /// the reader stopped before a clean end of input, or it was opened by
    /// another coordinator on a different file.
    pub fn finish_replay<HD, BD>(
        &mut self,
        reader: ReplayReader<HD, BD>,
    ) -> Result<ReplayStats, JournalError>
    where
        HD: HeaderDecoder,
        BD: CommandBodyDecoder<Header = HD::Header>,
    {
        if !reader.is_finished() {
            return Err(JournalError::precondition(
                "finish_replay",
                "the replay reader did not reach the end of the recovery file",
            ));
        }
        let recovery_file = match &mut self.state {
            RecoveryState::Resolved { recovery_file } => {
                let replayed = reader.source().path();
                if replayed != recovery_file.as_deref() {
                    return Err(JournalError::precondition(
                        "finish_replay",
                        format!(
                            "the reader replayed {} but the recovery file is {}",
                            display_opt(replayed),
                            display_opt(recovery_file.as_deref()),
                        ),
                    ));
                }
                recovery_file.take()
            }
            other => {
                return Err(JournalError::precondition(
                    "finish_replay",
                    format!("no replay in progress (state is {})", other.name()),
                ));
            }
        };

        let stats = ReplayStats {
            records_applied: reader.records_yielded(),
            skipped_unknown: reader.skipped_unknown(),
            records_consumed: reader.records_consumed(),
        };
        self.state = RecoveryState::Replayed { recovery_file };
        info!(
            records = stats.records_applied,
            skipped_unknown = stats.skipped_unknown,
            "journal replay complete"
        );
        Ok(stats)
    }

    /// Replays the recovery file, handing each record to `apply`.
    ///
    /// Stops at the first error, from the journal or from `apply`, leaving
    /// the state `Resolved` so that the replay can be attempted again.
    ///
    /// # Errors
    ///
    /// Returns the first error raised, converted into `E`.
    pub fn replay<HD, BD, E, F>(
        &mut self,
        start_offset: u64,
        decoder: RecordDecoder<HD, BD>,
        mut apply: F,
    ) -> Result<ReplayStats, E>
    where
        HD: HeaderDecoder,
        BD: CommandBodyDecoder<Header = HD::Header>,
        E: From<JournalError>,
        F: FnMut(JournalRecord<HD::Header, BD::Command>) -> Result<(), E>,
    {
        let mut reader = self.open_replay(start_offset, decoder)?;
        for record in reader.by_ref() {
            apply(record?)?;
        }
        Ok(self.finish_replay(reader)?)
    }

    /// Renames `<base>.recovery` to `<base>.recovered`, replacing an older one.
    ///
    /// Returns the new path, or `None` when there was nothing to recover.
    ///
    /// # Errors
    ///
    /// - [`JournalError::Precondition`] unless the state is `Replayed`.
    /// - [`JournalError::Io`] if the rename fails.
    pub fn rename_recovery_file_to_recovered(&mut self) -> Result<Option<PathBuf>, JournalError> {
        let RecoveryState::Replayed { recovery_file } = &self.state else {
            return Err(JournalError::precondition(
                "rename_recovery_file_to_recovered",
                format!(
                    "the recovery file must be fully replayed first (state is {})",
                    self.state.name()
                ),
            ));
        };

        let recovered_file = match recovery_file {
            Some(recovery) => {
                let recovered = self.config.recovered_path();
                fs::rename(recovery, &recovered).map_err(|e| JournalError::io_at(recovery, e))?;
                fsync_parent(&recovered).map_err(|e| JournalError::io_at(&recovered, e))?;
                info!(path = %recovered.display(), "journal recovery completed");
                Some(recovered)
            }
            None => None,
        };
        self.state = RecoveryState::Recovered {
            recovered_file: recovered_file.clone(),
        };
        Ok(recovered_file)
    }
}

fn display_opt(path: Option<&Path>) -> String {
    path.map_or_else(|| "nothing".to_string(), |p| p.display().to_string())
}

fn exists(path: &Path) -> Result<bool, JournalError> {
    path.try_exists().map_err(|e| JournalError::io_at(path, e))
}
