#[cfg(test)]
mod tests_recovery {
    use crate::common::{SessionCommand, decoder, open_writer, write_all};
    use journal_rs::journal::{
        FileIdentity, Header, JournalConfig, JournalError, RecoveryCoordinator, RecoveryState,
        Stamp, StampClock,
    };
    use std::collections::BTreeMap;
    use std::fs;

    /// In-memory state rebuilt from the journal: message count per session.
    #[derive(Debug, Default, PartialEq, Eq)]
    struct Inbox {
        last_applied: Option<Stamp>,
        messages: BTreeMap<String, usize>,
    }

    impl Inbox {
        /// Idempotent: records at or before the last applied stamp are ignored.
        fn apply(&mut self, header: &Header, command: &SessionCommand) {
            if self.last_applied.is_some_and(|last| header.stamp <= last) {
                return;
            }
            self.last_applied = Some(header.stamp);
            if let SessionCommand::Message { .. } = command {
                *self.messages.entry(header.session_id.clone()).or_default() += 1;
            }
        }
    }

    fn traffic(count: u64) -> Vec<(Header, SessionCommand)> {
        let mut clock = StampClock::new();
        (0..count)
            .map(|i| {
                (
                    Header::upward(clock.next_at(10_000 + i), format!("s{}", i % 3)),
                    SessionCommand::Message {
                        text: format!("msg {i}"),
                        priority: 0,
                    },
                )
            })
            .collect()
    }

    fn recover(config: &JournalConfig, inbox: &mut Inbox) -> Result<u64, JournalError> {
        let mut coordinator = RecoveryCoordinator::new(config.clone())?;
        coordinator.resolve_recovery_file()?;
        let stats = coordinator.replay(0, decoder(), |record| {
            inbox.apply(&record.header, &record.command);
            Ok::<(), JournalError>(())
        })?;
        coordinator.rename_recovery_file_to_recovered()?;
        Ok(stats.records_applied)
    }

    #[test]
    fn test_restart_cycle_rebuilds_state_and_starts_fresh_journal() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("my.intraday"));
        let first_run = traffic(30);
        write_all(&config.active_path(), &config, &first_run);

        let mut inbox = Inbox::default();
        assert_eq!(recover(&config, &mut inbox).unwrap_or_else(|_| panic!("recover")), 30);
        assert_eq!(inbox.messages.values().sum::<usize>(), 30);
        assert_eq!(FileIdentity::detect(&config).ok(), Some(FileIdentity::Recovered));

        // Second run appends to a brand-new active file.
        let mut writer = open_writer(&config.active_path(), &config);
        let mut clock =
            StampClock::resume_after(inbox.last_applied.unwrap_or_else(|| panic!("stamp")));
        let header = Header::upward(clock.next_stamp(), "s0");
        writer
            .accept(
                &header,
                &SessionCommand::Message {
                    text: "after restart".into(),
                    priority: 2,
                },
            )
            .unwrap_or_else(|_| panic!("accept"));
        writer.close().unwrap_or_else(|_| panic!("close"));

        // Third start recovers only the second run's journal.
        let mut next_inbox = Inbox::default();
        assert_eq!(recover(&config, &mut next_inbox).unwrap_or_else(|_| panic!("recover")), 1);
        assert_eq!(next_inbox.messages.get("s0"), Some(&1));
    }

    #[test]
    fn test_crash_before_resolve_leaves_active_file_untouched() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("untouched.journal"));
        write_all(&config.active_path(), &config, &traffic(3));
        let before = fs::read(config.active_path()).unwrap_or_else(|_| panic!("read"));

        {
            let _coordinator =
                RecoveryCoordinator::new(config.clone()).unwrap_or_else(|_| panic!("coordinator"));
        }
        assert_eq!(FileIdentity::detect(&config).ok(), Some(FileIdentity::Active));
        assert_eq!(fs::read(config.active_path()).unwrap_or_else(|_| panic!("read")), before);
    }

    #[test]
    fn test_crash_mid_replay_then_restart_gives_same_state() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("midway.journal"));
        write_all(&config.active_path(), &config, &traffic(20));

        let mut inbox = Inbox::default();
        {
            let mut coordinator =
                RecoveryCoordinator::new(config.clone()).unwrap_or_else(|_| panic!("coordinator"));
            coordinator.resolve_recovery_file().unwrap_or_else(|_| panic!("resolve"));
            let reader =
                coordinator.open_replay(0, decoder()).unwrap_or_else(|_| panic!("open replay"));
            for record in reader.take(7) {
                let record = record.unwrap_or_else(|_| panic!("record"));
                inbox.apply(&record.header, &record.command);
            }
            // Process dies here: no finish, no rename.
        }
        assert_eq!(FileIdentity::detect(&config).ok(), Some(FileIdentity::Recovering));

        // The restart replays the whole recovery file into the partially built state.
        assert_eq!(recover(&config, &mut inbox).unwrap_or_else(|_| panic!("recover")), 20);

        let mut clean = Inbox::default();
        let dir2 = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config2 = JournalConfig::new(dir2.path().join("midway.journal"));
        write_all(&config2.active_path(), &config2, &traffic(20));
        recover(&config2, &mut clean).unwrap_or_else(|_| panic!("recover"));
        assert_eq!(inbox, clean);
    }

    #[test]
    fn test_resolving_twice_gives_identical_recovery_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("twice.journal"));
        write_all(&config.active_path(), &config, &traffic(10));

        let mut first =
            RecoveryCoordinator::new(config.clone()).unwrap_or_else(|_| panic!("coordinator"));
        first.resolve_recovery_file().unwrap_or_else(|_| panic!("resolve"));
        let after_first = fs::read(config.recovery_path()).unwrap_or_else(|_| panic!("read"));
        drop(first);

        let mut second =
            RecoveryCoordinator::new(config.clone()).unwrap_or_else(|_| panic!("coordinator"));
        second.resolve_recovery_file().unwrap_or_else(|_| panic!("resolve"));
        assert!(matches!(second.state(), RecoveryState::Resolved { recovery_file: Some(_) }));
        assert_eq!(
            fs::read(config.recovery_path()).unwrap_or_else(|_| panic!("read")),
            after_first
        );
    }

    #[test]
    fn test_torn_tail_after_crash_stops_replay() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("torn.journal"));
        write_all(&config.active_path(), &config, &traffic(4));
        let mut bytes = fs::read(config.active_path()).unwrap_or_else(|_| panic!("read"));
        bytes.extend_from_slice(b"10004:0 s1 UPWARD \\0 \\0 Message tor");
        fs::write(config.active_path(), bytes).unwrap_or_else(|_| panic!("write"));

        let mut inbox = Inbox::default();
        let result = recover(&config, &mut inbox);
        assert!(matches!(result, Err(JournalError::UnterminatedSlice { .. })));
        // Nothing is renamed away, so the next start sees the same file.
        assert_eq!(FileIdentity::detect(&config).ok(), Some(FileIdentity::Recovering));

        let mut tolerant = config.clone();
        tolerant.may_lack_trailing_break = true;
        let retry = recover(&tolerant, &mut inbox);
        assert!(matches!(retry, Err(JournalError::Decode { record: 4, .. })));
    }
}
