#[cfg(test)]
mod tests_round_trip {
    use crate::common::{SessionCommand, decoder, legacy_decoder, open_writer, write_all};
    use journal_rs::journal::{
        FlushPolicy, Header, JournalConfig, JournalError, JournalReader, Kind, LineBreak, Stamp,
        StampClock,
    };
    use std::fs;

    fn session_records() -> Vec<(Header, SessionCommand)> {
        let mut clock = StampClock::new();
        let login = Header::upward(clock.next_at(1_000), "alice");
        let login_stamp = login.stamp;
        vec![
            (
                login,
                SessionCommand::Login {
                    user: "alice".into(),
                    admin: false,
                },
            ),
            (
                Header::upward(clock.next_at(1_000), "alice").with_tag("client #7"),
                SessionCommand::Message {
                    text: "hello world\r\nsecond line".into(),
                    priority: -3,
                },
            ),
            (
                Header::upward(clock.next_at(1_001), "alice")
                    .with_kind(Kind::Downward)
                    .with_cause(login_stamp),
                SessionCommand::Message {
                    text: "héllo \\ wörld | # ✓".into(),
                    priority: 0,
                },
            ),
            (
                Header::upward(clock.next_at(1_001), "bob smith").with_kind(Kind::Internal),
                SessionCommand::Message {
                    text: String::new(),
                    priority: i64::MAX,
                },
            ),
            (
                Header::upward(clock.next_at(1_002), "alice"),
                SessionCommand::Logout,
            ),
        ]
    }

    fn read_all(config: &JournalConfig) -> Vec<(Header, SessionCommand)> {
        JournalReader::open(config.active_path(), 0, config, decoder())
            .unwrap_or_else(|_| panic!("open reader"))
            .map(|r| r.map(|rec| (rec.header, rec.command)))
            .collect::<Result<_, _>>()
            .unwrap_or_else(|_| panic!("replay"))
    }

    #[test]
    fn test_round_trip_preserves_headers_and_commands() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("session.journal"));
        let records = session_records();
        write_all(&config.active_path(), &config, &records);
        assert_eq!(read_all(&config), records);
    }

    #[test]
    fn test_round_trip_with_every_line_break() {
        let line_breaks = [
            LineBreak::CR,
            LineBreak::LF,
            LineBreak::CR_LF,
            LineBreak::double(b'|', b'#'),
            LineBreak::single(0x1E),
        ];
        for (i, line_break) in line_breaks.into_iter().enumerate() {
            let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
            let mut config = JournalConfig::new(dir.path().join(format!("lb-{i}.journal")));
            config.line_break = line_break;
            config.chunk_maximum_length = 7;
            let records = session_records();
            write_all(&config.active_path(), &config, &records);
            assert_eq!(read_all(&config), records, "line break {line_break}");
        }
    }

    #[test]
    fn test_round_trip_with_every_flush_policy() {
        let policies = [
            FlushPolicy::Manual,
            FlushPolicy::AfterEveryRecord,
            FlushPolicy::SizeThreshold(1),
            FlushPolicy::SizeThreshold(100),
        ];
        for (i, policy) in policies.into_iter().enumerate() {
            let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
            let mut config = JournalConfig::new(dir.path().join(format!("fp-{i}.journal")));
            config.flush_policy = policy;
            config.buffer_capacity = 128;
            let records = session_records();
            write_all(&config.active_path(), &config, &records);
            assert_eq!(read_all(&config), records, "flush policy {policy:?}");
        }
    }

    #[test]
    fn test_config_loaded_from_json_drives_writer_and_reader() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let journal = dir.path().join("from-json.journal");
        let json = format!(
            r#"{{
                "base_path": {:?},
                "line_break": "0x7C23",
                "chunk_maximum_length": 5,
                "flush_policy": "after_every_record",
                "schema_version": 4,
                "application_version": "9.1.0"
            }}"#,
            journal.display().to_string()
        );
        let config_path = dir.path().join("journal.json");
        fs::write(&config_path, json).unwrap_or_else(|_| panic!("write config"));

        let config = JournalConfig::load(&config_path).unwrap_or_else(|_| panic!("load config"));
        assert_eq!(config.line_break, LineBreak::double(b'|', b'#'));
        let records = session_records();
        write_all(&config.active_path(), &config, &records);

        let reader = JournalReader::open(config.active_path(), 0, &config, decoder())
            .unwrap_or_else(|_| panic!("open reader"));
        let schema = reader.schema().cloned().unwrap_or_else(|| panic!("schema header"));
        assert_eq!(schema.schema_version, 4);
        assert_eq!(schema.application_version, "9.1.0");
        assert_eq!(reader.count(), records.len());
    }

    #[test]
    fn test_reading_with_wrong_line_break_fails_loudly() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("crlf.journal"));
        write_all(&config.active_path(), &config, &session_records());

        let mut wrong = config.clone();
        wrong.line_break = LineBreak::single(b'~');
        wrong.slice_maximum_length = 64;
        let result = JournalReader::open(wrong.active_path(), 0, &wrong, decoder());
        assert!(matches!(result, Err(JournalError::SliceTooLong { limit: 64, .. })));
    }

    #[test]
    fn test_older_reader_skips_newer_commands() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("mixed.journal"));
        let mut writer = open_writer(&config.active_path(), &config);
        let mut clock = StampClock::new();
        for i in 0..10u64 {
            let header = Header::upward(clock.next_stamp(), "s");
            let command = if i % 3 == 0 {
                SessionCommand::Ping { nonce: i }
            } else {
                SessionCommand::Message {
                    text: format!("m{i}"),
                    priority: 1,
                }
            };
            writer.accept(&header, &command).unwrap_or_else(|_| panic!("accept"));
        }
        writer.close().unwrap_or_else(|_| panic!("close"));

        let mut legacy = JournalReader::open(config.active_path(), 0, &config, legacy_decoder())
            .unwrap_or_else(|_| panic!("open reader"));
        let commands: Vec<_> = legacy
            .by_ref()
            .map(|r| r.map(|rec| rec.command))
            .collect::<Result<_, _>>()
            .unwrap_or_else(|_| panic!("replay"));
        assert_eq!(commands.len(), 6);
        assert!(commands
            .iter()
            .all(|c| matches!(c, SessionCommand::Message { .. })));
        assert_eq!(legacy.skipped_unknown(), 4);
        assert_eq!(legacy.records_consumed(), 10);

        let current = JournalReader::open(config.active_path(), 0, &config, decoder())
            .unwrap_or_else(|_| panic!("open reader"));
        assert_eq!(current.count(), 10);
    }

    #[test]
    fn test_stamps_replayed_in_append_order() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("ordered.journal"));
        let mut clock = StampClock::new();
        let records: Vec<_> = (0..200)
            .map(|i| {
                (
                    Header::upward(clock.next_at(5_000 + i / 50), "s"),
                    SessionCommand::Logout,
                )
            })
            .collect();
        write_all(&config.active_path(), &config, &records);

        let stamps: Vec<Stamp> = read_all(&config).into_iter().map(|(h, _)| h.stamp).collect();
        assert_eq!(stamps.len(), 200);
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
