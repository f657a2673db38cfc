#[cfg(test)]
mod tests_scale {
    use crate::common::{SessionCommand, decoder, open_writer};
    use journal_rs::journal::{Header, JournalConfig, JournalReader, Stamp};

    const RECORDS: u64 = 1_000_000;

    fn record(i: u64) -> (Header, SessionCommand) {
        (
            Header::upward(Stamp::new(1_700_000_000_000 + i / 1_000, (i % 1_000) as u32), "load"),
            SessionCommand::Message {
                text: format!("payload {i}"),
                priority: (i % 7) as i64,
            },
        )
    }

    #[test]
    fn test_one_million_records_round_trip() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let mut config = JournalConfig::new(dir.path().join("large.journal"));
        config.chunk_maximum_length = 4 * 1024;
        config.slice_maximum_length = 256;

        let mut writer = open_writer(&config.active_path(), &config);
        for i in 0..RECORDS {
            let (header, command) = record(i);
            writer.accept(&header, &command).unwrap_or_else(|_| panic!("accept"));
        }
        assert_eq!(writer.records_written(), RECORDS);
        writer.close().unwrap_or_else(|_| panic!("close"));

        let mut reader = JournalReader::open(config.active_path(), 0, &config, decoder())
            .unwrap_or_else(|_| panic!("open reader"));
        let mut expected = 0u64;
        for replayed in reader.by_ref() {
            let replayed = replayed.unwrap_or_else(|_| panic!("record"));
            let (header, command) = record(expected);
            assert_eq!(replayed.header, header, "record {expected}");
            assert_eq!(replayed.command, command, "record {expected}");
            expected += 1;
        }
        assert_eq!(expected, RECORDS);
        assert!(reader.is_finished());
        assert_eq!(reader.records_consumed(), RECORDS);
    }

    #[test]
    fn test_resume_deep_into_a_large_journal() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| panic!("tempdir"));
        let config = JournalConfig::new(dir.path().join("resume.journal"));
        let total = 50_000u64;
        let mut writer = open_writer(&config.active_path(), &config);
        for i in 0..total {
            let (header, command) = record(i);
            writer.accept(&header, &command).unwrap_or_else(|_| panic!("accept"));
        }
        writer.close().unwrap_or_else(|_| panic!("close"));

        let start = 49_990u64;
        let reader = JournalReader::open(config.active_path(), start, &config, decoder())
            .unwrap_or_else(|_| panic!("open reader"));
        let tail: Vec<_> = reader
            .map(|r| r.map(|rec| rec.command))
            .collect::<Result<_, _>>()
            .unwrap_or_else(|_| panic!("replay"));
        assert_eq!(tail.len(), 10);
        assert_eq!(tail[0], record(start).1);
    }
}
