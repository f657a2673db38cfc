use crate::records::{OrderCodec, make_record};
use criterion::{BenchmarkId, Criterion};
use journal_rs::journal::{
    FlushPolicy, HeaderCodec, JournalConfig, JournalReader, JournalWriter, RecordDecoder,
    RecordEncoder,
};
use std::hint::black_box;
use std::path::Path;

fn write_journal(path: &Path, config: &JournalConfig, count: u64) {
    let encoder = RecordEncoder::new(HeaderCodec, OrderCodec, config.line_break);
    let mut writer = JournalWriter::create(path, config, encoder)
        .expect("journal creation must succeed in bench setup");
    for i in 0..count {
        let (header, order) = make_record(i);
        writer
            .accept(&header, &order)
            .expect("accept must succeed in bench");
    }
    writer.close().expect("close must succeed in bench");
}

/// Register write and replay benchmarks for whole journals.
pub fn register_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("Journal");
    group.sample_size(20);

    for &policy in &[FlushPolicy::Manual, FlushPolicy::SizeThreshold(16 * 1024)] {
        group.bench_with_input(
            BenchmarkId::new("write_10k", format!("{policy:?}")),
            &policy,
            |b, &policy| {
                b.iter_with_setup(
                    || {
                        let dir = tempfile::tempdir().expect("tempdir");
                        let mut config = JournalConfig::new(dir.path().join("bench.journal"));
                        config.flush_policy = policy;
                        (dir, config)
                    },
                    |(dir, config)| {
                        write_journal(&config.active_path(), &config, 10_000);
                        drop(dir);
                    },
                )
            },
        );
    }

    let dir = tempfile::tempdir().expect("tempdir");
    let config = JournalConfig::new(dir.path().join("replay.journal"));
    write_journal(&config.active_path(), &config, 10_000);

    group.bench_function("replay_10k", |b| {
        b.iter(|| {
            let reader = JournalReader::open(
                config.active_path(),
                0,
                &config,
                RecordDecoder::new(HeaderCodec, OrderCodec),
            )
            .expect("reader must open in bench");
            black_box(reader.filter(Result::is_ok).count())
        })
    });

    group.bench_function("skip_to_last_100_of_10k", |b| {
        b.iter(|| {
            let reader = JournalReader::open(
                config.active_path(),
                9_900,
                &config,
                RecordDecoder::new(HeaderCodec, OrderCodec),
            )
            .expect("reader must open in bench");
            black_box(reader.count())
        })
    });

    group.finish();
}
