use criterion::{criterion_group, criterion_main};

mod journal;

use journal::register_benchmarks as register_journal_benchmarks;
use records::register_benchmarks as register_record_benchmarks;
use slicer::register_benchmarks as register_slicer_benchmarks;

criterion_group!(
    benches,
    register_slicer_benchmarks,
    register_record_benchmarks,
    register_journal_benchmarks,
);

criterion_main!(benches);
