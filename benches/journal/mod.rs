mod round_trip;

pub use round_trip::register_benchmarks;
