mod common;
mod recovery_tests;
mod round_trip_tests;
mod scale_tests;
