//! Pre-processing of raw latency traces into the per-event CSV files the
//! charts read.

pub mod load;
pub mod stats;

pub use load::{EventDurations, Perspective, event_durations, latencies, load_traces};
pub use stats::{chart_csv, compute_stats, stats_csv, write_file};
