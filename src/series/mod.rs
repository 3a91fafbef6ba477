//! Per-event numeric series: CSV parsing and sum normalization.

pub mod parse;
pub mod table;

pub use parse::{ParseMode, parse_series};
pub use table::{SeriesTable, normalize};
