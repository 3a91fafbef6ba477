use crate::Result;
use crate::trace::load::Durations;
use anyhow::Context;
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Names past this rank are folded into a single `other` line of the chart
/// input.
pub const TOP_EVENTS: usize = 19;

#[derive(Debug, Clone, PartialEq)]
pub struct EventStats {
    /// Mean over every latency, counting latencies without the event as 0.
    pub zerod_mean: f64,
    pub occurrences: usize,
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Statistics per event name, ranked by `zerod_mean` (largest first).
pub fn compute_stats(durations: &Durations, num_latencies: usize) -> Vec<(String, EventStats)> {
    let mut out: Vec<(String, EventStats)> = durations
        .iter()
        .map(|(name, values)| (name.clone(), event_stats(values, num_latencies)))
        .collect();

    out.sort_by(|a, b| {
        b.1.zerod_mean
            .partial_cmp(&a.1.zerod_mean)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    out
}

fn event_stats(values: &[f64], num_latencies: usize) -> EventStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let total: f64 = values.iter().sum();
    let padded = num_latencies.max(values.len());
    EventStats {
        zerod_mean: if padded == 0 { f64::NAN } else { total / padded as f64 },
        occurrences: values.len(),
        mean: if values.is_empty() { f64::NAN } else { total / values.len() as f64 },
        median: percentile(&sorted, 50.0),
        p25: percentile(&sorted, 25.0),
        p75: percentile(&sorted, 75.0),
        p90: percentile(&sorted, 90.0),
        p99: percentile(&sorted, 99.0),
    }
}

/// Linear-interpolated percentile of an ascending slice; NaN when empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Chart input has no quoting: the reader splits each line on its first
/// comma, so commas and line breaks in names are replaced.
fn chart_key(s: &str) -> String {
    s.replace(',', ";").replace(['\n', '\r'], " ")
}

/// Chart input: `name,zerod_mean` for the top names plus one `other` line.
pub fn chart_csv(ranked: &[(String, EventStats)]) -> String {
    let mut out = String::new();
    for (name, stats) in ranked.iter().take(TOP_EVENTS) {
        let _ = writeln!(out, "{},{}", chart_key(name), stats.zerod_mean);
    }
    if ranked.len() > TOP_EVENTS {
        let other: f64 = ranked[TOP_EVENTS..].iter().map(|(_, s)| s.zerod_mean).sum();
        let _ = writeln!(out, "other,{}", other);
    }
    out
}

/// Full statistics table with a header row.
pub fn stats_csv(ranked: &[(String, EventStats)]) -> String {
    let mut out = String::from(
        "Name,Mean Across All Latencies,Mean,Median,25th Percentile,75th Percentile,90th Percentile,99th Percentile,Occurrences\n",
    );
    for (name, s) in ranked {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            csv_field(name),
            s.zerod_mean,
            s.mean,
            s.median,
            s.p25,
            s.p75,
            s.p90,
            s.p99,
            s.occurrences
        );
    }
    out
}

pub fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    #[test]
    fn percentile_interpolates_linearly() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 50.0), 2.5);
        assert_eq!(percentile(&v, 25.0), 1.75);
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
        assert_eq!(percentile(&[7.0], 99.0), 7.0);
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn zerod_mean_pads_missing_latencies() {
        let mut d: Durations = IndexMap::new();
        d.insert("Paint".into(), vec![4.0, 2.0]);
        d.insert("Input".into(), vec![9.0]);
        let ranked = compute_stats(&d, 4);

        assert_eq!(ranked[0].0, "Input");
        assert_eq!(ranked[0].1.zerod_mean, 2.25);
        assert_eq!(ranked[1].1.zerod_mean, 1.5);
        assert_eq!(ranked[1].1.mean, 3.0);
        assert_eq!(ranked[1].1.median, 3.0);
        assert_eq!(ranked[1].1.occurrences, 2);
    }

    #[test]
    fn empty_durations_give_nan_stats() {
        let mut d: Durations = IndexMap::new();
        d.insert("Layout".into(), vec![]);
        let ranked = compute_stats(&d, 3);
        assert_eq!(ranked[0].1.zerod_mean, 0.0);
        assert!(ranked[0].1.mean.is_nan());
        assert!(ranked[0].1.p99.is_nan());
    }

    #[test]
    fn chart_csv_folds_tail_into_other() {
        let mut d: Durations = IndexMap::new();
        for i in 0..22 {
            d.insert(format!("e{:02}", i), vec![(100 - i) as f64]);
        }
        let ranked = compute_stats(&d, 1);
        let csv = chart_csv(&ranked);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), TOP_EVENTS + 1);
        assert_eq!(lines[0], "e00,100");
        assert_eq!(lines[18], "e18,82");
        // e19..e21: 81 + 80 + 79
        assert_eq!(lines[19], "other,240");
    }

    #[test]
    fn chart_csv_is_readable_by_the_series_parser() {
        use crate::series::{ParseMode, parse_series};

        let mut d: Durations = IndexMap::new();
        d.insert("a".into(), vec![1.5]);
        d.insert("b".into(), vec![0.5]);
        let csv = chart_csv(&compute_stats(&d, 1));
        let table = parse_series(&csv, ParseMode::Strict).unwrap();
        assert_eq!(table.get("a"), Some(1.5));
        assert_eq!(table.get("b"), Some(0.5));
    }

    #[test]
    fn chart_csv_names_with_commas_survive_the_series_parser() {
        use crate::series::{ParseMode, parse_series};

        let mut d: Durations = IndexMap::new();
        d.insert("Paint, Composite".into(), vec![2.0]);
        d.insert("Input\nKey".into(), vec![1.0]);
        let csv = chart_csv(&compute_stats(&d, 1));
        assert_eq!(csv, "Paint; Composite,2\nInput Key,1\n");

        let table = parse_series(&csv, ParseMode::Strict).unwrap();
        assert_eq!(table.get("Paint; Composite"), Some(2.0));
        assert_eq!(table.get("Input Key"), Some(1.0));
        assert_eq!(table.len(), 2);

        let lenient = parse_series(&csv, ParseMode::Lenient).unwrap();
        assert_eq!(lenient.get("Paint; Composite"), Some(2.0));
    }

    #[test]
    fn stats_csv_has_header_and_quotes_names() {
        let mut d: Durations = IndexMap::new();
        d.insert("Paint, Composite".into(), vec![2.0]);
        let csv = stats_csv(&compute_stats(&d, 1));
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("Name,Mean Across All Latencies"));
        assert_eq!(lines[1], "\"Paint, Composite\",2,2,2,2,2,2,2,1");
    }

    #[test]
    fn write_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.csv");
        let err = write_file(&path, "a,1\n").unwrap_err();
        assert!(err.to_string().contains("x.csv"));
    }
}
