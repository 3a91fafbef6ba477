use crate::Result;
use anyhow::Context;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use tracing::{debug, warn};

/// One JSON line of the trace dump.
#[derive(Debug, Clone, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub failures: Vec<serde_json::Value>,

    #[serde(default)]
    pub pairs: Pairs,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pairs {
    #[serde(rename = "Latencies", default)]
    pub latencies: Vec<Latency>,
}

/// Event durations (ms) of one input latency, split by phase and attribution.
/// A `null` duration means the event occurred without a measurement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Latency {
    #[serde(rename = "Queue Events Bottom-Up", default)]
    pub queue_bottom_up: IndexMap<String, Option<f64>>,

    #[serde(rename = "Handling Events Bottom-Up", default)]
    pub handle_bottom_up: IndexMap<String, Option<f64>>,

    #[serde(rename = "Queue Events Top-Down", default)]
    pub queue_top_down: IndexMap<String, Option<f64>>,

    #[serde(rename = "Handling Events Top-Down", default)]
    pub handle_top_down: IndexMap<String, Option<f64>>,
}

/// How event time is attributed inside a latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    BottomUp,
    TopDown,
}

impl Perspective {
    pub const ALL: [Perspective; 2] = [Perspective::BottomUp, Perspective::TopDown];

    /// Appended to the event name of the output files.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::BottomUp => "",
            Self::TopDown => "_top_down",
        }
    }
}

impl Latency {
    fn queue(&self, p: Perspective) -> &IndexMap<String, Option<f64>> {
        match p {
            Perspective::BottomUp => &self.queue_bottom_up,
            Perspective::TopDown => &self.queue_top_down,
        }
    }

    fn handle(&self, p: Perspective) -> &IndexMap<String, Option<f64>> {
        match p {
            Perspective::BottomUp => &self.handle_bottom_up,
            Perspective::TopDown => &self.handle_top_down,
        }
    }
}

/// Durations per event name, one entry per latency the event was measured in.
pub type Durations = IndexMap<String, Vec<f64>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDurations {
    pub queue: Durations,
    pub handle: Durations,
    pub all: Durations,
}

/// Read a JSON-lines trace dump.
///
/// Lines that are not valid JSON are skipped with a warning. Traces that
/// recorded failures or carry no latencies are dropped.
pub fn load_traces(path: &str) -> Result<Vec<Trace>> {
    let text = fs::read_to_string(path).with_context(|| format!("read trace file {}", path))?;

    let mut out = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let trace: Trace = match serde_json::from_str(line) {
            Ok(t) => t,
            Err(e) => {
                warn!(path, line = lineno + 1, error = %e, "failed to load trace");
                continue;
            }
        };
        if trace.failures.is_empty() && !trace.pairs.latencies.is_empty() {
            out.push(trace);
        }
    }

    debug!(path, traces = out.len(), "loaded traces");
    Ok(out)
}

/// All latencies across all traces, in file order.
pub fn latencies(traces: &[Trace]) -> Vec<&Latency> {
    traces.iter().flat_map(|t| t.pairs.latencies.iter()).collect()
}

/// Group event durations by name.
///
/// `queue` and `handle` keep each measured duration. `all` records, for every
/// latency in which the name occurs in either phase, the sum of its queue and
/// handle durations in that latency.
pub fn event_durations(latencies: &[&Latency], p: Perspective) -> EventDurations {
    let mut out = EventDurations::default();

    for latency in latencies {
        for (name, d) in latency.queue(p) {
            let entry = out.queue.entry(name.clone()).or_default();
            if let Some(d) = d {
                entry.push(*d);
            }
        }
        for (name, d) in latency.handle(p) {
            let entry = out.handle.entry(name.clone()).or_default();
            if let Some(d) = d {
                entry.push(*d);
            }
        }
    }

    let names: Vec<String> = out
        .queue
        .keys()
        .chain(out.handle.keys())
        .cloned()
        .collect();
    for name in names {
        if out.all.contains_key(&name) {
            continue;
        }
        let mut sums = Vec::new();
        for latency in latencies {
            let q = latency.queue(p).get(&name);
            let h = latency.handle(p).get(&name);
            if q.is_none() && h.is_none() {
                continue;
            }
            let sum = q.copied().flatten().unwrap_or(0.0) + h.copied().flatten().unwrap_or(0.0);
            sums.push(sum);
        }
        out.all.insert(name, sums);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    const TRACES: &str = r#"{"failures": [], "pairs": {"Latencies": [{"Queue Events Bottom-Up": {"Paint": 2.0, "Layout": null}, "Handling Events Bottom-Up": {"Paint": 3.0, "Input": 1.5}, "Queue Events Top-Down": {"Frame": 4.0}, "Handling Events Top-Down": {}}]}}
not json at all
{"failures": ["timeout"], "pairs": {"Latencies": [{"Queue Events Bottom-Up": {"Paint": 100.0}}]}}
{"failures": [], "pairs": {"Latencies": []}}
{"failures": [], "pairs": {"Latencies": [{"Queue Events Bottom-Up": {"Paint": 1.0}, "Handling Events Bottom-Up": {}}]}}
"#;

    fn write_traces() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TRACES.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_skips_bad_and_failed_traces() {
        let file = write_traces();
        let traces = load_traces(file.path().to_str().unwrap()).unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(latencies(&traces).len(), 2);
    }

    #[test]
    fn bottom_up_durations_by_phase() {
        let file = write_traces();
        let traces = load_traces(file.path().to_str().unwrap()).unwrap();
        let d = event_durations(&latencies(&traces), Perspective::BottomUp);

        assert_eq!(d.queue["Paint"], vec![2.0, 1.0]);
        assert_eq!(d.queue["Layout"], Vec::<f64>::new());
        assert_eq!(d.handle["Paint"], vec![3.0]);
        assert_eq!(d.handle["Input"], vec![1.5]);
        // per-latency sums, not a running total
        assert_eq!(d.all["Paint"], vec![5.0, 1.0]);
        assert_eq!(d.all["Layout"], vec![0.0]);
        assert_eq!(d.all["Input"], vec![1.5]);
        assert_eq!(
            d.all.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Paint", "Layout", "Input"]
        );
    }

    #[test]
    fn top_down_reads_its_own_maps() {
        let file = write_traces();
        let traces = load_traces(file.path().to_str().unwrap()).unwrap();
        let d = event_durations(&latencies(&traces), Perspective::TopDown);
        assert_eq!(d.queue["Frame"], vec![4.0]);
        assert!(d.handle.is_empty());
        assert_eq!(d.all["Frame"], vec![4.0]);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_traces("/nonexistent/traces.jsonl").is_err());
    }
}
