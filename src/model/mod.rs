//! Aggregation model: merge the per-label series of one event into a single
//! table with one row per event key and one column per label.

use crate::series::SeriesTable;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// The three fixed columns of an event chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    All = 0,
    Queue = 1,
    Handle = 2,
}

impl Label {
    /// Column order; also the fetch order for an event.
    pub const ALL: [Label; 3] = [Label::All, Label::Queue, Label::Handle];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Queue => "queue",
            Self::Handle => "handle",
        }
    }
}

/// Colors handed out to rows by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(Vec<String>);

impl Palette {
    /// Returns None for an empty color list.
    pub fn new(colors: Vec<String>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self(colors))
        }
    }

    /// Color for the row at `index`, cycling past the end of the list.
    pub fn color(&self, index: usize) -> &str {
        &self.0[index % self.0.len()]
    }

    pub fn colors(&self) -> &[String] {
        &self.0
    }
}

impl Default for Palette {
    // Generated from http://tools.medialab.sciences-po.fr/iwanthue/
    fn default() -> Self {
        const COLORS: [&str; 30] = [
            "#a1455d", "#e27d8f", "#dc425b", "#ac4b3b", "#d94b2d", "#e39771", "#c7682b",
            "#e19a37", "#8f6631", "#ab8d37", "#bdba39", "#acb16c", "#65702b", "#82a339",
            "#489a31", "#3c7832", "#62c656", "#64b776", "#3a8864", "#5acea3", "#41bab2",
            "#4dbcdf", "#6291d3", "#5c6fda", "#6d64aa", "#9358ca", "#d18ecf", "#cb59c4",
            "#9c4d87", "#d74590",
        ];
        Self(COLORS.iter().map(|c| c.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub key: String,
    /// Indexed by `Label::index`. NaN serializes as `null`.
    pub values: [f64; 3],
    pub color: String,
}

impl AggregatedRow {
    pub fn value(&self, label: Label) -> f64 {
        self.values[label.index()]
    }
}

/// Rows in first-seen key order, plus the display name of each column.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedTable {
    pub labels: [String; 3],
    rows: IndexMap<String, AggregatedRow>,
}

impl Default for AggregatedTable {
    fn default() -> Self {
        Self {
            labels: Label::ALL.map(|l| l.as_str().to_string()),
            rows: IndexMap::new(),
        }
    }
}

impl AggregatedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `series` into the `label` column.
    ///
    /// Unknown keys get a new `(0, 0, 0)` row at the end; known keys are
    /// overwritten in place. Every touched row is recolored by position.
    pub fn merge(&mut self, series: &SeriesTable, label: Label, palette: &Palette) {
        for (key, value) in series.iter() {
            let entry = self.rows.entry(key.to_string());
            let index = entry.index();
            let row = entry.or_insert_with(|| AggregatedRow {
                key: key.to_string(),
                values: [0.0; 3],
                color: String::new(),
            });
            row.values[label.index()] = value;
            row.color = palette.color(index).to_string();
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &AggregatedRow> {
        self.rows.values()
    }

    pub fn row(&self, key: &str) -> Option<&AggregatedRow> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Column sum, counting NaN as 0.
    pub fn column_total(&self, label: Label) -> f64 {
        self.rows()
            .map(|r| r.value(label))
            .filter(|v| !v.is_nan())
            .sum()
    }
}

impl Serialize for AggregatedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            labels: &'a [String; 3],
            rows: Vec<&'a AggregatedRow>,
        }

        Wire {
            labels: &self.labels,
            rows: self.rows.values().collect(),
        }
        .serialize(serializer)
    }
}

/// Per-label totals of a raw table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub totals: [f64; 3],
    /// `queue` and `handle` totals as a fraction of the `all` total.
    pub queue_share: f64,
    pub handle_share: f64,
}

impl Summary {
    pub fn from_raw(raw: &AggregatedTable) -> Self {
        let totals = Label::ALL.map(|l| raw.column_total(l));
        let all = totals[Label::All.index()];
        let share = |v: f64| if all == 0.0 { f64::NAN } else { v / all };
        Self {
            totals,
            queue_share: share(totals[Label::Queue.index()]),
            handle_share: share(totals[Label::Handle.index()]),
        }
    }

    pub fn total(&self, label: Label) -> f64 {
        self.totals[label.index()]
    }

    /// Column names with totals folded in, e.g. `queue (100.0 ms, 8.1%)`.
    pub fn decorated_labels(&self) -> [String; 3] {
        Label::ALL.map(|label| match label {
            Label::All => format!("all ({:.1} ms)", self.total(label)),
            Label::Queue => format!(
                "queue ({:.1} ms, {})",
                self.total(label),
                percent(self.queue_share)
            ),
            Label::Handle => format!(
                "handle ({:.1} ms, {})",
                self.total(label),
                percent(self.handle_share)
            ),
        })
    }
}

fn percent(share: f64) -> String {
    if share.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.1}%", share * 100.0)
    }
}
