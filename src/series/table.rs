use indexmap::IndexMap;

/// Numeric series parsed from one CSV payload, keyed by event name.
///
/// Keys keep the position of their first insertion; re-inserting a key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesTable(IndexMap<String, f64>);

impl SeriesTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Sum of all values, counting NaN as 0.
    pub fn sum(&self) -> f64 {
        self.0
            .values()
            .fold(0.0, |acc, v| if v.is_nan() { acc } else { acc + v })
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for SeriesTable {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut table = SeriesTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

/// Scale every value so the table sums to 1.
///
/// NaN entries are skipped when summing and stay NaN. A zero sum turns every
/// value into NaN rather than dividing through to infinities.
pub fn normalize(table: &SeriesTable) -> SeriesTable {
    let sum = table.sum();
    table
        .iter()
        .map(|(k, v)| (k, if sum == 0.0 { f64::NAN } else { v / sum }))
        .collect()
}
