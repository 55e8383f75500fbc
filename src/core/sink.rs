// Plot data sink: named series owned by the host, appended by the cores

use std::collections::{BTreeMap, HashMap};

/// Compact handle into a [`StringSeries`] dictionary.
///
/// `INVALID` is a documented sentinel and round-trips through storage;
/// every other value is a stable dictionary slot for the series' lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringDictIndex(u32);

impl StringDictIndex {
    pub const INVALID: StringDictIndex = StringDictIndex(u32::MAX);

    pub fn new(index: u32) -> Self {
        StringDictIndex(index)
    }

    pub fn is_valid(&self) -> bool {
        self.0 != u32::MAX
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for StringDictIndex {
    fn default() -> Self {
        StringDictIndex::INVALID
    }
}

/// Ordered `(timestamp, value)` series of doubles.
#[derive(Debug, Clone)]
pub struct NumericSeries {
    name: String,
    points: Vec<(f64, f64)>,
}

impl NumericSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&mut self, point: (f64, f64)) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// Ordered `(timestamp, string)` series with interned storage.
///
/// Series dominated by repeated labels store each distinct string once; the
/// point list only carries dictionary indices.
#[derive(Debug, Clone)]
pub struct StringSeries {
    name: String,
    points: Vec<(f64, StringDictIndex)>,
    index_to_string: Vec<String>,
    string_to_index: HashMap<String, u32>,
}

impl StringSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            index_to_string: Vec::new(),
            string_to_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Intern `value` and append its index at time `t`. Empty strings are
    /// dropped.
    pub fn push(&mut self, point: (f64, &str)) {
        let (t, value) = point;
        if value.is_empty() {
            return;
        }
        let idx = self.intern(value);
        self.points.push((t, idx));
    }

    pub fn points(&self) -> &[(f64, StringDictIndex)] {
        &self.points
    }

    /// Resolve a dictionary index back to its string. Invalid or
    /// out-of-range indices resolve to the empty string.
    pub fn get_string(&self, idx: StringDictIndex) -> &str {
        if !idx.is_valid() {
            return "";
        }
        self.index_to_string
            .get(idx.value() as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.index_to_string.clear();
        self.string_to_index.clear();
    }

    fn intern(&mut self, value: &str) -> StringDictIndex {
        if let Some(&idx) = self.string_to_index.get(value) {
            return StringDictIndex::new(idx);
        }
        let new_index = self.index_to_string.len() as u32;
        self.index_to_string.push(value.to_owned());
        self.string_to_index.insert(value.to_owned(), new_index);
        StringDictIndex::new(new_index)
    }
}

/// The store both ingestion cores append into.
///
/// `add_*` returns the existing series when the name is already registered,
/// so repeated calls accumulate points in one timeline.
pub trait PlotSink {
    fn add_numeric(&mut self, name: &str) -> &mut NumericSeries;
    fn add_string(&mut self, name: &str) -> &mut StringSeries;
}

/// In-memory implementation of [`PlotSink`], standing in for the host
/// application's plot-data store in the loader binary and in tests.
#[derive(Debug, Default)]
pub struct PlotDataMap {
    numeric: BTreeMap<String, NumericSeries>,
    strings: BTreeMap<String, StringSeries>,
}

impl PlotDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(&self, name: &str) -> Option<&NumericSeries> {
        self.numeric.get(name)
    }

    pub fn string_series(&self, name: &str) -> Option<&StringSeries> {
        self.strings.get(name)
    }

    pub fn iter_numeric(&self) -> impl Iterator<Item = &NumericSeries> {
        self.numeric.values()
    }

    pub fn iter_strings(&self) -> impl Iterator<Item = &StringSeries> {
        self.strings.values()
    }

    pub fn is_empty(&self) -> bool {
        self.numeric.is_empty() && self.strings.is_empty()
    }

    pub fn clear(&mut self) {
        self.numeric.clear();
        self.strings.clear();
    }
}

impl PlotSink for PlotDataMap {
    fn add_numeric(&mut self, name: &str) -> &mut NumericSeries {
        self.numeric
            .entry(name.to_owned())
            .or_insert_with(|| NumericSeries::new(name))
    }

    fn add_string(&mut self, name: &str) -> &mut StringSeries {
        self.strings
            .entry(name.to_owned())
            .or_insert_with(|| StringSeries::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_reuses_indices() {
        let mut series = StringSeries::new("labels");
        series.push((0.0, "idle"));
        series.push((1.0, "active"));
        series.push((2.0, "idle"));

        assert_eq!(series.len(), 3);
        assert_eq!(series.points()[0].1, series.points()[2].1);
        assert_ne!(series.points()[0].1, series.points()[1].1);
        assert_eq!(series.get_string(series.points()[1].1), "active");
    }

    #[test]
    fn invalid_index_resolves_to_empty() {
        let series = StringSeries::new("labels");
        assert_eq!(series.get_string(StringDictIndex::INVALID), "");
        assert_eq!(series.get_string(StringDictIndex::new(42)), "");
        assert!(!StringDictIndex::default().is_valid());
    }

    #[test]
    fn empty_strings_are_dropped() {
        let mut series = StringSeries::new("labels");
        series.push((0.0, ""));
        assert!(series.is_empty());
    }

    #[test]
    fn sentinel_round_trips() {
        let idx = StringDictIndex::INVALID;
        let stored = idx.value();
        assert_eq!(StringDictIndex::new(stored), StringDictIndex::INVALID);
    }

    #[test]
    fn add_numeric_returns_same_series() {
        let mut map = PlotDataMap::new();
        map.add_numeric("temp").push((0.0, 1.0));
        map.add_numeric("temp").push((1.0, 2.0));
        assert_eq!(map.numeric("temp").unwrap().len(), 2);
    }
}
