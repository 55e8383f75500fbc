// Configuration and results for CSV parsing

use std::collections::BTreeSet;

use super::column::{ColumnTypeInfo, CombinedColumnPair};
use crate::core::sink::PlotSink;

/// Caller-supplied parse configuration. Read-only during parsing.
#[derive(Debug, Clone)]
pub struct CsvParseConfig {
    pub delimiter: char,
    /// Lines discarded before the header.
    pub skip_rows: usize,
    /// Column holding the time axis. `None` uses the row index as time.
    pub time_column_index: Option<usize>,
    /// strftime format overriding type-directed timestamp parsing.
    pub custom_time_format: Option<String>,
    /// Hint for progress reporting; 0 means unknown.
    pub total_lines: usize,
    /// Detected date+time pairs, in column order.
    pub combined_columns: Vec<CombinedColumnPair>,
    /// Which pair supplies the time axis. Wins over `time_column_index`.
    pub combined_column_index: Option<usize>,
}

impl Default for CsvParseConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            skip_rows: 0,
            time_column_index: None,
            custom_time_format: None,
            total_lines: 0,
            combined_columns: Vec::new(),
            combined_column_index: None,
        }
    }
}

impl CsvParseConfig {
    /// The active combined pair, when configured and in range.
    pub(crate) fn combined_pair(&self) -> Option<&CombinedColumnPair> {
        self.combined_column_index
            .and_then(|i| self.combined_columns.get(i))
    }
}

/// One column's accumulated points. Both lists share the column timeline
/// and can be sparse and interleaved.
#[derive(Debug, Clone, Default)]
pub struct CsvColumnData {
    pub name: String,
    pub numeric_points: Vec<(f64, f64)>,
    pub string_points: Vec<(f64, String)>,
    pub detected_type: ColumnTypeInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvWarningKind {
    WrongColumnCount,
    InvalidTimestamp,
    NonMonotonicTime,
    DuplicateColumnNames,
}

/// A recoverable input-shape problem; the parse continues past it.
#[derive(Debug, Clone)]
pub struct CsvParseWarning {
    pub kind: CsvWarningKind,
    /// 1-based, counting skipped rows and the header.
    pub line_number: usize,
    pub detail: String,
}

/// Everything one parse produced.
#[derive(Debug, Clone, Default)]
pub struct CsvParseResult {
    pub success: bool,
    pub columns: Vec<CsvColumnData>,
    pub column_names: Vec<String>,
    pub warnings: Vec<CsvParseWarning>,
    pub time_is_non_monotonic: bool,
    pub lines_processed: usize,
    pub lines_skipped: usize,
    /// Columns consumed as date/time components; they hold no points.
    pub combined_component_indices: BTreeSet<usize>,
}

impl CsvParseResult {
    pub fn has_warning(&self, kind: CsvWarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Drain the parsed columns into the plot sink.
    ///
    /// Columns with numeric points become numeric series (string fallbacks
    /// from failed per-cell parses are discarded); string-only columns
    /// become string series; columns with no points at all are still
    /// registered as empty numeric series.
    pub fn apply_to(&self, sink: &mut dyn PlotSink) {
        for col in &self.columns {
            let has_numeric = !col.numeric_points.is_empty();
            let has_string = !col.string_points.is_empty();

            if has_numeric {
                let series = sink.add_numeric(&col.name);
                for &point in &col.numeric_points {
                    series.push(point);
                }
            } else if has_string {
                let series = sink.add_string(&col.name);
                for (t, value) in &col.string_points {
                    series.push((*t, value));
                }
            } else {
                sink.add_numeric(&col.name);
            }
        }
    }
}
