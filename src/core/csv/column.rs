// Per-column type inference

use chrono::{NaiveDate, NaiveTime};

/// What a column holds, decided by its first non-empty cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnType {
    #[default]
    Undefined,
    Number,
    String,
    DateOnly,
    TimeOnly,
    DateTime,
}

/// Detected type plus the strftime format that matched (for calendar
/// types) and whether the time component carries fractional seconds.
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeInfo {
    pub kind: ColumnType,
    pub format: String,
    pub has_fractional: bool,
}

impl ColumnTypeInfo {
    pub fn new(kind: ColumnType) -> Self {
        Self {
            kind,
            format: String::new(),
            has_fractional: false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.kind == ColumnType::Undefined
    }
}

/// Two adjacent columns, one date-only and one time-only, usable jointly
/// as the file's time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedColumnPair {
    pub date_column_index: usize,
    pub time_column_index: usize,
    /// Display name, date column first regardless of on-disk order.
    pub virtual_name: String,
}

pub(crate) const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Parse a numeric literal: decimal floats, scientific notation, hex
/// (`0x...`), and the European comma decimal separator when `decimal_comma`
/// is allowed. The whole cell must be consumed and the value finite.
pub fn parse_double(cell: &str, decimal_comma: bool) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }

    if let Ok(v) = s.parse::<f64>() {
        if v.is_finite() {
            return Some(v);
        }
        return None;
    }

    if decimal_comma && s.contains(',') {
        if let Ok(v) = s.replace(',', ".").parse::<f64>() {
            if v.is_finite() {
                return Some(v);
            }
        }
    }

    None
}

fn detect_date_format(s: &str) -> Option<&'static str> {
    let sep = if s.contains('-') {
        '-'
    } else if s.contains('/') {
        '/'
    } else {
        return None;
    };

    let comps: Vec<&str> = s.split(sep).collect();
    if comps.len() != 3 {
        return None;
    }
    if comps
        .iter()
        .any(|c| c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let fmt = if comps[0].len() == 4 {
        if sep == '-' {
            "%Y-%m-%d"
        } else {
            "%Y/%m/%d"
        }
    } else if sep == '/' && comps[2].len() == 4 {
        // Day-first unless the second component forces month-first
        let first: u32 = comps[0].parse().ok()?;
        let second: u32 = comps[1].parse().ok()?;
        if first > 12 {
            "%d/%m/%Y"
        } else if second > 12 {
            "%m/%d/%Y"
        } else {
            "%d/%m/%Y"
        }
    } else {
        return None;
    };

    NaiveDate::parse_from_str(s, fmt).ok()?;
    Some(fmt)
}

fn detect_time(s: &str) -> Option<ColumnTypeInfo> {
    if s.bytes().filter(|&b| b == b':').count() != 2 {
        return None;
    }
    NaiveTime::parse_from_str(s, TIME_FORMAT).ok()?;
    Some(ColumnTypeInfo {
        kind: ColumnType::TimeOnly,
        format: "%H:%M:%S".to_owned(),
        has_fractional: s.contains('.'),
    })
}

fn detect_datetime(s: &str) -> Option<ColumnTypeInfo> {
    let trimmed = s.strip_suffix('Z').unwrap_or(s);

    let (sep, split_at) = if let Some(i) = trimmed.find('T') {
        ('T', i)
    } else if let Some(i) = trimmed.find(' ') {
        (' ', i)
    } else {
        return None;
    };

    let date_part = &trimmed[..split_at];
    let time_part = &trimmed[split_at + 1..];

    let date_fmt = detect_date_format(date_part)?;
    NaiveTime::parse_from_str(time_part, TIME_FORMAT).ok()?;

    Some(ColumnTypeInfo {
        kind: ColumnType::DateTime,
        format: format!("{}{}{}", date_fmt, sep, TIME_FORMAT),
        has_fractional: time_part.contains('.'),
    })
}

/// Infer a cell's type. Priority: datetime, date, time, number, string.
///
/// `decimal_comma` permits `1,5` as a numeric literal; it must be false
/// when the file delimiter is the comma itself.
pub fn detect_column_type(cell: &str, decimal_comma: bool) -> ColumnTypeInfo {
    let s = cell.trim();

    if let Some(info) = detect_datetime(s) {
        return info;
    }

    if let Some(fmt) = detect_date_format(s) {
        return ColumnTypeInfo {
            kind: ColumnType::DateOnly,
            format: fmt.to_owned(),
            has_fractional: false,
        };
    }

    if let Some(info) = detect_time(s) {
        return info;
    }

    if parse_double(s, decimal_comma).is_some() {
        return ColumnTypeInfo::new(ColumnType::Number);
    }

    ColumnTypeInfo::new(ColumnType::String)
}

/// Scan column types left to right for adjacent date+time pairs (either
/// on-disk order). Pairs do not overlap: the second column of a match is
/// skipped.
pub fn detect_combined_datetime_columns(
    column_names: &[String],
    column_types: &[ColumnTypeInfo],
) -> Vec<CombinedColumnPair> {
    let mut pairs = Vec::new();

    let mut i = 0;
    while i + 1 < column_types.len() {
        let (date_idx, time_idx) = match (column_types[i].kind, column_types[i + 1].kind) {
            (ColumnType::DateOnly, ColumnType::TimeOnly) => (i, i + 1),
            (ColumnType::TimeOnly, ColumnType::DateOnly) => (i + 1, i),
            _ => {
                i += 1;
                continue;
            }
        };

        pairs.push(CombinedColumnPair {
            date_column_index: date_idx,
            time_column_index: time_idx,
            virtual_name: format!("{} + {}", column_names[date_idx], column_names[time_idx]),
        });
        i += 2;
    }

    pairs
}
