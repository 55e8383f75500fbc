// Timestamp parsing: epoch seconds out of typed cells

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::column::{parse_double, ColumnType, ColumnTypeInfo, TIME_FORMAT};

fn date_to_epoch(date: NaiveDate) -> Option<f64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(midnight.and_utc().timestamp() as f64)
}

fn datetime_to_epoch(dt: NaiveDateTime) -> f64 {
    let utc = dt.and_utc();
    utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9
}

fn time_to_seconds(time: NaiveTime) -> f64 {
    use chrono::Timelike;
    f64::from(time.num_seconds_from_midnight()) + f64::from(time.nanosecond()) * 1e-9
}

/// Parse a cell according to its column's detected type.
///
/// - `Number`: epoch seconds, full float precision.
/// - `DateOnly`: midnight UTC of the parsed date.
/// - `TimeOnly`: seconds since midnight, not an absolute epoch.
/// - `DateTime`: UTC epoch seconds with fractional part.
///
/// `String` and `Undefined` columns never produce a timestamp.
pub fn parse_with_type(cell: &str, info: &ColumnTypeInfo, decimal_comma: bool) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }

    match info.kind {
        ColumnType::Number => parse_double(s, decimal_comma),
        ColumnType::DateOnly => {
            let date = NaiveDate::parse_from_str(s, &info.format).ok()?;
            date_to_epoch(date)
        }
        ColumnType::TimeOnly => {
            let time = NaiveTime::parse_from_str(s, TIME_FORMAT).ok()?;
            Some(time_to_seconds(time))
        }
        ColumnType::DateTime => {
            let stripped = s.strip_suffix('Z').unwrap_or(s);
            let dt = NaiveDateTime::parse_from_str(stripped, &info.format).ok()?;
            Some(datetime_to_epoch(dt))
        }
        ColumnType::String | ColumnType::Undefined => None,
    }
}

/// Parse a cell with a caller-supplied strftime format, interpreted as UTC.
///
/// Tried as a full datetime first, then as a date (midnight UTC), then as a
/// wall-clock time (seconds since midnight).
pub fn parse_custom_format(cell: &str, format: &str) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() || format.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
        return Some(datetime_to_epoch(dt));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, format) {
        return date_to_epoch(date);
    }
    if let Ok(time) = NaiveTime::parse_from_str(s, format) {
        return Some(time_to_seconds(time));
    }
    None
}

/// Compose a date cell and a time cell into one UTC epoch timestamp.
/// Fractional time contributes sub-second precision.
pub fn parse_combined_date_time(
    date_cell: &str,
    time_cell: &str,
    date_info: &ColumnTypeInfo,
    _time_info: &ColumnTypeInfo,
) -> Option<f64> {
    let date_str = date_cell.trim();
    let time_str = time_cell.trim();
    if date_str.is_empty() || time_str.is_empty() {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_str, &date_info.format).ok()?;
    let time = NaiveTime::parse_from_str(time_str, TIME_FORMAT).ok()?;
    Some(datetime_to_epoch(NaiveDateTime::new(date, time)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::csv::column::ColumnType;

    fn info(kind: ColumnType, format: &str) -> ColumnTypeInfo {
        ColumnTypeInfo {
            kind,
            format: format.to_owned(),
            has_fractional: false,
        }
    }

    #[test]
    fn date_only_returns_midnight_epoch() {
        let result = parse_with_type("2024-01-15", &info(ColumnType::DateOnly, "%Y-%m-%d"), false);
        assert!((result.unwrap() - 1705276800.0).abs() < 1.0);
    }

    #[test]
    fn time_only_returns_seconds_from_midnight() {
        let result = parse_with_type("14:30:25", &info(ColumnType::TimeOnly, "%H:%M:%S"), false);
        assert_eq!(result.unwrap(), 52225.0);
    }

    #[test]
    fn time_only_fractional_seconds() {
        let result = parse_with_type("10:30:25.500", &info(ColumnType::TimeOnly, "%H:%M:%S"), false);
        assert!((result.unwrap() - 37825.5).abs() < 1e-3);
    }

    #[test]
    fn datetime_with_zulu_suffix() {
        let fmt = "%Y-%m-%dT%H:%M:%S%.f";
        let result = parse_with_type("2023-06-15T14:30:00Z", &info(ColumnType::DateTime, fmt), false);
        let ts = result.unwrap();
        assert!(ts > 1686800000.0 && ts < 1686900000.0);
    }

    #[test]
    fn number_keeps_precision() {
        let result = parse_with_type(
            "1700000000.123456789",
            &info(ColumnType::Number, ""),
            false,
        );
        assert!((result.unwrap() - 1700000000.123456789).abs() < 1e-6);
    }

    #[test]
    fn string_columns_are_rejected() {
        assert!(parse_with_type("hello", &info(ColumnType::String, ""), false).is_none());
        assert!(parse_with_type("1.0", &info(ColumnType::Undefined, ""), false).is_none());
    }

    #[test]
    fn custom_format_datetime() {
        let ts = parse_custom_format("15/06/2023 14:30:00", "%d/%m/%Y %H:%M:%S").unwrap();
        assert!(ts > 1686800000.0 && ts < 1686900000.0);
    }

    #[test]
    fn custom_format_date_only() {
        let ts = parse_custom_format("2024-01-15", "%Y-%m-%d").unwrap();
        assert!((ts - 1705276800.0).abs() < 1.0);
    }

    #[test]
    fn custom_format_mismatch() {
        assert!(parse_custom_format("not-a-date", "%Y-%m-%d").is_none());
    }

    #[test]
    fn combined_basic() {
        let date_info = info(ColumnType::DateOnly, "%Y-%m-%d");
        let time_info = info(ColumnType::TimeOnly, "%H:%M:%S");
        let ts = parse_combined_date_time("2024-01-15", "14:30:25", &date_info, &time_info);
        assert!((ts.unwrap() - 1705329025.0).abs() < 1.0);
    }

    #[test]
    fn combined_fractional_delta() {
        let date_info = info(ColumnType::DateOnly, "%Y-%m-%d");
        let time_info = info(ColumnType::TimeOnly, "%H:%M:%S");
        let r1 = parse_combined_date_time("2024-01-15", "14:30:25.000", &date_info, &time_info);
        let r2 = parse_combined_date_time("2024-01-15", "14:30:25.500", &date_info, &time_info);
        assert!((r2.unwrap() - r1.unwrap() - 0.5).abs() < 1e-3);
    }

    #[test]
    fn combined_invalid_inputs() {
        let date_info = info(ColumnType::DateOnly, "%Y-%m-%d");
        let time_info = info(ColumnType::TimeOnly, "%H:%M:%S");
        assert!(parse_combined_date_time("not-a-date", "14:30:25", &date_info, &time_info).is_none());
        assert!(parse_combined_date_time("2024-01-15", "bad-time", &date_info, &time_info).is_none());
        assert!(parse_combined_date_time("", "14:30:25", &date_info, &time_info).is_none());
        assert!(parse_combined_date_time("2024-01-15", "", &date_info, &time_info).is_none());
    }
}
