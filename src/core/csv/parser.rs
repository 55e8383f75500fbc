// Streaming CSV row loop

use std::io::{BufRead, Cursor, Seek, SeekFrom};

use super::column::{detect_column_type, ColumnType, ColumnTypeInfo};
use super::header::parse_header_line;
use super::line::split_line;
use super::timestamp::{parse_combined_date_time, parse_custom_format, parse_with_type};
use super::types::{
    CsvColumnData, CsvParseConfig, CsvParseResult, CsvParseWarning, CsvWarningKind,
};

/// Progress callback: `(current_line, total_lines) -> keep_going`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize) -> bool;

/// How often the row loop yields to the progress callback.
const PROGRESS_INTERVAL: usize = 100;

fn read_line<R: BufRead>(input: &mut R, buf: &mut String) -> std::io::Result<bool> {
    buf.clear();
    if input.read_line(buf)? == 0 {
        return Ok(false);
    }
    if buf.ends_with('\n') {
        buf.pop();
    }
    if buf.ends_with('\r') {
        buf.pop();
    }
    Ok(true)
}

/// Count the remaining lines and rewind to the current position.
fn count_remaining_lines<R: BufRead + Seek>(input: &mut R) -> std::io::Result<usize> {
    let pos = input.stream_position()?;
    let mut count = 0;
    let mut line = String::new();
    while read_line(input, &mut line)? {
        count += 1;
    }
    input.seek(SeekFrom::Start(pos))?;
    Ok(count)
}

fn warn(result: &mut CsvParseResult, kind: CsvWarningKind, line_number: usize, detail: String) {
    result.warnings.push(CsvParseWarning {
        kind,
        line_number,
        detail,
    });
}

/// Parse CSV data from a seekable stream into a columnar result.
///
/// Input-shape problems become warnings and the parse continues; a missing
/// header or a cancelled progress callback returns `success = false` with
/// whatever was accumulated so far.
pub fn parse_csv<R: BufRead + Seek>(
    mut input: R,
    config: &CsvParseConfig,
    mut progress: Option<ProgressFn<'_>>,
) -> CsvParseResult {
    let mut result = CsvParseResult::default();
    let mut line = String::new();

    // Skip rows before the header
    for _ in 0..config.skip_rows {
        match read_line(&mut input, &mut line) {
            Ok(true) => {}
            _ => return result,
        }
    }

    // Read header
    match read_line(&mut input, &mut line) {
        Ok(true) => {}
        _ => return result,
    }

    let header = parse_header_line(&line, config.delimiter);
    result.column_names = header.names;
    if header.had_duplicates {
        warn(
            &mut result,
            CsvWarningKind::DuplicateColumnNames,
            config.skip_rows + 1,
            "Duplicate column names detected; suffixes added".to_owned(),
        );
    }

    let num_columns = result.column_names.len();
    result.columns = result
        .column_names
        .iter()
        .map(|name| CsvColumnData {
            name: name.clone(),
            ..Default::default()
        })
        .collect();

    let mut column_types = vec![ColumnTypeInfo::default(); num_columns];

    if let Some(pair) = config.combined_pair() {
        result.combined_component_indices.insert(pair.date_column_index);
        result.combined_component_indices.insert(pair.time_column_index);
    }

    let decimal_comma = config.delimiter != ',';
    let custom_format = config
        .custom_time_format
        .as_deref()
        .filter(|f| !f.is_empty());

    let mut prev_time = f64::MIN;
    let mut line_number = config.skip_rows + 1; // the header was this line
    let mut sample_count = 0usize;

    // Use the caller-provided line count for progress, or count internally
    let mut total_lines = config.total_lines;
    if progress.is_some() && total_lines == 0 {
        match count_remaining_lines(&mut input) {
            Ok(count) => total_lines = count,
            Err(_) => return result,
        }
    }

    loop {
        match read_line(&mut input, &mut line) {
            Ok(true) => {}
            _ => break,
        }
        line_number += 1;

        let parts = split_line(&line, config.delimiter);

        if parts.is_empty() {
            continue;
        }

        if parts.len() != num_columns {
            warn(
                &mut result,
                CsvWarningKind::WrongColumnCount,
                line_number,
                format!("Expected {} columns, got {}", num_columns, parts.len()),
            );
            result.lines_skipped += 1;
            continue;
        }

        // First row with a non-empty cell fixes each column's type
        for i in 0..num_columns {
            if column_types[i].is_undefined() && !parts[i].is_empty() {
                column_types[i] = detect_column_type(&parts[i], decimal_comma);
            }
        }

        // Resolve the timestamp: combined pair, then time column, then row index
        let mut timestamp = sample_count as f64;
        let mut timestamp_valid = false;

        if let Some(pair) = config.combined_pair() {
            let date_val = parts.get(pair.date_column_index).map(String::as_str);
            let time_val = parts.get(pair.time_column_index).map(String::as_str);

            let parsed = match (date_val, time_val) {
                (Some(d), Some(t)) => parse_combined_date_time(
                    d,
                    t,
                    &column_types[pair.date_column_index],
                    &column_types[pair.time_column_index],
                ),
                _ => None,
            };

            match parsed {
                Some(ts) => {
                    timestamp_valid = true;
                    timestamp = ts;
                }
                None => {
                    warn(
                        &mut result,
                        CsvWarningKind::InvalidTimestamp,
                        line_number,
                        format!(
                            "Invalid combined timestamp: \"{}\" + \"{}\"",
                            date_val.unwrap_or(""),
                            time_val.unwrap_or("")
                        ),
                    );
                    result.lines_skipped += 1;
                    continue;
                }
            }
        } else if let Some(time_col) = config.time_column_index.filter(|&i| i < num_columns) {
            let t_str = &parts[time_col];

            let parsed = if let Some(fmt) = custom_format {
                parse_custom_format(t_str, fmt)
            } else if column_types[time_col].kind != ColumnType::String {
                parse_with_type(t_str, &column_types[time_col], decimal_comma)
            } else {
                None
            };

            match parsed {
                Some(ts) => {
                    timestamp_valid = true;
                    timestamp = ts;
                }
                None => {
                    warn(
                        &mut result,
                        CsvWarningKind::InvalidTimestamp,
                        line_number,
                        format!("Invalid timestamp: \"{}\"", t_str),
                    );
                    result.lines_skipped += 1;
                    continue;
                }
            }
        }

        if timestamp_valid {
            if prev_time > timestamp && !result.time_is_non_monotonic {
                result.time_is_non_monotonic = true;
                warn(
                    &mut result,
                    CsvWarningKind::NonMonotonicTime,
                    line_number,
                    "Time is not monotonically increasing".to_owned(),
                );
            }
            prev_time = timestamp;
        }

        // Dispatch cell values
        for i in 0..num_columns {
            if result.combined_component_indices.contains(&i) {
                continue;
            }

            let cell = &parts[i];
            let col_type = &column_types[i];

            if cell.is_empty() || col_type.is_undefined() {
                continue;
            }

            if col_type.kind != ColumnType::String {
                match parse_with_type(cell, col_type, decimal_comma) {
                    Some(value) => result.columns[i].numeric_points.push((timestamp, value)),
                    None => result.columns[i].string_points.push((timestamp, cell.clone())),
                }
            } else {
                result.columns[i].string_points.push((timestamp, cell.clone()));
            }
        }

        sample_count += 1;

        if line_number % PROGRESS_INTERVAL == 0 {
            if let Some(cb) = progress.as_deref_mut() {
                if !cb(line_number, total_lines) {
                    // Cancelled: hand back the partial result
                    result.lines_processed = sample_count;
                    return result;
                }
            }
        }
    }

    for (col, detected) in result.columns.iter_mut().zip(column_types) {
        col.detected_type = detected;
    }

    result.lines_processed = sample_count;
    result.success = true;
    result
}

/// Convenience wrapper for in-memory CSV content.
pub fn parse_csv_str(
    content: &str,
    config: &CsvParseConfig,
    progress: Option<ProgressFn<'_>>,
) -> CsvParseResult {
    parse_csv(Cursor::new(content.as_bytes()), config, progress)
}
