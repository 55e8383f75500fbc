// Header normalization: unique, non-empty column names

use super::column::parse_double;
use super::line::split_line;

/// Outcome of header normalization.
#[derive(Debug, Clone)]
pub struct NormalizedHeader {
    pub names: Vec<String>,
    /// True when duplicate names forced the `_NN` suffix pass.
    pub had_duplicates: bool,
}

/// Parse a header line into a unique, non-empty column name vector.
///
/// - If every field is a finite number the file has no header and names
///   become `_Column_0`, `_Column_1`, ...
/// - Empty fields become `_Column_<i>`.
/// - Duplicated names get the `_<ii>` suffix (zero-based occurrence index,
///   zero-padded to two digits) on every occurrence, including the first.
pub fn parse_header_line(header_line: &str, delimiter: char) -> NormalizedHeader {
    let parts = split_line(header_line, delimiter);
    let decimal_comma = delimiter != ',';

    let all_numbers = parts
        .iter()
        .all(|field| parse_double(field, decimal_comma).is_some());

    let mut names: Vec<String> = if all_numbers {
        (0..parts.len()).map(|i| format!("_Column_{}", i)).collect()
    } else {
        parts
            .iter()
            .enumerate()
            .map(|(i, field)| {
                if field.is_empty() {
                    format!("_Column_{}", i)
                } else {
                    field.clone()
                }
            })
            .collect()
    };

    let mut had_duplicates = false;
    for i in 0..names.len() {
        let mut repeated = vec![i];
        for j in (i + 1)..names.len() {
            if names[i] == names[j] {
                repeated.push(j);
            }
        }
        if repeated.len() > 1 {
            had_duplicates = true;
            for index in repeated {
                names[index] = format!("{}_{:02}", names[index], index);
            }
        }
    }

    NormalizedHeader {
        names,
        had_duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_header() {
        let header = parse_header_line("time,x,y,z", ',');
        assert_eq!(header.names, vec!["time", "x", "y", "z"]);
        assert!(!header.had_duplicates);
    }

    #[test]
    fn duplicate_columns_get_suffixes() {
        let header = parse_header_line("x,y,x,y", ',');
        assert_eq!(header.names, vec!["x_00", "y_01", "x_02", "y_03"]);
        assert!(header.had_duplicates);
    }

    #[test]
    fn numeric_first_row_generates_names() {
        let header = parse_header_line("1.0,2.0,3.0", ',');
        assert_eq!(header.names, vec!["_Column_0", "_Column_1", "_Column_2"]);
        assert!(!header.had_duplicates);
    }

    #[test]
    fn single_numeric_field_generates_name() {
        let header = parse_header_line("42", ',');
        assert_eq!(header.names, vec!["_Column_0"]);
    }

    #[test]
    fn empty_fields_get_generated_names() {
        let header = parse_header_line(",x,,z", ',');
        assert_eq!(header.names, vec!["_Column_0", "x", "_Column_2", "z"]);
    }

    #[test]
    fn semicolon_delimiter() {
        let header = parse_header_line("a;b;c", ';');
        assert_eq!(header.names, vec!["a", "b", "c"]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = parse_header_line("x,y,x,y", ',');
        let line = once.names.join(",");
        let twice = parse_header_line(&line, ',');
        assert_eq!(once.names, twice.names);
        assert!(!twice.had_duplicates);
    }
}
