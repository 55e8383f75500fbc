// Delimiter detection and quote-aware line splitting

/// Auto-detect the delimiter used in the first line of a file.
///
/// Counts candidate characters outside double-quoted spans. Space only
/// qualifies with at least two runs of consecutive spaces; ties break by
/// fixed priority (tab > semicolon > comma > space). Falls back to comma.
pub fn detect_delimiter(first_line: &str) -> char {
    fn count_outside_quotes(line: &str, delim: char) -> usize {
        let mut count = 0;
        let mut inside_quotes = false;
        for c in line.chars() {
            if c == '"' {
                inside_quotes = !inside_quotes;
            } else if !inside_quotes && c == delim {
                count += 1;
            }
        }
        count
    }

    let comma_count = count_outside_quotes(first_line, ',');
    let semicolon_count = count_outside_quotes(first_line, ';');
    let tab_count = count_outside_quotes(first_line, '\t');

    // Consecutive spaces count as a single delimiter
    let mut space_count = 0;
    {
        let mut inside_quotes = false;
        let mut prev_was_space = false;
        for c in first_line.chars() {
            if c == '"' {
                inside_quotes = !inside_quotes;
                prev_was_space = false;
            } else if !inside_quotes && c == ' ' {
                if !prev_was_space {
                    space_count += 1;
                }
                prev_was_space = true;
            } else {
                prev_was_space = false;
            }
        }
    }

    struct Candidate {
        delim: char,
        count: usize,
        priority: u8,
    }

    let candidates = [
        Candidate { delim: '\t', count: tab_count, priority: 4 },
        Candidate { delim: ';', count: semicolon_count, priority: 3 },
        Candidate { delim: ',', count: comma_count, priority: 2 },
        Candidate { delim: ' ', count: space_count, priority: 1 },
    ];

    let mut best: Option<&Candidate> = None;
    for c in &candidates {
        let threshold = if c.delim == ' ' { 2 } else { 1 };
        if c.count < threshold {
            continue;
        }
        best = match best {
            None => Some(c),
            Some(b) if c.count > b.count => Some(c),
            Some(b) if c.count == b.count && c.priority > b.priority => Some(c),
            other => other,
        };
    }

    best.map(|c| c.delim).unwrap_or(',')
}

/// Split one line into trimmed fields.
///
/// A double quote toggles the in-quotes flag; separators inside quotes are
/// preserved. A field that was quoted yields the text between its first
/// opening and last closing quote. A trailing separator appends an empty
/// field. Empty input yields no fields.
pub fn split_line(line: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut inside_quotes = false;
    let mut quoted_word = false;
    let mut start_pos = 0usize;

    let mut quote_start = 0usize;
    let mut quote_end = 0usize; // exclusive

    let len = line.len();
    for (pos, c) in line.char_indices() {
        if c == '"' {
            if inside_quotes {
                quoted_word = true;
                quote_end = pos;
            } else {
                quote_start = pos + 1;
            }
            inside_quotes = !inside_quotes;
        }

        let mut part_completed = false;
        let mut add_empty = false;
        let mut end_pos = pos;

        if !inside_quotes && c == separator {
            part_completed = true;
        }
        if pos + c.len_utf8() == len {
            part_completed = true;
            end_pos = len;
            if c == separator {
                end_pos = pos;
                add_empty = true;
            }
        }

        if part_completed {
            let part = if quoted_word {
                &line[quote_start..quote_end]
            } else {
                &line[start_pos..end_pos]
            };
            parts.push(part.trim().to_owned());
            start_pos = pos + c.len_utf8();
            quoted_word = false;
            inside_quotes = false;
        }
        if add_empty {
            parts.push(String::new());
        }
    }

    parts
}
