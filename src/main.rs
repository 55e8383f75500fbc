use std::fs::File;
use std::io::{BufRead, BufReader};

use tracing::{error, info, warn, Level};

use telemetry_ingest::core::csv::{detect_delimiter, parse_csv, CsvParseConfig};
use telemetry_ingest::core::sink::PlotDataMap;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            error!("Usage: csv-loader <file.csv>");
            std::process::exit(2);
        }
    };

    // Detect the delimiter from the first line
    let first_line = {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                error!("Cannot open {}: {}", path, e);
                std::process::exit(1);
            }
        };
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        if let Err(e) = reader.read_line(&mut line) {
            error!("Cannot read {}: {}", path, e);
            std::process::exit(1);
        }
        line
    };
    let delimiter = detect_delimiter(first_line.trim_end());
    info!("Detected delimiter: {:?}", delimiter);

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot open {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let config = CsvParseConfig {
        delimiter,
        ..Default::default()
    };

    let result = parse_csv(BufReader::new(file), &config, None);
    if !result.success {
        error!("Parsing failed: no header found");
        std::process::exit(1);
    }

    for warning in &result.warnings {
        warn!("Line {}: {}", warning.line_number, warning.detail);
    }
    info!(
        "Processed {} rows ({} skipped), {} columns",
        result.lines_processed,
        result.lines_skipped,
        result.columns.len()
    );

    let mut sink = PlotDataMap::new();
    result.apply_to(&mut sink);

    for series in sink.iter_numeric() {
        info!("  [numeric] {} ({} points)", series.name(), series.len());
    }
    for series in sink.iter_strings() {
        info!("  [string]  {} ({} points)", series.name(), series.len());
    }
}
