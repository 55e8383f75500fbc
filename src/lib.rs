// Telemetry ingestion cores for Plotune
// Main library entry point

pub mod core;

// Re-export main types
pub use core::csv::{parse_csv, parse_csv_str, CsvParseConfig, CsvParseResult, CsvParseWarning};
pub use core::error::{ConfigError, FrameError, ParserError};
pub use core::sink::{NumericSeries, PlotDataMap, PlotSink, StringDictIndex, StringSeries};
pub use core::ws::{BridgeCommand, BridgeEvent, WsBridge};

#[cfg(test)]
mod tests {
    #[test]
    fn test_constants() {
        use crate::core::ws::frame::{FRAME_HEADER_SIZE, FRAME_MAGIC};
        use crate::core::ws::protocol::PROTOCOL_VERSION;
        assert_eq!(FRAME_MAGIC, 0x4252_4A50); // "PJRB"
        assert_eq!(FRAME_HEADER_SIZE, 16);
        assert_eq!(PROTOCOL_VERSION, 1);
    }
}
