// Error handling for the ingestion cores

use thiserror::Error;

/// Errors raised while decoding one binary WebSocket frame.
///
/// All of these are recoverable: the offending frame is dropped and the
/// connection stays up.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame too short: {0} bytes, need at least 16")]
    TooShort(usize),

    #[error("Invalid magic: expected 0x42524A50, got {got:#010x}")]
    InvalidMagic { got: u32 },

    #[error("Unsupported flags: {0:#010x}")]
    UnsupportedFlags(u32),

    #[error("Empty compressed payload")]
    EmptyPayload,

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("Decompressed size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("Truncated block at offset {0}")]
    TruncatedBlock(usize),

    #[error("Invalid UTF-8 topic name")]
    InvalidTopicName(#[from] std::str::Utf8Error),

    #[error("Message count mismatch: header says {expected}, parsed {parsed}")]
    CountMismatch { expected: u32, parsed: u32 },
}

/// Errors raised by message-parser factories and parsers.
///
/// Creation and dispatch failures are fatal for the streaming session: the
/// sink may be inconsistent for the topic, so the client tears down.
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("No parser available for encoding [{0}]")]
    UnknownEncoding(String),

    #[error("Parser creation failed for topic {topic}: {reason}")]
    CreationFailed { topic: String, reason: String },

    #[error("Malformed message on topic {topic}: {reason}")]
    MalformedMessage { topic: String, reason: String },
}

/// Errors from the persisted-state pass-through surfaces.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
