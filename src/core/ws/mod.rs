// WebSocket streaming core

pub mod client;
pub mod frame;
pub mod parsers;
pub mod protocol;
pub mod state;

pub use client::{BridgeCommand, BridgeEvent, WsBridge};
pub use frame::{decode_frame, parse_blocks, FrameHeader, MessageBlock};
pub use parsers::{JsonParserFactory, MessageParser, ParserFactory, ParserRegistry};
pub use protocol::{
    ClientCommand, CommandEnvelope, SchemaEntry, ServerReply, TopicEntry, TopicInfo,
    PROTOCOL_VERSION,
};
pub use state::{Mode, ReplyOutcome, WsState};
