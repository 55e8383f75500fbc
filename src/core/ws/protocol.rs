// JSON control protocol spoken over the WebSocket text channel

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PROTOCOL_VERSION: u32 = 1;

/// Commands the client may send. Serialized with a `command` tag plus the
/// envelope fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    GetTopics,
    Subscribe { topics: Vec<String> },
    Pause,
    Resume,
    Heartbeat,
}

/// A command plus the fields every outgoing message carries.
#[derive(Debug, Clone, Serialize)]
pub struct CommandEnvelope {
    #[serde(flatten)]
    pub command: ClientCommand,
    pub id: String,
    pub protocol_version: u32,
}

impl CommandEnvelope {
    pub fn new(command: ClientCommand) -> Self {
        Self {
            command,
            id: Uuid::new_v4().to_string(),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// One topic advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub topic_type: String,
}

/// Schema the server attaches to an accepted subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub definition: String,
}

/// Any JSON reply from the server. Body fields are optional; which one is
/// meaningful depends on the request the reply answers.
#[derive(Debug, Deserialize)]
pub struct ServerReply {
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub id: String,
    pub status: ReplyStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<TopicEntry>>,
    #[serde(default)]
    pub schemas: Option<HashMap<String, SchemaEntry>>,
}

/// Client-side record of a subscribed topic. Schema fields are populated
/// only after a successful subscribe response.
#[derive(Debug, Clone, Default)]
pub struct TopicInfo {
    pub name: String,
    pub topic_type: String,
    pub schema_name: String,
    pub schema_encoding: String,
    pub schema_definition: String,
}
