// Request/response state machine for the streaming client
//
// Pure state transitions, no IO: the event-loop driver feeds it socket
// callbacks and timer ticks and sends whatever envelopes it hands back.

use std::collections::HashMap;

use super::protocol::{
    ClientCommand, CommandEnvelope, ReplyStatus, SchemaEntry, ServerReply, TopicEntry,
    PROTOCOL_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    GetTopics,
    Subscribe,
    Data,
    Close,
}

/// What a JSON reply amounted to, after pairing and status checks.
#[derive(Debug)]
pub enum ReplyOutcome {
    /// Unparseable, stale, wrong protocol version, or nothing to do.
    Ignored,
    /// The server answered the pending request with `status == "error"`.
    ServerError(String),
    /// Fresh topic list for the selection surface.
    Topics(Vec<TopicEntry>),
    /// Subscription accepted; schemas keyed by topic name.
    Subscribed(HashMap<String, SchemaEntry>),
    /// Subscribe reply arrived without the mandatory schemas object.
    SubscribeRejected,
}

/// Connection-scoped protocol state. At most one request is in flight; a
/// reply is accepted only if its id matches the pending request.
#[derive(Debug)]
pub struct WsState {
    mode: Mode,
    req_in_flight: bool,
    pending_request_id: String,
    pending_mode: Mode,
}

impl Default for WsState {
    fn default() -> Self {
        Self::new()
    }
}

impl WsState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Close,
            req_in_flight: false,
            pending_request_id: String::new(),
            pending_mode: Mode::Close,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn req_in_flight(&self) -> bool {
        self.req_in_flight
    }

    pub fn pending_request_id(&self) -> &str {
        &self.pending_request_id
    }

    fn begin(&mut self, command: ClientCommand, pending_mode: Mode) -> CommandEnvelope {
        let envelope = CommandEnvelope::new(command);
        self.req_in_flight = true;
        self.pending_request_id = envelope.id.clone();
        self.pending_mode = pending_mode;
        envelope
    }

    fn clear_pending(&mut self) {
        self.req_in_flight = false;
        self.pending_request_id.clear();
        self.pending_mode = Mode::Close;
    }

    /// First step after the transport connects: request the topic list.
    pub fn on_connected(&mut self) -> CommandEnvelope {
        self.mode = Mode::GetTopics;
        self.begin(ClientCommand::GetTopics, Mode::GetTopics)
    }

    /// Periodic topic refresh. Only fires while selecting topics and idle.
    pub fn poll_topics(&mut self) -> Option<CommandEnvelope> {
        if self.mode != Mode::GetTopics || self.req_in_flight {
            return None;
        }
        Some(self.begin(ClientCommand::GetTopics, Mode::GetTopics))
    }

    /// Move from topic selection to subscribing.
    pub fn begin_subscribe(&mut self, topics: Vec<String>) -> Option<CommandEnvelope> {
        if self.mode != Mode::GetTopics || self.req_in_flight || topics.is_empty() {
            return None;
        }
        self.mode = Mode::Subscribe;
        Some(self.begin(ClientCommand::Subscribe { topics }, Mode::Subscribe))
    }

    /// Pause streaming on the server side. Unpaired: no pending state.
    pub fn pause(&self) -> Option<CommandEnvelope> {
        if self.mode != Mode::Data || self.req_in_flight {
            return None;
        }
        Some(CommandEnvelope::new(ClientCommand::Pause))
    }

    /// Resume streaming on the server side. Unpaired: no pending state.
    pub fn resume(&self) -> Option<CommandEnvelope> {
        if self.mode != Mode::Data || self.req_in_flight {
            return None;
        }
        Some(CommandEnvelope::new(ClientCommand::Resume))
    }

    /// Keep-alive for the server-side watchdog. No response expected.
    pub fn heartbeat(&self) -> Option<CommandEnvelope> {
        if self.mode != Mode::Data {
            return None;
        }
        Some(CommandEnvelope::new(ClientCommand::Heartbeat))
    }

    /// Route one incoming text message.
    pub fn on_text(&mut self, raw: &str) -> ReplyOutcome {
        let reply: ServerReply = match serde_json::from_str(raw) {
            Ok(reply) => reply,
            Err(_) => return ReplyOutcome::Ignored,
        };

        if reply.protocol_version != PROTOCOL_VERSION {
            return ReplyOutcome::Ignored;
        }

        // While a request is in flight, only its own reply is accepted
        if self.req_in_flight
            && (self.pending_request_id.is_empty() || reply.id != self.pending_request_id)
        {
            return ReplyOutcome::Ignored;
        }

        if reply.status == ReplyStatus::Error {
            self.clear_pending();
            return ReplyOutcome::ServerError(
                reply.message.unwrap_or_else(|| "Unknown error".to_owned()),
            );
        }

        if !self.req_in_flight {
            // Success ack for an unpaired command (pause/resume)
            return ReplyOutcome::Ignored;
        }

        let handled_mode = self.pending_mode;
        self.clear_pending();

        match handled_mode {
            Mode::GetTopics => match reply.topics {
                Some(topics) => ReplyOutcome::Topics(topics),
                None => ReplyOutcome::Ignored,
            },
            Mode::Subscribe => match reply.schemas {
                Some(schemas) => {
                    self.mode = Mode::Data;
                    ReplyOutcome::Subscribed(schemas)
                }
                None => ReplyOutcome::SubscribeRejected,
            },
            Mode::Data | Mode::Close => ReplyOutcome::Ignored,
        }
    }

    /// Back to the initial state on disconnect or shutdown.
    pub fn reset(&mut self) {
        self.mode = Mode::Close;
        self.clear_pending();
    }
}
