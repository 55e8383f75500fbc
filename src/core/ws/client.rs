// WebSocket bridge client: event-loop driver around the state machine

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::frame::{decode_frame, parse_blocks};
use super::parsers::{MessageParser, ParserRegistry};
use super::protocol::{CommandEnvelope, SchemaEntry, TopicEntry, TopicInfo};
use super::state::{ReplyOutcome, WsState};
use crate::core::error::ParserError;
use crate::core::sink::PlotSink;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Commands the host can issue to a running bridge.
#[derive(Debug, Clone)]
pub enum BridgeCommand {
    /// Subscribe to the given topic names (from the selection surface).
    Subscribe(Vec<String>),
    Pause,
    Resume,
    Shutdown,
}

/// Notifications delivered to the host.
#[derive(Debug)]
pub enum BridgeEvent {
    Connected,
    /// Fresh topic list for the selection surface.
    Topics(Vec<TopicEntry>),
    /// Subscription confirmed for these topic names.
    Subscribed(Vec<String>),
    /// The server answered a request with an error status.
    ServerError(String),
    /// A message parser failed; the bridge tears itself down.
    ParserFailure(String),
    TransportError(String),
    /// One binary frame was committed to the sink.
    DataReceived,
    Disconnected,
}

/// Handle to a running bridge task.
pub struct WsBridge {
    cmd_tx: mpsc::Sender<BridgeCommand>,
}

impl WsBridge {
    /// Connect to `url` and spawn the event loop. Returns the command
    /// handle and the event stream.
    pub async fn connect<S>(
        url: &str,
        registry: Arc<ParserRegistry>,
        sink: Arc<Mutex<S>>,
    ) -> Result<(Self, mpsc::Receiver<BridgeEvent>), WsError>
    where
        S: PlotSink + Send + 'static,
    {
        let (ws, _) = connect_async(url).await?;

        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);

        tokio::spawn(run_loop(ws, registry, sink, cmd_rx, event_tx));

        Ok((Self { cmd_tx }, event_rx))
    }

    pub async fn subscribe(&self, topics: Vec<String>) {
        let _ = self.cmd_tx.send(BridgeCommand::Subscribe(topics)).await;
    }

    pub async fn pause(&self) {
        let _ = self.cmd_tx.send(BridgeCommand::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.cmd_tx.send(BridgeCommand::Resume).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(BridgeCommand::Shutdown).await;
    }
}

async fn send_command(write: &mut WsWriter, envelope: &CommandEnvelope) -> bool {
    let json = match envelope.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize command: {}", e);
            return false;
        }
    };
    write.send(Message::Text(json)).await.is_ok()
}

async fn run_loop<S>(
    ws: WsStream,
    registry: Arc<ParserRegistry>,
    sink: Arc<Mutex<S>>,
    mut cmd_rx: mpsc::Receiver<BridgeCommand>,
    event_tx: mpsc::Sender<BridgeEvent>,
) where
    S: PlotSink + Send + 'static,
{
    let (mut write, mut read) = ws.split();

    let mut state = WsState::new();
    let mut topics: Vec<TopicInfo> = Vec::new();
    let mut parsers: HashMap<String, Box<dyn MessageParser>> = HashMap::new();
    let mut warned_encodings: HashSet<String> = HashSet::new();

    // First step after connect: request topics
    let env = state.on_connected();
    if !send_command(&mut write, &env).await {
        let _ = event_tx.send(BridgeEvent::Disconnected).await;
        return;
    }
    info!("Connected, requesting topics");
    let _ = event_tx.send(BridgeEvent::Connected).await;

    // Both run on the event loop; state-machine gating decides which one
    // actually sends anything.
    let mut topics_timer = tokio::time::interval(Duration::from_secs(1));
    let mut heartbeat_timer = tokio::time::interval(Duration::from_secs(1));
    topics_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    heartbeat_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let keep_going = handle_text(
                            &mut state,
                            &text,
                            &registry,
                            &mut topics,
                            &mut parsers,
                            &mut warned_encodings,
                            &event_tx,
                        )
                        .await;
                        if !keep_going {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(bin))) => {
                        if !handle_binary(&bin, &mut parsers, &sink, &event_tx).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        let _ = event_tx.send(BridgeEvent::TransportError(e.to_string())).await;
                        break;
                    }
                    None => break,
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(BridgeCommand::Subscribe(names)) => {
                        if let Some(env) = state.begin_subscribe(names.clone()) {
                            topics = names
                                .into_iter()
                                .map(|name| TopicInfo { name, ..Default::default() })
                                .collect();
                            if !send_command(&mut write, &env).await {
                                break;
                            }
                        }
                    }
                    Some(BridgeCommand::Pause) => {
                        if let Some(env) = state.pause() {
                            if !send_command(&mut write, &env).await {
                                break;
                            }
                        }
                    }
                    Some(BridgeCommand::Resume) => {
                        if let Some(env) = state.resume() {
                            if !send_command(&mut write, &env).await {
                                break;
                            }
                        }
                    }
                    Some(BridgeCommand::Shutdown) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            _ = topics_timer.tick() => {
                if let Some(env) = state.poll_topics() {
                    if !send_command(&mut write, &env).await {
                        break;
                    }
                }
            }
            _ = heartbeat_timer.tick() => {
                if let Some(env) = state.heartbeat() {
                    if !send_command(&mut write, &env).await {
                        break;
                    }
                }
            }
        }
    }

    state.reset();
    topics.clear();
    parsers.clear();
    let _ = event_tx.send(BridgeEvent::Disconnected).await;
}

/// Route one text message. Returns false when the session must end.
async fn handle_text(
    state: &mut WsState,
    text: &str,
    registry: &ParserRegistry,
    topics: &mut Vec<TopicInfo>,
    parsers: &mut HashMap<String, Box<dyn MessageParser>>,
    warned_encodings: &mut HashSet<String>,
    event_tx: &mpsc::Sender<BridgeEvent>,
) -> bool {
    match state.on_text(text) {
        ReplyOutcome::Ignored => true,
        ReplyOutcome::ServerError(msg) => {
            warn!("Server error: {}", msg);
            let _ = event_tx.send(BridgeEvent::ServerError(msg)).await;
            true
        }
        ReplyOutcome::Topics(list) => {
            let _ = event_tx.send(BridgeEvent::Topics(list)).await;
            true
        }
        ReplyOutcome::SubscribeRejected => {
            warn!("Subscribe response carried no schemas");
            topics.clear();
            parsers.clear();
            let _ = event_tx
                .send(BridgeEvent::ServerError(
                    "Subscribe response carried no schemas".to_owned(),
                ))
                .await;
            true
        }
        ReplyOutcome::Subscribed(schemas) => {
            match install_parsers(registry, topics, parsers, warned_encodings, &schemas) {
                Ok(()) => {
                    let names = topics.iter().map(|t| t.name.clone()).collect();
                    info!("Subscribed, streaming started");
                    let _ = event_tx.send(BridgeEvent::Subscribed(names)).await;
                    true
                }
                Err(e) => {
                    // The sink may be inconsistent for this topic: tear down
                    error!("Parser creation failed: {}", e);
                    let _ = event_tx.send(BridgeEvent::ParserFailure(e.to_string())).await;
                    false
                }
            }
        }
    }
}

/// Keep only server-confirmed topics, fill their schema fields, and create
/// one parser per topic via the encoding-keyed factories.
fn install_parsers(
    registry: &ParserRegistry,
    topics: &mut Vec<TopicInfo>,
    parsers: &mut HashMap<String, Box<dyn MessageParser>>,
    warned_encodings: &mut HashSet<String>,
    schemas: &HashMap<String, SchemaEntry>,
) -> Result<(), ParserError> {
    topics.retain(|t| schemas.contains_key(&t.name));

    for topic in topics.iter_mut() {
        let schema = &schemas[&topic.name];
        topic.schema_name = schema.name.clone();
        topic.schema_encoding = schema.encoding.clone();
        topic.schema_definition = schema.definition.clone();

        if parsers.contains_key(&topic.name) {
            continue;
        }

        if !registry.contains(&schema.encoding) {
            // Warn only once per encoding
            if warned_encodings.insert(schema.encoding.clone()) {
                warn!("No parser available for encoding [{}]", schema.encoding);
            }
            continue;
        }

        let parser = registry.create_parser(&topic.name, schema)?;
        parsers.insert(topic.name.clone(), parser);
    }

    Ok(())
}

/// Decode one binary frame and fan its blocks out to the topic parsers.
/// All blocks commit under a single sink lock. Returns false when a parser
/// failure forces a teardown.
async fn handle_binary<S>(
    frame: &[u8],
    parsers: &mut HashMap<String, Box<dyn MessageParser>>,
    sink: &Arc<Mutex<S>>,
    event_tx: &mpsc::Sender<BridgeEvent>,
) -> bool
where
    S: PlotSink + Send + 'static,
{
    let (header, payload) = match decode_frame(frame) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Dropping binary frame: {}", e);
            return true;
        }
    };

    let blocks = match parse_blocks(&payload, header.message_count) {
        Ok(blocks) => blocks,
        Err(e) => {
            warn!("Dropping binary frame: {}", e);
            return true;
        }
    };

    if let Err(e) = commit_blocks(&blocks, parsers, sink) {
        error!("Message parsing failed, stopping the bridge: {}", e);
        let _ = event_tx.send(BridgeEvent::ParserFailure(e.to_string())).await;
        return false;
    }

    let _ = event_tx.send(BridgeEvent::DataReceived).await;
    true
}

/// Hand every block to its topic's parser under a single sink lock, so a
/// frame commits atomically with respect to sink readers.
fn commit_blocks<S>(
    blocks: &[super::frame::MessageBlock<'_>],
    parsers: &mut HashMap<String, Box<dyn MessageParser>>,
    sink: &Mutex<S>,
) -> Result<(), ParserError>
where
    S: PlotSink + Send + 'static,
{
    let mut guard = sink.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

    for block in blocks {
        match parsers.get_mut(block.topic) {
            Some(parser) => {
                parser.parse(block.data, block.timestamp(), &mut *guard)?;
            }
            None => {
                debug!("No parser registered for topic {}", block.topic);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::PlotDataMap;
    use crate::core::ws::frame::FRAME_MAGIC;
    use serde_json::json;
    use tokio::time::timeout;

    fn block(topic: &str, ts_ns: u64, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(topic.len() as u16).to_le_bytes());
        out.extend_from_slice(topic.as_bytes());
        out.extend_from_slice(&ts_ns.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn frame(message_count: u32, payload: &[u8]) -> Vec<u8> {
        let compressed = zstd::encode_all(payload, 0).unwrap();
        let mut out = Vec::new();
        out.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
        out.extend_from_slice(&message_count.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&compressed);
        out
    }

    async fn wait_for<F>(events: &mut mpsc::Receiver<BridgeEvent>, mut pred: F) -> BridgeEvent
    where
        F: FnMut(&BridgeEvent) -> bool,
    {
        loop {
            let event = timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }

    async fn mock_server(listener: tokio::net::TcpListener) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };
            let v: serde_json::Value = serde_json::from_str(&text).unwrap();
            let id = v["id"].clone();
            assert_eq!(v["protocol_version"], 1);

            match v["command"].as_str().unwrap() {
                "get_topics" => {
                    let reply = json!({
                        "protocol_version": 1,
                        "id": id,
                        "status": "success",
                        "topics": [{"name": "/telemetry", "type": "json"}]
                    });
                    ws.send(Message::Text(reply.to_string())).await.unwrap();
                }
                "subscribe" => {
                    assert_eq!(v["topics"][0], "/telemetry");
                    let reply = json!({
                        "protocol_version": 1,
                        "id": id,
                        "status": "success",
                        "schemas": {
                            "/telemetry": {"name": "telemetry", "encoding": "json", "definition": ""}
                        }
                    });
                    ws.send(Message::Text(reply.to_string())).await.unwrap();

                    let payload = block("/telemetry", 2_000_000_000, br#"{"x": 7.5}"#);
                    ws.send(Message::Binary(frame(1, &payload))).await.unwrap();
                }
                "heartbeat" => {}
                other => panic!("unexpected command: {}", other),
            }
        }
    }

    #[tokio::test]
    async fn bridge_end_to_end() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(mock_server(listener));

        let sink = Arc::new(Mutex::new(PlotDataMap::new()));
        let registry = Arc::new(ParserRegistry::with_defaults());

        let (bridge, mut events) =
            WsBridge::connect(&format!("ws://{}", addr), registry, sink.clone())
                .await
                .unwrap();

        wait_for(&mut events, |e| matches!(e, BridgeEvent::Connected)).await;
        let topics = match wait_for(&mut events, |e| matches!(e, BridgeEvent::Topics(_))).await {
            BridgeEvent::Topics(topics) => topics,
            _ => unreachable!(),
        };
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].name, "/telemetry");

        bridge.subscribe(vec!["/telemetry".to_owned()]).await;
        wait_for(&mut events, |e| matches!(e, BridgeEvent::Subscribed(_))).await;
        wait_for(&mut events, |e| matches!(e, BridgeEvent::DataReceived)).await;

        {
            let guard = sink.lock().unwrap();
            let series = guard.numeric("/telemetry/x").unwrap();
            assert_eq!(series.len(), 1);
            let (ts, value) = series.points()[0];
            assert!((ts - 2.0).abs() < 1e-9);
            assert_eq!(value, 7.5);
        }

        bridge.shutdown().await;
        wait_for(&mut events, |e| matches!(e, BridgeEvent::Disconnected)).await;
        server.abort();
    }

    #[tokio::test]
    async fn corrupt_frames_are_dropped_without_teardown() {
        let mut parsers: HashMap<String, Box<dyn MessageParser>> = HashMap::new();
        let sink = Arc::new(Mutex::new(PlotDataMap::new()));
        let (event_tx, mut event_rx) = mpsc::channel(8);

        // Bad magic
        let mut bad = frame(1, &block("/a", 0, &[1]));
        bad[0] = 0;
        assert!(handle_binary(&bad, &mut parsers, &sink, &event_tx).await);

        // Count mismatch: no DataReceived, nothing committed
        let mismatch = frame(5, &block("/a", 0, &[1]));
        assert!(handle_binary(&mismatch, &mut parsers, &sink, &event_tx).await);

        assert!(event_rx.try_recv().is_err());
        assert!(sink.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_topics_are_skipped() {
        let mut parsers: HashMap<String, Box<dyn MessageParser>> = HashMap::new();
        let sink = Arc::new(Mutex::new(PlotDataMap::new()));
        let (event_tx, mut event_rx) = mpsc::channel(8);

        let payload = block("/nobody-home", 1_000_000_000, br#"{"x": 1}"#);
        let ok = handle_binary(&frame(1, &payload), &mut parsers, &sink, &event_tx).await;
        assert!(ok);

        // Frame still counts as received, sink untouched
        assert!(matches!(event_rx.try_recv(), Ok(BridgeEvent::DataReceived)));
        assert!(sink.lock().unwrap().is_empty());
    }
}
