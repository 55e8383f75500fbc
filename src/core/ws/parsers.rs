// Message parsers: one per subscribed topic, created by encoding-keyed
// factories

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::protocol::SchemaEntry;
use crate::core::error::ParserError;
use crate::core::sink::PlotSink;

/// Decodes one topic's raw message bytes into sink appends.
pub trait MessageParser: Send {
    fn parse(
        &mut self,
        data: &[u8],
        ts_sec: f64,
        sink: &mut dyn PlotSink,
    ) -> Result<(), ParserError>;
}

/// Builds a [`MessageParser`] for a topic once its schema is known.
pub trait ParserFactory: Send + Sync {
    /// The schema encoding this factory understands (e.g. "json", "cdr").
    fn encoding(&self) -> &str;

    fn create_parser(
        &self,
        topic: &str,
        schema: &SchemaEntry,
    ) -> Result<Box<dyn MessageParser>, ParserError>;
}

/// Lookup table from schema encoding to factory.
#[derive(Default)]
pub struct ParserRegistry {
    factories: HashMap<String, Arc<dyn ParserFactory>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in JSON factory pre-registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonParserFactory));
        registry
    }

    pub fn register(&mut self, factory: Arc<dyn ParserFactory>) {
        self.factories.insert(factory.encoding().to_owned(), factory);
    }

    pub fn contains(&self, encoding: &str) -> bool {
        self.factories.contains_key(encoding)
    }

    pub fn create_parser(
        &self,
        topic: &str,
        schema: &SchemaEntry,
    ) -> Result<Box<dyn MessageParser>, ParserError> {
        let factory = self
            .factories
            .get(&schema.encoding)
            .ok_or_else(|| ParserError::UnknownEncoding(schema.encoding.clone()))?;
        factory.create_parser(topic, schema)
    }
}

/// Factory for the built-in `json` encoding: messages are JSON objects,
/// flattened into `topic/field` series.
pub struct JsonParserFactory;

impl ParserFactory for JsonParserFactory {
    fn encoding(&self) -> &str {
        "json"
    }

    fn create_parser(
        &self,
        topic: &str,
        _schema: &SchemaEntry,
    ) -> Result<Box<dyn MessageParser>, ParserError> {
        Ok(Box::new(JsonMessageParser {
            topic: topic.to_owned(),
        }))
    }
}

struct JsonMessageParser {
    topic: String,
}

impl JsonMessageParser {
    fn flatten(&self, prefix: &str, value: &Value, ts_sec: f64, sink: &mut dyn PlotSink) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let name = format!("{}/{}", prefix, key);
                    self.flatten(&name, child, ts_sec, sink);
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let name = format!("{}/{}", prefix, i);
                    self.flatten(&name, child, ts_sec, sink);
                }
            }
            Value::Number(n) => {
                if let Some(v) = n.as_f64() {
                    sink.add_numeric(prefix).push((ts_sec, v));
                }
            }
            Value::Bool(b) => {
                sink.add_numeric(prefix).push((ts_sec, if *b { 1.0 } else { 0.0 }));
            }
            Value::String(s) => {
                sink.add_string(prefix).push((ts_sec, s));
            }
            Value::Null => {}
        }
    }
}

impl MessageParser for JsonMessageParser {
    fn parse(
        &mut self,
        data: &[u8],
        ts_sec: f64,
        sink: &mut dyn PlotSink,
    ) -> Result<(), ParserError> {
        let value: Value =
            serde_json::from_slice(data).map_err(|e| ParserError::MalformedMessage {
                topic: self.topic.clone(),
                reason: e.to_string(),
            })?;

        let topic = self.topic.clone();
        self.flatten(&topic, &value, ts_sec, sink);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::PlotDataMap;

    fn json_schema() -> SchemaEntry {
        SchemaEntry {
            name: "test".to_owned(),
            encoding: "json".to_owned(),
            definition: String::new(),
        }
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        let registry = ParserRegistry::with_defaults();
        let schema = SchemaEntry {
            encoding: "cdr".to_owned(),
            ..Default::default()
        };
        match registry.create_parser("/imu", &schema) {
            Err(ParserError::UnknownEncoding(enc)) => assert_eq!(enc, "cdr"),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn json_parser_flattens_nested_objects() {
        let registry = ParserRegistry::with_defaults();
        let mut parser = registry.create_parser("/pose", &json_schema()).unwrap();
        let mut sink = PlotDataMap::new();

        parser
            .parse(br#"{"x": 1.5, "inner": {"y": 2.5}}"#, 10.0, &mut sink)
            .unwrap();

        assert_eq!(sink.numeric("/pose/x").unwrap().points(), &[(10.0, 1.5)]);
        assert_eq!(
            sink.numeric("/pose/inner/y").unwrap().points(),
            &[(10.0, 2.5)]
        );
    }

    #[test]
    fn json_parser_handles_strings_bools_arrays() {
        let registry = ParserRegistry::with_defaults();
        let mut parser = registry.create_parser("/t", &json_schema()).unwrap();
        let mut sink = PlotDataMap::new();

        parser
            .parse(br#"{"state": "armed", "ok": true, "v": [3.0, 4.0]}"#, 1.0, &mut sink)
            .unwrap();

        let states = sink.string_series("/t/state").unwrap();
        assert_eq!(states.get_string(states.points()[0].1), "armed");
        assert_eq!(sink.numeric("/t/ok").unwrap().points(), &[(1.0, 1.0)]);
        assert_eq!(sink.numeric("/t/v/0").unwrap().points(), &[(1.0, 3.0)]);
        assert_eq!(sink.numeric("/t/v/1").unwrap().points(), &[(1.0, 4.0)]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let registry = ParserRegistry::with_defaults();
        let mut parser = registry.create_parser("/t", &json_schema()).unwrap();
        let mut sink = PlotDataMap::new();

        assert!(parser.parse(b"not json", 0.0, &mut sink).is_err());
    }

    #[test]
    fn custom_factories_can_be_registered() {
        struct NullFactory;
        struct NullParser;

        impl MessageParser for NullParser {
            fn parse(
                &mut self,
                _data: &[u8],
                _ts_sec: f64,
                _sink: &mut dyn PlotSink,
            ) -> Result<(), ParserError> {
                Ok(())
            }
        }

        impl ParserFactory for NullFactory {
            fn encoding(&self) -> &str {
                "null"
            }
            fn create_parser(
                &self,
                _topic: &str,
                _schema: &SchemaEntry,
            ) -> Result<Box<dyn MessageParser>, ParserError> {
                Ok(Box::new(NullParser))
            }
        }

        let mut registry = ParserRegistry::with_defaults();
        registry.register(Arc::new(NullFactory));
        assert!(registry.contains("null"));
        assert!(registry.contains("json"));
    }
}
