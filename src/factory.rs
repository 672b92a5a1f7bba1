//! Record factory and wire (de)serialization
//!
//! The wire payload is a flat JSON object of dotted keys plus one
//! reserved `__type` key naming the concrete record kind. The factory
//! reads the tag, strips it, and rebuilds the matching kind with every
//! remaining pair validated against that kind's schema.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::{HarmonizeError, Result};
use crate::event::{Event, Report};
use crate::harmonization::Harmonization;
use crate::record::{Record, RecordKind};

/// Reserved discriminator key; never a legal schema field
pub const TYPE_KEY: &str = "__type";

/// A reconstructed record of either concrete kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Report(Report),
    Event(Event),
}

impl Message {
    /// The concrete kind
    pub fn kind(&self) -> RecordKind {
        match self {
            Message::Report(_) => RecordKind::Report,
            Message::Event(_) => RecordKind::Event,
        }
    }

    /// Borrow the underlying record
    pub fn as_record(&self) -> &Record {
        match self {
            Message::Report(report) => report,
            Message::Event(event) => event,
        }
    }

    /// Unwrap into the underlying record
    pub fn into_record(self) -> Record {
        match self {
            Message::Report(report) => report.into_record(),
            Message::Event(event) => event.into_record(),
        }
    }

    /// Unwrap as an event; fails for reports
    pub fn into_event(self) -> Result<Event> {
        match self {
            Message::Event(event) => Ok(event),
            Message::Report(_) => Err(HarmonizeError::InvalidArgument(
                "expected an Event payload, got a Report".to_string(),
            )),
        }
    }

    /// Unwrap as a report; fails for events
    pub fn into_report(self) -> Result<Report> {
        match self {
            Message::Report(report) => Ok(report),
            Message::Event(_) => Err(HarmonizeError::InvalidArgument(
                "expected a Report payload, got an Event".to_string(),
            )),
        }
    }
}

/// Rebuilds concrete records from type-tagged payloads
#[derive(Debug, Clone)]
pub struct MessageFactory {
    harmonization: Arc<Harmonization>,
}

impl MessageFactory {
    pub fn new(harmonization: Arc<Harmonization>) -> Self {
        Self { harmonization }
    }

    /// Reconstruct a record from a tagged flat payload.
    ///
    /// The discriminator is removed before construction, so the record
    /// never stores it as a field.
    pub fn from_tagged(&self, mut payload: Map<String, Value>) -> Result<Message> {
        let tag = payload.remove(TYPE_KEY).ok_or_else(|| {
            HarmonizeError::InvalidArgument(format!("payload has no {} discriminator", TYPE_KEY))
        })?;
        let tag = tag.as_str().ok_or_else(|| {
            HarmonizeError::InvalidArgument(format!("{} discriminator is not a string", TYPE_KEY))
        })?;
        let kind: RecordKind = tag.parse()?;

        let mut fields = Vec::with_capacity(payload.len());
        for (key, value) in payload {
            fields.push((key, text_value(value)?));
        }

        let record = Record::from_flat(kind, self.harmonization.clone(), fields)?;
        Ok(match kind {
            RecordKind::Report => Message::Report(Report::from_record(record)),
            RecordKind::Event => Message::Event(Event::from_record(record)),
        })
    }

    /// Parse a wire payload and reconstruct the record
    pub fn deserialize(&self, raw: &str) -> Result<Message> {
        let value: Value = serde_json::from_str(raw)?;
        match value {
            Value::Object(map) => self.from_tagged(map),
            other => Err(HarmonizeError::InvalidArgument(format!(
                "wire payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Encode a record as a wire payload
    pub fn serialize(record: &Record) -> Result<String> {
        Ok(serde_json::to_string(&Value::Object(record.to_tagged()))?)
    }
}

/// Values travel as text; tolerate scalar JSON from older producers
fn text_value(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(HarmonizeError::InvalidArgument(format!(
            "field values must be scalar, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn factory() -> MessageFactory {
        MessageFactory::new(Harmonization::default_config().unwrap())
    }

    fn tagged(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_from_tagged_event() {
        let message = factory()
            .from_tagged(tagged(json!({
                "__type": "Event",
                "classification.type": "malware"
            })))
            .unwrap();

        assert_eq!(message.kind(), RecordKind::Event);
        let event = message.into_event().unwrap();
        assert_eq!(event.get("classification.type").unwrap(), "malware");
        assert!(!event.contains(TYPE_KEY));
    }

    #[test]
    fn test_from_tagged_unknown_kind() {
        let err = factory()
            .from_tagged(tagged(json!({"__type": "Unknown"})))
            .unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_tagged_missing_discriminator() {
        let err = factory()
            .from_tagged(tagged(json!({"classification.type": "malware"})))
            .unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_tagged_validates_fields() {
        let err = factory()
            .from_tagged(tagged(json!({
                "__type": "Event",
                "source.ip": "not-an-address"
            })))
            .unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidValue { .. }));
    }

    #[test]
    fn test_scalar_values_coerced_to_text() {
        let message = factory()
            .from_tagged(tagged(json!({
                "__type": "Event",
                "source.port": 443,
                "source.tor_node": true
            })))
            .unwrap();
        let event = message.into_event().unwrap();
        assert_eq!(event.get("source.port").unwrap(), "443");
        assert_eq!(event.get("source.tor_node").unwrap(), "true");
    }

    #[test]
    fn test_round_trip_preserves_kind_and_fields() {
        let harmonization = Harmonization::default_config().unwrap();
        let event = Event::from_flat(
            harmonization.clone(),
            [
                ("feed.name", "shadowserver"),
                ("source.ip", "198.51.100.7"),
                ("classification.type", "scanner"),
            ],
        )
        .unwrap();

        let raw = MessageFactory::serialize(&event).unwrap();
        let rebuilt = MessageFactory::new(harmonization).deserialize(&raw).unwrap();

        assert_eq!(rebuilt.kind(), RecordKind::Event);
        assert_eq!(rebuilt.as_record(), &*event);
    }

    #[test]
    fn test_deserialize_rejects_non_object() {
        let err = factory().deserialize("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidArgument(_)));
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let harmonization = Harmonization::default_config().unwrap();
        let mut event = Event::from_flat(harmonization, [("source.ip", "198.51.100.7")]).unwrap();

        let mut copy = event.deep_copy().unwrap();
        copy.update("source.ip", "198.51.100.8", false).unwrap();

        assert_eq!(event.get("source.ip").unwrap(), "198.51.100.7");
        assert_eq!(copy.kind(), RecordKind::Event);
        event.remove("source.ip").unwrap();
        assert_eq!(copy.get("source.ip").unwrap(), "198.51.100.8");
    }
}
