//! Report and Event record kinds
//!
//! A [`Report`] is one raw feed item; an [`Event`] is one normalized
//! security event. Both are thin wrappers over [`Record`] — the wrapper
//! fixes the kind and, for events, adds deduplication hashing and the
//! flat→nested tree conversion.

use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::Result;
use crate::harmonization::Harmonization;
use crate::hash::ContentHash;
use crate::record::{Record, RecordKind};

/// Keys an event inherits from the report it was derived from
const INHERITED_KEYS: [&str; 4] = ["feed.name", "feed.url", "feed.accuracy", "time.observation"];

/// Key excluded from the content hash: two sightings of the same event
/// at different times must deduplicate to the same digest
const OBSERVATION_KEY: &str = "time.observation";

/// One raw, unprocessed feed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report(Record);

impl Report {
    /// Create an empty report
    pub fn new(harmonization: Arc<Harmonization>) -> Self {
        Self(Record::new(RecordKind::Report, harmonization))
    }

    /// Create a report from flat data, validating key by key
    pub fn from_flat<I, K, V>(harmonization: Arc<Harmonization>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self(Record::from_flat(
            RecordKind::Report,
            harmonization,
            fields,
        )?))
    }

    pub(crate) fn from_record(record: Record) -> Self {
        debug_assert_eq!(record.kind(), RecordKind::Report);
        Self(record)
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

impl Deref for Report {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.0
    }
}

impl DerefMut for Report {
    fn deref_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}

/// One normalized security event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event(Record);

impl Event {
    /// Create an empty event
    pub fn new(harmonization: Arc<Harmonization>) -> Self {
        Self(Record::new(RecordKind::Event, harmonization))
    }

    /// Create an event from flat data, validating key by key
    pub fn from_flat<I, K, V>(harmonization: Arc<Harmonization>, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self(Record::from_flat(
            RecordKind::Event,
            harmonization,
            fields,
        )?))
    }

    /// Derive an event from a report.
    ///
    /// Only the feed provenance fields and the observation time carry
    /// over; everything else in the report stays behind.
    pub fn from_report(report: &Report) -> Result<Self> {
        let mut event = Self::new(report.harmonization().clone());
        for key in INHERITED_KEYS {
            if let Ok(value) = report.get(key) {
                event.add(key, value)?;
            }
        }
        Ok(event)
    }

    pub(crate) fn from_record(record: Record) -> Self {
        debug_assert_eq!(record.kind(), RecordKind::Event);
        Self(record)
    }

    pub fn into_record(self) -> Record {
        self.0
    }

    /// Deduplication hash over all fields except `time.observation`.
    ///
    /// Fields are fed in ascending key order, so the digest does not
    /// depend on insertion order.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of_fields(self.iter().filter(|(key, _)| *key != OBSERVATION_KEY))
    }

    /// Nested representation: dotted keys split into a tree, so that
    /// `source.ip` and `source.port` merge under one `source` node.
    ///
    /// Total because the schema loader rejects keys that are strict
    /// dotted prefixes of other keys.
    pub fn to_tree(&self) -> Value {
        let mut root = Map::new();
        for (key, value) in self.iter() {
            let mut segments = key.split('.').peekable();
            let mut node = &mut root;
            while let Some(segment) = segments.next() {
                if segments.peek().is_none() {
                    node.insert(segment.to_string(), Value::String(value.to_string()));
                    break;
                }
                node = node
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()))
                    .as_object_mut()
                    .expect("schema load rejects dotted-prefix key collisions");
            }
        }
        Value::Object(root)
    }

    /// Canonical textual encoding of [`Event::to_tree`]
    pub fn to_tree_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_tree())?)
    }
}

impl Deref for Event {
    type Target = Record;

    fn deref(&self) -> &Record {
        &self.0
    }
}

impl DerefMut for Event {
    fn deref_mut(&mut self) -> &mut Record {
        &mut self.0
    }
}
