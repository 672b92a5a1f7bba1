//! Schema-validated record container
//!
//! A [`Record`] is an ordered key→value store where every write is
//! checked against the harmonization schema for the record's kind.
//! Callers never touch the underlying map; all mutation goes through
//! [`Record::add_with`] and friends, which enforce key legality,
//! write-once semantics, sentinel skipping, and type constraints.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::error::{HarmonizeError, Result};
use crate::factory::{MessageFactory, TYPE_KEY};
use crate::harmonization::Harmonization;

/// Values that feeds use to mean "no data"; silently skipped on add
const SENTINEL_VALUES: [&str; 2] = ["-", "N/A"];

/// Concrete record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Report,
    Event,
}

impl RecordKind {
    /// Discriminator name embedded in serialized payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Report => "Report",
            RecordKind::Event => "Event",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = HarmonizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Report" => Ok(RecordKind::Report),
            "Event" => Ok(RecordKind::Event),
            other => Err(HarmonizeError::InvalidArgument(format!(
                "unknown record kind {:?}, expected \"Report\" or \"Event\"",
                other
            ))),
        }
    }
}

/// Options for [`Record::add_with`]
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Run the field's sanitizer before validating
    pub sanitize: bool,
    /// Allow replacing an already-set key
    pub overwrite: bool,
    /// Extra values to skip silently, on top of the fixed sentinels
    pub ignore: HashSet<String>,
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sanitize(mut self) -> Self {
        self.sanitize = true;
        self
    }

    pub fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    pub fn ignore<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(values.into_iter().map(Into::into));
        self
    }
}

/// Ordered, schema-validated key→value store
#[derive(Clone)]
pub struct Record {
    kind: RecordKind,
    harmonization: Arc<Harmonization>,
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record of the given kind
    pub fn new(kind: RecordKind, harmonization: Arc<Harmonization>) -> Self {
        Self {
            kind,
            harmonization,
            fields: BTreeMap::new(),
        }
    }

    /// Create a record from existing flat data, validating key by key
    pub fn from_flat<I, K, V>(
        kind: RecordKind,
        harmonization: Arc<Harmonization>,
        fields: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::new(kind, harmonization);
        for (key, value) in fields {
            record.add(key.as_ref(), value.as_ref())?;
        }
        Ok(record)
    }

    /// The concrete kind of this record
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// The harmonization registry this record validates against
    pub fn harmonization(&self) -> &Arc<Harmonization> {
        &self.harmonization
    }

    /// Add a field with default options (no sanitize, no overwrite)
    pub fn add(&mut self, key: &str, value: &str) -> Result<()> {
        self.add_with(key, value, &AddOptions::default())
    }

    /// Add a field.
    ///
    /// Empty strings, the sentinel values `"-"` and `"N/A"`, and values
    /// in the ignore set are skipped silently; this is a designed no-op,
    /// not an error. Everything else must pass the schema's key check
    /// and the field type's constraints before it is stored.
    pub fn add_with(&mut self, key: &str, value: &str, options: &AddOptions) -> Result<()> {
        if !options.overwrite && self.fields.contains_key(key) {
            return Err(HarmonizeError::KeyExists(key.to_string()));
        }

        if value.is_empty() || SENTINEL_VALUES.contains(&value) {
            debug!(key, "skipping empty or sentinel value");
            return Ok(());
        }

        let spec = self.harmonization.lookup(self.kind, key)?;

        if options.ignore.contains(value) {
            debug!(key, "skipping ignored value");
            return Ok(());
        }

        let stored = if options.sanitize {
            spec.sanitize(value).ok_or_else(|| {
                HarmonizeError::invalid_value(key, value, "sanitization failed")
            })?
        } else {
            value.to_string()
        };

        spec.validate(&stored)
            .map_err(|reason| HarmonizeError::invalid_value(key, &stored, reason))?;

        self.fields.insert(key.to_string(), stored);
        Ok(())
    }

    /// Replace the value of a field that must already exist
    pub fn update(&mut self, key: &str, value: &str, sanitize: bool) -> Result<()> {
        if !self.fields.contains_key(key) {
            return Err(HarmonizeError::KeyNotExists(key.to_string()));
        }
        let options = AddOptions {
            sanitize,
            overwrite: true,
            ignore: HashSet::new(),
        };
        self.add_with(key, value, &options)
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, key: &str) -> Result<String> {
        self.fields
            .remove(key)
            .ok_or_else(|| HarmonizeError::KeyNotExists(key.to_string()))
    }

    /// Get the stored value of a field
    pub fn get(&self, key: &str) -> Result<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| HarmonizeError::KeyNotExists(key.to_string()))
    }

    /// Whether a field is set
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of stored fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are stored
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Fields whose key starts with `prefix`, in ascending key order.
    ///
    /// Keys sharing a prefix are contiguous in the ordered map, so this
    /// stops at the first non-matching key instead of scanning the rest.
    pub fn iter_prefixed<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.fields
            .range(prefix.to_string()..)
            .take_while(move |(key, _)| key.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialization view: the flat fields plus the `__type` discriminator.
    ///
    /// This is a separate tagged copy; the discriminator is never stored
    /// in the record itself and the receiver is not touched.
    pub fn to_tagged(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert(
            TYPE_KEY.to_string(),
            serde_json::Value::String(self.kind.as_str().to_string()),
        );
        for (key, value) in &self.fields {
            map.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        map
    }

    /// Serialize then reconstruct through the factory.
    ///
    /// Unlike `clone`, this proves the record round-trips through the
    /// wire format and yields storage with no shared backing at all.
    pub fn deep_copy(&self) -> Result<Record> {
        let raw = MessageFactory::serialize(self)?;
        let message = MessageFactory::new(self.harmonization.clone()).deserialize(&raw)?;
        Ok(message.into_record())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.fields == other.fields
    }
}

impl Eq for Record {}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("kind", &self.kind)
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harmonization::Harmonization;

    fn event_record() -> Record {
        Record::new(RecordKind::Event, Harmonization::default_config().unwrap())
    }

    #[test]
    fn test_add_then_get() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();
        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.7");
        assert!(record.contains("source.ip"));
    }

    #[test]
    fn test_write_once() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();
        let err = record.add("source.ip", "198.51.100.8").unwrap_err();
        assert!(matches!(err, HarmonizeError::KeyExists(_)));
        // Unchanged
        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.7");

        record
            .add_with("source.ip", "198.51.100.8", &AddOptions::new().overwrite())
            .unwrap();
        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.8");
    }

    #[test]
    fn test_empty_and_sentinel_values_skipped() {
        let mut record = event_record();
        for value in ["", "-", "N/A"] {
            record.add("source.ip", value).unwrap();
            assert!(!record.contains("source.ip"));
        }
        // Sentinels are skipped even for keys the schema does not declare
        record.add("bogus.key", "-").unwrap();
    }

    #[test]
    fn test_ignore_set_skipped() {
        let mut record = event_record();
        let options = AddOptions::new().ignore(["203.0.113.1"]);
        record.add_with("source.ip", "203.0.113.1", &options).unwrap();
        assert!(!record.contains("source.ip"));

        record.add_with("source.ip", "198.51.100.7", &options).unwrap();
        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.7");
    }

    #[test]
    fn test_invalid_key() {
        let mut record = event_record();
        let err = record.add("bogus.key", "v").unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidKey { .. }));
    }

    #[test]
    fn test_invalid_value() {
        let mut record = event_record();
        let err = record.add("source.ip", "not-an-address").unwrap_err();
        match err {
            HarmonizeError::InvalidValue { key, reason, .. } => {
                assert_eq!(key, "source.ip");
                assert!(reason.contains("ip_address"));
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_sanitize_before_validate() {
        let mut record = event_record();
        // "Yes" fails boolean validation raw, passes after sanitizing
        let err = record.add("source.tor_node", "Yes").unwrap_err();
        assert!(matches!(err, HarmonizeError::InvalidValue { .. }));

        record
            .add_with("source.tor_node", "Yes", &AddOptions::new().sanitize())
            .unwrap();
        assert_eq!(record.get("source.tor_node").unwrap(), "true");
    }

    #[test]
    fn test_unsanitizable_value() {
        let mut record = event_record();
        let err = record
            .add_with("source.tor_node", "maybe", &AddOptions::new().sanitize())
            .unwrap_err();
        match err {
            HarmonizeError::InvalidValue { reason, .. } => {
                assert_eq!(reason, "sanitization failed");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_update_requires_existing_key() {
        let mut record = event_record();
        let err = record.update("source.ip", "198.51.100.7", false).unwrap_err();
        assert!(matches!(err, HarmonizeError::KeyNotExists(_)));

        record.add("source.ip", "198.51.100.7").unwrap();
        record.update("source.ip", "198.51.100.8", false).unwrap();
        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.8");
    }

    #[test]
    fn test_remove() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();
        assert_eq!(record.remove("source.ip").unwrap(), "198.51.100.7");
        assert!(!record.contains("source.ip"));
        assert!(matches!(
            record.remove("source.ip").unwrap_err(),
            HarmonizeError::KeyNotExists(_)
        ));
    }

    #[test]
    fn test_get_absent_key() {
        let record = event_record();
        assert!(matches!(
            record.get("source.ip").unwrap_err(),
            HarmonizeError::KeyNotExists(_)
        ));
    }

    #[test]
    fn test_iter_prefixed() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();
        record.add("source.port", "443").unwrap();
        record.add("destination.ip", "203.0.113.9").unwrap();

        let source: Vec<_> = record.iter_prefixed("source.").collect();
        assert_eq!(
            source,
            vec![("source.ip", "198.51.100.7"), ("source.port", "443")]
        );

        // Restartable
        assert_eq!(record.iter_prefixed("source.").count(), 2);
        assert_eq!(record.iter_prefixed("nothing.").count(), 0);
    }

    #[test]
    fn test_tagged_view_leaves_record_untouched() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();

        let tagged = record.to_tagged();
        assert_eq!(tagged[TYPE_KEY], "Event");
        assert_eq!(tagged["source.ip"], "198.51.100.7");

        assert!(!record.contains(TYPE_KEY));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut record = event_record();
        record.add("source.ip", "198.51.100.7").unwrap();

        let mut copy = record.clone();
        copy.update("source.ip", "198.51.100.8", false).unwrap();

        assert_eq!(record.get("source.ip").unwrap(), "198.51.100.7");
        assert_eq!(copy.get("source.ip").unwrap(), "198.51.100.8");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Report".parse::<RecordKind>().unwrap(), RecordKind::Report);
        assert_eq!("Event".parse::<RecordKind>().unwrap(), RecordKind::Event);
        assert!(matches!(
            "Unknown".parse::<RecordKind>().unwrap_err(),
            HarmonizeError::InvalidArgument(_)
        ));
    }
}
