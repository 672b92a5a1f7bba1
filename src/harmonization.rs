//! Harmonization schema registry
//!
//! Loads the per-kind field schemas (which keys a report or event may
//! carry, and which type constraints apply to each) and resolves every
//! declared type name against a [`CapabilityRegistry`] up front. The
//! registry is immutable after load and is shared across all records
//! through an `Arc`.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::capability::{CapabilityRegistry, FieldCapability};
use crate::error::{HarmonizeError, Result};
use crate::record::RecordKind;

/// Default harmonization schema shipped with the crate
const DEFAULT_CONFIG: &str = include_str!("../data/harmonization.json");

/// One field declaration as written in the config file
#[derive(Debug, Clone, Deserialize)]
struct RawFieldSpec {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    length: Option<usize>,
    #[serde(default)]
    regex: Option<String>,
}

/// A resolved field declaration: capability bound, regex compiled
#[derive(Clone)]
pub struct FieldSpec {
    type_name: String,
    capability: Arc<dyn FieldCapability>,
    length: Option<usize>,
    pattern: Option<Regex>,
}

impl FieldSpec {
    /// The declared type name (e.g. "ip_address")
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared maximum textual length, if any
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    /// Declared pattern, if any
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Run the field's sanitizer
    pub fn sanitize(&self, value: &str) -> Option<String> {
        self.capability.sanitize(value)
    }

    /// Validate a value against the capability, length bound, and pattern.
    ///
    /// Returns the rejection reason on failure; constraints are checked in
    /// that order and the first failure wins.
    pub fn validate(&self, value: &str) -> std::result::Result<(), String> {
        if !self.capability.is_valid(value) {
            return Err(format!("{} rejected the value", self.type_name));
        }
        if let Some(bound) = self.length {
            let length = value.chars().count();
            if length > bound {
                return Err(format!("too long: {} > {}", length, bound));
            }
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err("regex did not match".to_string());
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("type_name", &self.type_name)
            .field("length", &self.length)
            .field("pattern", &self.pattern.as_ref().map(|p| p.as_str()))
            .finish()
    }
}

/// Field schema for one record kind
#[derive(Debug, Clone)]
pub struct KindSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl KindSchema {
    /// Look up a field spec by key
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Whether a key is declared for this kind
    pub fn declares(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// All declared keys with their specs, in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The process-wide harmonization registry
#[derive(Debug, Clone)]
pub struct Harmonization {
    report: KindSchema,
    event: KindSchema,
}

impl Harmonization {
    /// Load the default harmonization schema shipped with the crate
    pub fn default_config() -> Result<Arc<Self>> {
        Self::from_json(DEFAULT_CONFIG, &CapabilityRegistry::with_builtins())
    }

    /// Load a harmonization schema from a JSON file
    pub fn load(path: impl AsRef<Path>, capabilities: &CapabilityRegistry) -> Result<Arc<Self>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            HarmonizeError::SchemaLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let harmonization = Self::from_json(&content, capabilities)?;
        info!(path = %path.display(), "loaded harmonization schema");
        Ok(harmonization)
    }

    /// Parse a harmonization schema from JSON text
    pub fn from_json(json: &str, capabilities: &CapabilityRegistry) -> Result<Arc<Self>> {
        let raw: BTreeMap<String, BTreeMap<String, RawFieldSpec>> = serde_json::from_str(json)
            .map_err(|e| HarmonizeError::SchemaLoad(format!("malformed schema JSON: {}", e)))?;

        let mut kinds = BTreeMap::new();
        for (kind_name, fields) in raw {
            kinds.insert(kind_name.clone(), Self::resolve_kind(&kind_name, fields, capabilities)?);
        }

        let report = kinds.remove("report").ok_or_else(|| {
            HarmonizeError::SchemaLoad("missing schema for kind 'report'".to_string())
        })?;
        let event = kinds.remove("event").ok_or_else(|| {
            HarmonizeError::SchemaLoad("missing schema for kind 'event'".to_string())
        })?;

        Ok(Arc::new(Self { report, event }))
    }

    fn resolve_kind(
        kind_name: &str,
        raw_fields: BTreeMap<String, RawFieldSpec>,
        capabilities: &CapabilityRegistry,
    ) -> Result<KindSchema> {
        let mut fields = BTreeMap::new();

        for (key, raw) in raw_fields {
            if key == crate::factory::TYPE_KEY {
                return Err(HarmonizeError::SchemaLoad(format!(
                    "{}: field key {:?} is reserved for the type discriminator",
                    kind_name,
                    crate::factory::TYPE_KEY,
                )));
            }

            let capability = capabilities.get(&raw.type_name).ok_or_else(|| {
                HarmonizeError::SchemaLoad(format!(
                    "{}.{}: unknown field type {:?}",
                    kind_name, key, raw.type_name
                ))
            })?;

            let pattern = match &raw.regex {
                Some(regex) => Some(Regex::new(regex).map_err(|e| {
                    HarmonizeError::SchemaLoad(format!(
                        "{}.{}: invalid regex: {}",
                        kind_name, key, e
                    ))
                })?),
                None => None,
            };

            fields.insert(
                key,
                FieldSpec {
                    type_name: raw.type_name,
                    capability,
                    length: raw.length,
                    pattern,
                },
            );
        }

        // Reject keys that are strict dotted prefixes of other keys; this
        // keeps the flat -> nested tree conversion total and deterministic.
        for key in fields.keys() {
            let prefix = format!("{}.", key);
            if let Some((other, _)) = fields.range(prefix.clone()..).next() {
                if other.starts_with(&prefix) {
                    return Err(HarmonizeError::SchemaLoad(format!(
                        "{}: key {:?} is a dotted prefix of {:?}",
                        kind_name, key, other
                    )));
                }
            }
        }

        Ok(KindSchema { fields })
    }

    /// The field schema for one record kind
    pub fn schema(&self, kind: RecordKind) -> &KindSchema {
        match kind {
            RecordKind::Report => &self.report,
            RecordKind::Event => &self.event,
        }
    }

    /// Look up a field spec; fails with `InvalidKey` for undeclared keys
    pub fn lookup(&self, kind: RecordKind, key: &str) -> Result<&FieldSpec> {
        self.schema(kind).get(key).ok_or_else(|| HarmonizeError::InvalidKey {
            kind: kind.to_string(),
            key: key.to_string(),
        })
    }
}
