//! Harmonize — security-event message harmonization
//!
//! Ingest pipelines collect security-event records from many feeds in
//! many shapes. This crate is the harmonization core that every stage
//! shares: a schema-driven typed-record model that validates each field
//! against a process-wide harmonization schema, deduplicates events by
//! content hash, and (de)serializes records for transport.
//!
//! ## Features
//!
//! - **Schema-validated records**: every write to a [`Report`] or
//!   [`Event`] is checked for key legality, type validity, length, and
//!   pattern constraints
//! - **Write-once fields**: overwriting a set field requires an explicit
//!   request; junk values (`""`, `"-"`, `"N/A"`) are skipped silently
//! - **Pluggable field types**: type names in the schema resolve to
//!   [`FieldCapability`] implementations at load time
//! - **Deduplication hashing**: order-independent SHA256 digest over an
//!   event's fields, excluding the observation time
//! - **Tagged round-trips**: records serialize with a `__type`
//!   discriminator and reconstruct through [`MessageFactory`]
//!
//! ## Example
//!
//! ```
//! use harmonize::{Event, Harmonization, MessageFactory};
//!
//! let harmonization = Harmonization::default_config().unwrap();
//! let mut event = Event::new(harmonization.clone());
//! event.add("source.ip", "198.51.100.7").unwrap();
//! event.add("classification.type", "scanner").unwrap();
//!
//! let wire = MessageFactory::serialize(&event).unwrap();
//! let rebuilt = MessageFactory::new(harmonization).deserialize(&wire).unwrap();
//! assert_eq!(rebuilt.as_record(), &*event);
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod event;
pub mod factory;
pub mod harmonization;
pub mod hash;
pub mod pipeline;
pub mod record;

pub use capability::{CapabilityRegistry, FieldCapability};
pub use config::HarmonizeConfig;
pub use error::{HarmonizeError, Result};
pub use event::{Event, Report};
pub use factory::{Message, MessageFactory, TYPE_KEY};
pub use harmonization::{FieldSpec, Harmonization, KindSchema};
pub use hash::ContentHash;
pub use pipeline::{MemoryTransport, Transport};
pub use record::{AddOptions, Record, RecordKind};
