//! Field type capabilities
//!
//! Each harmonization field declares a type by name ("ip_address",
//! "datetime", ...). A capability is the pluggable unit behind that name:
//! it decides whether a textual value is valid and, on request, rewrites
//! a near-miss value into its canonical form. The record core never
//! interprets values itself; it only dispatches here.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// Validity check and sanitizer for one value type.
///
/// `sanitize` returns `None` when the value cannot be coerced into a
/// valid form; the default implementation trims whitespace and accepts
/// the result only if it is already valid.
pub trait FieldCapability: Send + Sync {
    fn is_valid(&self, value: &str) -> bool;

    fn sanitize(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if self.is_valid(trimmed) {
            Some(trimmed.to_string())
        } else {
            None
        }
    }
}

/// Name → capability table, resolved once when a harmonization schema
/// is loaded. Immutable afterwards.
#[derive(Clone)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn FieldCapability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
        }
    }

    /// Create a registry populated with the built-in capabilities
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("text", Text);
        registry.register("uppercase_string", UppercaseString);
        registry.register("lowercase_string", LowercaseString);
        registry.register("ip_address", IpAddress);
        registry.register("fqdn", Fqdn);
        registry.register("url", Url::new());
        registry.register("integer", Integer);
        registry.register("float", Float);
        registry.register("accuracy", Accuracy);
        registry.register("boolean", Boolean);
        registry.register("datetime", DateTimeType);
        registry.register("classification_type", ClassificationType);
        registry
    }

    /// Register a capability under a type name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, capability: impl FieldCapability + 'static) {
        self.capabilities.insert(name.into(), Arc::new(capability));
    }

    /// Look up a capability by type name
    pub fn get(&self, name: &str) -> Option<Arc<dyn FieldCapability>> {
        self.capabilities.get(name).cloned()
    }

    /// All registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

// ============================================================================
// Built-in capabilities
// ============================================================================

/// Any non-empty text
pub struct Text;

impl FieldCapability for Text {
    fn is_valid(&self, value: &str) -> bool {
        !value.is_empty()
    }
}

/// Text with no lowercase letters (country codes, registry handles)
pub struct UppercaseString;

impl FieldCapability for UppercaseString {
    fn is_valid(&self, value: &str) -> bool {
        !value.is_empty() && !value.chars().any(|c| c.is_lowercase())
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let upper = value.trim().to_uppercase();
        self.is_valid(&upper).then_some(upper)
    }
}

/// Text with no uppercase letters (malware names, protocol names)
pub struct LowercaseString;

impl FieldCapability for LowercaseString {
    fn is_valid(&self, value: &str) -> bool {
        !value.is_empty() && !value.chars().any(|c| c.is_uppercase())
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let lower = value.trim().to_lowercase();
        self.is_valid(&lower).then_some(lower)
    }
}

/// IPv4 or IPv6 address
pub struct IpAddress;

impl FieldCapability for IpAddress {
    fn is_valid(&self, value: &str) -> bool {
        value.parse::<IpAddr>().is_ok()
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        // Canonicalize (e.g. collapse IPv6 zero runs)
        value.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
    }
}

/// Fully qualified domain name, lowercase, at least two labels
pub struct Fqdn;

impl Fqdn {
    fn pattern() -> &'static Regex {
        static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        PATTERN.get_or_init(|| {
            Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$").unwrap()
        })
    }
}

impl FieldCapability for Fqdn {
    fn is_valid(&self, value: &str) -> bool {
        Self::pattern().is_match(value)
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let name = value.trim().trim_end_matches('.').to_lowercase();
        self.is_valid(&name).then_some(name)
    }
}

/// URL with an explicit scheme
pub struct Url {
    pattern: Regex,
}

impl Url {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").unwrap(),
        }
    }
}

impl Default for Url {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldCapability for Url {
    fn is_valid(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if self.is_valid(trimmed) {
            return Some(trimmed.to_string());
        }
        // Feeds frequently drop the scheme
        let with_scheme = format!("http://{}", trimmed);
        self.is_valid(&with_scheme).then_some(with_scheme)
    }
}

/// Signed 64-bit integer in decimal text
pub struct Integer;

impl FieldCapability for Integer {
    fn is_valid(&self, value: &str) -> bool {
        value.parse::<i64>().is_ok()
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(n.to_string());
        }
        // Tolerate float-formatted integers ("80.0")
        match trimmed.parse::<f64>() {
            Ok(f) if f.fract() == 0.0 && f.is_finite() => Some((f as i64).to_string()),
            _ => None,
        }
    }
}

/// Finite floating point number
pub struct Float;

impl FieldCapability for Float {
    fn is_valid(&self, value: &str) -> bool {
        value.parse::<f64>().map(|f| f.is_finite()).unwrap_or(false)
    }
}

/// Feed accuracy percentage, 0 to 100 inclusive
pub struct Accuracy;

impl FieldCapability for Accuracy {
    fn is_valid(&self, value: &str) -> bool {
        value
            .parse::<f64>()
            .map(|f| (0.0..=100.0).contains(&f))
            .unwrap_or(false)
    }
}

/// Boolean stored as "true"/"false"
pub struct Boolean;

impl FieldCapability for Boolean {
    fn is_valid(&self, value: &str) -> bool {
        value == "true" || value == "false"
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Some("true".to_string()),
            "false" | "0" | "no" | "n" => Some("false".to_string()),
            _ => None,
        }
    }
}

/// RFC 3339 timestamp; sanitization normalizes to UTC
pub struct DateTimeType;

impl DateTimeType {
    /// Naive formats feeds commonly emit, interpreted as UTC
    const NAIVE_FORMATS: [&'static str; 3] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
}

impl FieldCapability for DateTimeType {
    fn is_valid(&self, value: &str) -> bool {
        DateTime::parse_from_rfc3339(value).is_ok()
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(dt.with_timezone(&Utc).to_rfc3339());
        }
        for format in Self::NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Some(naive.and_utc().to_rfc3339());
            }
        }
        None
    }
}

/// Closed classification taxonomy
pub struct ClassificationType;

impl ClassificationType {
    const TAXONOMY: [&'static str; 23] = [
        "backdoor",
        "blacklist",
        "botnet drone",
        "brute-force",
        "c&c",
        "compromised",
        "ddos",
        "defacement",
        "dga domain",
        "dropzone",
        "exploit",
        "ids alert",
        "malware",
        "malware configuration",
        "other",
        "phishing",
        "proxy",
        "ransomware",
        "scanner",
        "spam",
        "test",
        "unknown",
        "vulnerable service",
    ];
}

impl FieldCapability for ClassificationType {
    fn is_valid(&self, value: &str) -> bool {
        Self::TAXONOMY.contains(&value)
    }

    fn sanitize(&self, value: &str) -> Option<String> {
        let lower = value.trim().to_lowercase();
        self.is_valid(&lower).then_some(lower)
    }
}
