// Cache key derivation.
// A key is the canonical JSON text of (call identity, parameters, configuration fingerprint).

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Deterministic key for one cached API call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct QueryKey<'a> {
    query: &'a str,
    parameters: Canonical<'a>,
    extra_cache_keys: &'a str,
}

#[derive(Serialize)]
struct RequestKey<'a> {
    route: &'a str,
    options: Canonical<'a>,
    extra_cache_keys: &'a str,
}

/// Serializes a parameter map with object keys sorted at every depth,
/// whatever order the map iterates in.
struct Canonical<'a>(&'a Map<String, Value>);

struct CanonicalValue<'a>(&'a Value);

fn serialize_sorted<S: Serializer>(
    map: &Map<String, Value>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = serializer.serialize_map(Some(entries.len()))?;
    for (name, value) in entries {
        out.serialize_entry(name, &CanonicalValue(value))?;
    }
    out.end()
}

impl Serialize for Canonical<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_sorted(self.0, serializer)
    }
}

impl Serialize for CanonicalValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => serialize_sorted(map, serializer),
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&CanonicalValue(item))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

impl CacheKey {
    /// Key for a GraphQL query with its variables.
    pub fn for_query(
        query: &str,
        parameters: &Map<String, Value>,
        extra_cache_keys: &str,
    ) -> Result<Self> {
        let text = serde_json::to_string(&QueryKey {
            query,
            parameters: Canonical(parameters),
            extra_cache_keys,
        })?;
        Ok(Self(text))
    }

    /// Key for a REST route template with its options.
    pub fn for_request(
        route: &str,
        options: &Map<String, Value>,
        extra_cache_keys: &str,
    ) -> Result<Self> {
        let text = serde_json::to_string(&RequestKey {
            route,
            options: Canonical(options),
            extra_cache_keys,
        })?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest of the key text, usable as a file name.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical serialization of a configuration value.
pub fn fingerprint<T: Serialize>(config: &T) -> Result<String> {
    Ok(serde_json::to_string(config)?)
}
