use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One inventory entry as returned by the remote listing.
///
/// The attribute map is whatever the source sent; nothing is validated beyond
/// the identifier key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub identifier: String,
    pub attributes: Map<String, Value>,
}

impl ItemRecord {
    /// Builds a record from a JSON object, reading the identifier from
    /// `identifier_key`. Strings are taken as-is and numbers are rendered in
    /// decimal; anything else yields `None`.
    pub fn from_object(attributes: Map<String, Value>, identifier_key: &str) -> Option<Self> {
        let identifier = match attributes.get(identifier_key)? {
            Value::String(raw) if !raw.is_empty() => raw.clone(),
            Value::Number(number) => number.to_string(),
            _ => return None,
        };
        Some(Self {
            identifier,
            attributes,
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// Counters collected while processing a single snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub matched: usize,
    pub new_overall: usize,
    pub new_matched: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
    /// Messages built but not handed to a transport (disabled or suppressed).
    pub notifications_skipped: usize,
    pub seen_total: usize,
}
