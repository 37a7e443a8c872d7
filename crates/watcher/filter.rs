//! Filter predicates applied to every snapshot.

use crate::models::ItemRecord;
use rustc_hash::FxHashSet;
use serde_json::Value;

/// Narrows a snapshot down to the items worth a per-item notification.
///
/// Implementations must be pure: the same input always yields the same
/// subset, in input order.
pub trait ItemFilter: Send + Sync {
    fn matches<'a>(&self, items: &'a [ItemRecord]) -> Vec<&'a ItemRecord>;
}

/// Keeps every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ItemFilter for AcceptAll {
    fn matches<'a>(&self, items: &'a [ItemRecord]) -> Vec<&'a ItemRecord> {
        items.iter().collect()
    }
}

/// Keeps items whose flag attribute is `true` and whose badge attribute is
/// one of the allowed trim codes.
#[derive(Debug, Clone)]
pub struct TrimFilter {
    badge_key: String,
    allowed_badges: FxHashSet<String>,
    flag_key: String,
}

impl Default for TrimFilter {
    fn default() -> Self {
        Self::new("Badge", ["P85", "P85+"], "isAutopilot")
    }
}

impl TrimFilter {
    pub fn new<I, S>(
        badge_key: impl Into<String>,
        allowed_badges: I,
        flag_key: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            badge_key: badge_key.into(),
            allowed_badges: allowed_badges.into_iter().map(Into::into).collect(),
            flag_key: flag_key.into(),
        }
    }

    fn keeps(&self, item: &ItemRecord) -> bool {
        let flagged = matches!(item.attribute(&self.flag_key), Some(Value::Bool(true)));
        let allowed = match item.attribute(&self.badge_key) {
            Some(Value::String(badge)) => self.allowed_badges.contains(badge),
            _ => false,
        };
        flagged && allowed
    }
}

impl ItemFilter for TrimFilter {
    fn matches<'a>(&self, items: &'a [ItemRecord]) -> Vec<&'a ItemRecord> {
        items.iter().filter(|item| self.keeps(item)).collect()
    }
}
