//! Rendering of the notification texts sent by the watcher.

use crate::models::ItemRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder used when an item lacks one of the grouping keys.
const MISSING_VALUE: &str = "-";

/// Which items the summary breakdown is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownScope {
    /// Only the items first seen in this cycle.
    #[default]
    #[serde(rename = "new")]
    NewItems,
    /// The whole snapshot fetched in this cycle.
    Snapshot,
}

/// Per-group item counts keyed by the values of a fixed list of attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    keys: Vec<String>,
    groups: BTreeMap<Vec<String>, usize>,
}

impl Breakdown {
    pub fn from_items<'a, I>(keys: &[String], items: I) -> Self
    where
        I: IntoIterator<Item = &'a ItemRecord>,
    {
        let mut groups: BTreeMap<Vec<String>, usize> = BTreeMap::new();
        for item in items {
            let group = keys
                .iter()
                .map(|key| render_value(item.attribute(key)))
                .collect();
            *groups.entry(group).or_default() += 1;
        }
        Self {
            keys: keys.to_vec(),
            groups,
        }
    }

    /// Count for the group whose rendered values equal `values`, in key order.
    #[cfg(test)]
    fn count(&self, values: &[&str]) -> usize {
        self.groups
            .iter()
            .find(|(group, _)| group.iter().map(String::as_str).eq(values.iter().copied()))
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.groups.values().sum()
    }

    #[cfg(test)]
    fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl fmt::Display for Breakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return write!(f, "all: {}", self.total());
        }
        for (index, (group, count)) in self.groups.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            let labels: Vec<String> = self
                .keys
                .iter()
                .zip(group)
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            write!(f, "{}: {count}", labels.join(" "))?;
        }
        Ok(())
    }
}

/// Per-item message for a newly seen item that passed the filter.
pub fn spotted_message(item: &ItemRecord) -> String {
    let mut fields: Vec<(&String, &Value)> = item.attributes.iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));
    let body: Vec<String> = fields
        .into_iter()
        .map(|(key, value)| format!("{key}: {}", render_value(Some(value))))
        .collect();
    format!("Spotted new: ```{}```", body.join("\n"))
}

/// Cycle summary announcing how many identifiers were seen for the first time.
pub fn summary_message(new_count: usize, breakdown: &Breakdown) -> String {
    format!("Added {new_count} new items: ```{breakdown}```")
}

fn render_value(value: Option<&Value>) -> String {
    match value {
        None => MISSING_VALUE.to_owned(),
        Some(Value::String(raw)) => raw.clone(),
        Some(other) => other.to_string(),
    }
}
