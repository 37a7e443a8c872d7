use crate::models::ItemRecord;
use rustc_hash::FxHashSet;

/// Identifiers observed in any completed cycle.
///
/// Accumulate-only: there is no way to forget an identifier, so `len` never
/// decreases over the lifetime of the set.
#[derive(Debug, Clone, Default)]
pub struct SeenSet {
    identifiers: FxHashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Folds every item identifier into the set and returns how many of them
    /// were not present before.
    pub fn update<'a, I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = &'a ItemRecord>,
    {
        items
            .into_iter()
            .filter(|item| self.identifiers.insert(item.identifier.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}
