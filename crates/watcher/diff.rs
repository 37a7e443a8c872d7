use crate::models::ItemRecord;
use crate::seen::SeenSet;
use rustc_hash::FxHashSet;

/// Items of one snapshot that were not in the seen set.
///
/// Both lists keep snapshot order and hold each identifier at most once; the
/// first occurrence of a duplicated identifier wins.
#[derive(Debug, Default)]
pub struct SnapshotDiff<'a> {
    pub new_overall: Vec<&'a ItemRecord>,
    pub new_matched: Vec<&'a ItemRecord>,
}

impl SnapshotDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.new_overall.is_empty()
    }
}

/// Computes the newly seen items of `snapshot` and of its filtered subset
/// `matched` against `seen`. The seen set itself is left untouched.
pub fn diff_snapshot<'a>(
    snapshot: &'a [ItemRecord],
    matched: &[&'a ItemRecord],
    seen: &SeenSet,
) -> SnapshotDiff<'a> {
    SnapshotDiff {
        new_overall: unseen(snapshot.iter(), seen),
        new_matched: unseen(matched.iter().copied(), seen),
    }
}

fn unseen<'a>(
    items: impl Iterator<Item = &'a ItemRecord>,
    seen: &SeenSet,
) -> Vec<&'a ItemRecord> {
    let mut emitted: FxHashSet<&'a str> = FxHashSet::default();
    let mut fresh = Vec::new();
    for item in items {
        if !seen.contains(&item.identifier) && emitted.insert(item.identifier.as_str()) {
            fresh.push(item);
        }
    }
    fresh
}
