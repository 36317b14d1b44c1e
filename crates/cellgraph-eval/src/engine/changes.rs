//! Change collection and merging.

use cellgraph_common::{CellChange, CellKey};
use rustc_hash::FxHashMap;

/// Collapse repeated changes to the same cell: the first change's old
/// value, the last change's new value, in first-seen order.
pub fn merge_changes(changes: Vec<CellChange>) -> Vec<CellChange> {
    let mut index: FxHashMap<CellKey, usize> = FxHashMap::default();
    let mut merged: Vec<CellChange> = Vec::with_capacity(changes.len());
    for change in changes {
        match index.get(&change.key()) {
            Some(&at) => merged[at].new_value = change.new_value,
            None => {
                index.insert(change.key(), merged.len());
                merged.push(change);
            }
        }
    }
    merged
}

#[derive(Debug, Default)]
pub struct ChangeCollector {
    changes: Vec<CellChange>,
}

impl ChangeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: CellChange) {
        self.changes.push(change);
    }

    pub fn extend<I: IntoIterator<Item = CellChange>>(&mut self, changes: I) {
        self.changes.extend(changes);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Merged output. With `skip_noop` set, cells whose merged value did
    /// not change are dropped.
    pub fn finish(self, skip_noop: bool) -> Vec<CellChange> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("merge_changes", collected = self.changes.len()).entered();

        let merged = merge_changes(self.changes);
        if !skip_noop {
            return merged;
        }
        merged
            .into_iter()
            .filter(|change| {
                let noop = change.is_noop();
                if noop {
                    trace_skipped(change);
                }
                !noop
            })
            .collect()
    }
}

#[cfg(feature = "tracing")]
fn trace_skipped(change: &CellChange) {
    tracing::debug!(
        table = %change.table_id,
        record = %change.record_id,
        field = %change.field_id,
        "skipping no-op change"
    );
}

#[cfg(not(feature = "tracing"))]
fn trace_skipped(_change: &CellChange) {}
