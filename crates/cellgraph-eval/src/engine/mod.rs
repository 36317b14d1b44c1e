//! Cellgraph incremental recalculation engine
//!
//! Turns a batch of pending cell writes into the full, merged set of cell
//! changes they cause across linked tables.

pub mod affected;
pub mod changes;
pub mod eval;
pub mod evaluator;
pub mod graph;
pub mod link;
pub mod loader;
pub mod references;
pub mod symmetric;
pub mod topo;

#[cfg(test)]
mod tests;

pub use affected::{AffectedPlan, AffectedPlanner, PlannedItem};
pub use changes::{ChangeCollector, merge_changes};
pub use eval::Engine;
pub use evaluator::FieldEvaluator;
pub use graph::{MemoryReferenceStore, connected_component};
pub use link::{LinkIndex, LinkResolver, RecordRefItem};
pub use loader::{LoadRequest, LoadRequests, LoadedRecords, PendingWrite, RecordLoader};
pub use references::{field_references, sync_field_references};
pub use topo::{TopoItem, topological_sequence};

/// Configuration for a calculation pass
#[derive(Debug, Clone)]
pub struct CalcConfig {
    /// Drop merged changes whose new value equals the old one.
    pub skip_noop_changes: bool,
    /// Upper bound on link hops walked per pass.
    pub max_traversal_hops: Option<usize>,
    /// Separator for array results written to single-valued fields.
    pub array_join_separator: String,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            skip_noop_changes: false,
            max_traversal_hops: None,
            array_join_separator: ", ".to_string(),
        }
    }
}
