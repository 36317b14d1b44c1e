//! Reference edges and the weakly-connected component query.

use cellgraph_common::{CalcResult, Edge, FieldId, StorageError};
use rustc_hash::FxHashSet;

use crate::traits::ReferenceStore;

/// Edge table kept in memory. Hosts with a relational store implement
/// [`ReferenceStore`] over their own edge table instead.
#[derive(Debug, Clone, Default)]
pub struct MemoryReferenceStore {
    edges: Vec<Edge>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl ReferenceStore for MemoryReferenceStore {
    fn edges_touching(&self, field_ids: &[FieldId]) -> Result<Vec<Edge>, StorageError> {
        Ok(self
            .edges
            .iter()
            .filter(|e| field_ids.contains(&e.from) || field_ids.contains(&e.to))
            .cloned()
            .collect())
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), StorageError> {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
        Ok(())
    }

    fn remove_edges_to(&mut self, field_id: &FieldId) -> Result<(), StorageError> {
        self.edges.retain(|e| &e.to != field_id);
        Ok(())
    }
}

/// Every edge in the weakly-connected component(s) holding `seeds`.
///
/// Worklist over the store: each round asks for the edges touching the
/// current frontier in one batched query, and any endpoint not seen yet
/// joins the next frontier. Edges come back in discovery order, without
/// repeats.
pub fn connected_component<S>(store: &S, seeds: &[FieldId]) -> CalcResult<Vec<Edge>>
where
    S: ReferenceStore + ?Sized,
{
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("component_query", seeds = seeds.len()).entered();

    let mut known: FxHashSet<FieldId> = FxHashSet::default();
    let mut frontier: Vec<FieldId> = Vec::new();
    for seed in seeds {
        if known.insert(seed.clone()) {
            frontier.push(seed.clone());
        }
    }

    let mut seen_edges: FxHashSet<Edge> = FxHashSet::default();
    let mut edges = Vec::new();
    let mut rounds = 0usize;

    while !frontier.is_empty() {
        rounds += 1;
        let mut next = Vec::new();
        for edge in store.edges_touching(&frontier)? {
            for end in [&edge.from, &edge.to] {
                if known.insert(end.clone()) {
                    next.push(end.clone());
                }
            }
            if seen_edges.insert(edge.clone()) {
                edges.push(edge);
            }
        }
        frontier = next;
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(rounds, edges = edges.len(), "component resolved");
    #[cfg(not(feature = "tracing"))]
    let _ = rounds;

    Ok(edges)
}
