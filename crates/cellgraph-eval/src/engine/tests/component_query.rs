//! Tests for the weakly-connected component query.
use super::common::{CountingStore, edges, ids};
use crate::engine::graph::{MemoryReferenceStore, connected_component};
use crate::traits::ReferenceStore;
use cellgraph_common::Edge;

#[test]
fn test_component_follows_edges_in_both_directions() {
    let store = CountingStore::new(edges(&[("a", "b"), ("c", "b"), ("c", "d"), ("x", "y")]));
    let found = connected_component(&store, &ids(&["a"])).unwrap();
    assert_eq!(found, edges(&[("a", "b"), ("c", "b"), ("c", "d")]));
}

#[test]
fn test_seeds_share_one_query_per_round() {
    let store = CountingStore::new(edges(&[("a", "b"), ("c", "b"), ("c", "d"), ("x", "y")]));
    let found = connected_component(&store, &ids(&["a", "x"])).unwrap();
    assert_eq!(found.len(), 4);
    // {a,x} -> {b,y} -> {c} -> {d}
    assert_eq!(store.calls.get(), 4);
}

#[test]
fn test_empty_seed_set_issues_no_query() {
    let store = CountingStore::new(edges(&[("a", "b")]));
    assert!(connected_component(&store, &[]).unwrap().is_empty());
    assert_eq!(store.calls.get(), 0);
}

#[test]
fn test_unknown_seed_yields_no_edges() {
    let store = CountingStore::new(edges(&[("a", "b")]));
    assert!(connected_component(&store, &ids(&["zzz"])).unwrap().is_empty());
    assert_eq!(store.calls.get(), 1);
}

#[test]
fn test_memory_store_edges() {
    let mut store = MemoryReferenceStore::new();
    store.add_edge(Edge::new("a", "c")).unwrap();
    store.add_edge(Edge::new("b", "c")).unwrap();
    store.add_edge(Edge::new("b", "c")).unwrap();
    store.add_edge(Edge::new("c", "d")).unwrap();
    assert_eq!(store.len(), 3);

    store.remove_edges_to(&"c".into()).unwrap();
    assert_eq!(store.edges(), edges(&[("c", "d")]).as_slice());
    assert_eq!(
        store.edges_touching(&ids(&["d"])).unwrap(),
        edges(&[("c", "d")])
    );
}
