//! Tests for deriving reference edges from field definitions.
use super::common::{edges, ids};
use crate::engine::graph::MemoryReferenceStore;
use crate::engine::references::{field_references, sync_field_references};
use crate::test_base::TestBase;
use cellgraph_common::{CalcError, Field, Relationship};

#[test]
fn test_formula_references_in_first_use_order() {
    let field = Field::formula("f", "T", "{b} + {a} * {b}");
    assert_eq!(field_references(&field).unwrap(), ids(&["b", "a"]));
}

#[test]
fn test_plain_fields_reference_nothing() {
    assert!(field_references(&Field::number("n", "T")).unwrap().is_empty());
    assert!(field_references(&Field::text("t", "T")).unwrap().is_empty());
}

#[test]
fn test_link_lookup_and_rollup_references() {
    let base = TestBase::new().with_table("A").with_table("B");
    let link = base.link_field("l", "A", Relationship::ManyOne, "B", "title", None);
    assert_eq!(field_references(&link).unwrap(), ids(&["title"]));

    let lookup = TestBase::lookup_field("k", "A", "l", "B", "score");
    assert_eq!(field_references(&lookup).unwrap(), ids(&["l", "score"]));

    let rollup = TestBase::rollup_field("r", "A", "l", "B", "score", "sum({values})");
    assert_eq!(field_references(&rollup).unwrap(), ids(&["l", "score"]));
}

#[test]
fn test_malformed_formula_is_invalid() {
    let err = field_references(&Field::formula("f", "T", "{a} +")).unwrap_err();
    assert!(matches!(err, CalcError::InvalidFormula { ref field_id, .. } if field_id.as_str() == "f"));
}

#[test]
fn test_sync_replaces_incoming_edges() {
    let mut store = MemoryReferenceStore::new();
    sync_field_references(&mut store, &Field::formula("f", "T", "{a} + {b}")).unwrap();
    sync_field_references(&mut store, &Field::formula("g", "T", "{f}")).unwrap();
    assert_eq!(store.edges(), edges(&[("a", "f"), ("b", "f"), ("f", "g")]).as_slice());

    // Redefining f drops a and b, keeps f's outgoing edge.
    sync_field_references(&mut store, &Field::formula("f", "T", "{c} * 2")).unwrap();
    assert_eq!(store.edges(), edges(&[("f", "g"), ("c", "f")]).as_slice());
}
