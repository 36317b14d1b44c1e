//! Tests for the cross-table record loader.
use super::common::linked_base;
use crate::engine::loader::{LoadRequest, LoadRequests, PendingWrite, RecordLoader};
use cellgraph_common::{CalcError, CellValue, FieldId, RecordId, TableId};

fn request(table: &str, records: &[&str], columns: &[&str]) -> LoadRequest {
    LoadRequest {
        table_id: TableId::from(table),
        record_ids: records.iter().map(|r| RecordId::from(*r)).collect(),
        columns: columns.iter().map(|c| FieldId::from(*c)).collect(),
    }
}

#[test]
fn test_empty_request_returns_empty_map_without_queries() {
    let base = linked_base();
    base.reset_queries();
    let loaded = RecordLoader::new(&base).load(&[], &[]).unwrap();
    assert!(loaded.records.is_empty());
    assert!(loaded.overlaid.is_empty());
    assert_eq!(base.query_count(), 0);
}

#[test]
fn test_tables_without_records_are_not_queried() {
    let base = linked_base();
    base.reset_queries();
    let loaded = RecordLoader::new(&base)
        .load(&[request("A", &[], &["aName"])], &[])
        .unwrap();
    assert!(loaded.records.is_empty());
    assert_eq!(base.query_count(), 0);
}

#[test]
fn test_one_fetch_per_table_restricted_to_columns() {
    let base = linked_base();
    base.reset_queries();
    let requests = [
        request("A", &["r1"], &["aName"]),
        request("B", &["r2"], &["bName"]),
        request("A", &["r0"], &[]),
        request("B", &["r3", "r2"], &["bScore"]),
    ];
    let loaded = RecordLoader::new(&base).load(&requests, &[]).unwrap();
    assert_eq!(base.query_count(), 2);
    assert_eq!(loaded.records.records(&"A".into()).count(), 2);
    assert_eq!(loaded.records.records(&"B".into()).count(), 2);

    let r1 = loaded.records.get(&"A".into(), &"r1".into()).unwrap();
    assert_eq!(r1.value(&"aName".into()), CellValue::from("one"));
    let r3 = loaded.records.get(&"B".into(), &"r3".into()).unwrap();
    assert_eq!(r3.value(&"bScore".into()), CellValue::Number(7.0));
    assert_eq!(r3.value(&"bName".into()), CellValue::from("three"));
    assert!(loaded.records.get(&"A".into(), &"r0".into()).is_some());
}

#[test]
fn test_pending_writes_overlay_stored_values() {
    let base = linked_base();
    let overlay = [
        PendingWrite::new("B".into(), "r2".into(), "bScore".into(), CellValue::Number(9.0)),
        PendingWrite::new("B".into(), "r9".into(), "bName".into(), CellValue::from("new")),
    ];
    let loaded = RecordLoader::new(&base)
        .load(&[request("B", &["r2"], &["bName"])], &overlay)
        .unwrap();

    let r2 = loaded.records.get(&"B".into(), &"r2".into()).unwrap();
    assert_eq!(r2.value(&"bScore".into()), CellValue::Number(9.0));
    assert_eq!(r2.value(&"bName".into()), CellValue::from("two"));

    assert_eq!(loaded.overlaid.len(), 2);
    assert_eq!(loaded.overlaid[0].old_value, CellValue::Number(5.0));
    assert_eq!(loaded.overlaid[0].new_value, CellValue::Number(9.0));
    // Records unknown to storage are created by the overlay.
    assert_eq!(loaded.overlaid[1].old_value, CellValue::Null);
    assert!(loaded.records.get(&"B".into(), &"r9".into()).is_some());
}

#[test]
fn test_unknown_table_fails() {
    let base = linked_base();
    let err = RecordLoader::new(&base)
        .load(&[request("Z", &["r1"], &[])], &[])
        .unwrap_err();
    assert_eq!(err, CalcError::TableNotFound("Z".into()));
}

#[test]
fn test_request_builder_merges_per_table() {
    let mut requests = LoadRequests::new();
    requests.add_records(&"A".into(), &[RecordId::from("r1"), RecordId::from("r1")]);
    requests.add_column(&"A".into(), &"aName".into());
    requests.add_column(&"A".into(), &"aName".into());
    requests.add_records(&"B".into(), &[RecordId::from("r2")]);
    let built = requests.into_requests();
    assert_eq!(built, vec![request("A", &["r1"], &["aName"]), request("B", &["r2"], &[])]);
}
