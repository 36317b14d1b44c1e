//! Per-pass, in-memory projection of the records a calculation touches.

use cellgraph_common::{CellValue, FieldId, RecordId, TableId};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: FxHashMap<FieldId, CellValue>,
}

impl Record {
    pub fn new<I: Into<RecordId>>(id: I) -> Self {
        Self {
            id: id.into(),
            fields: FxHashMap::default(),
        }
    }

    pub fn with_value<F: Into<FieldId>, V: Into<CellValue>>(mut self, field: F, value: V) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &FieldId) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Cell value, null when the column was not loaded or is empty.
    pub fn value(&self, field: &FieldId) -> CellValue {
        self.fields.get(field).cloned().unwrap_or_default()
    }
}

/// Loaded records keyed by logical table, then record id.
#[derive(Debug, Clone, Default)]
pub struct RecordMap {
    tables: FxHashMap<TableId, FxHashMap<RecordId, Record>>,
}

impl RecordMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.is_empty())
    }

    pub fn insert(&mut self, table: TableId, record: Record) {
        self.tables
            .entry(table)
            .or_default()
            .insert(record.id.clone(), record);
    }

    pub fn get(&self, table: &TableId, record: &RecordId) -> Option<&Record> {
        self.tables.get(table).and_then(|t| t.get(record))
    }

    pub fn records(&self, table: &TableId) -> impl Iterator<Item = &Record> {
        self.tables.get(table).into_iter().flat_map(|t| t.values())
    }

    /// Write a cell into the projection, creating the record entry when the
    /// record was not loaded (a record created in the same transaction).
    /// Returns the previous value, null when absent.
    pub fn set(
        &mut self,
        table: &TableId,
        record: &RecordId,
        field: &FieldId,
        value: CellValue,
    ) -> CellValue {
        self.tables
            .entry(table.clone())
            .or_default()
            .entry(record.clone())
            .or_insert_with(|| Record::new(record.clone()))
            .fields
            .insert(field.clone(), value)
            .unwrap_or_default()
    }
}
