//! crates/cellgraph-eval/src/test_base.rs
//! --------------------------------------
//! In-memory base (tables, link keys, reference edges) for unit and
//! property tests. Counts every storage query it answers.
use std::cell::Cell;

use cellgraph_common::{
    CalcResult, CellChange, CellValue, Edge, Field, FieldId, FieldKind, ID_COLUMN, LinkOptions,
    LinkRef, LinkStorage, LookupOptions, RecordId, Relationship, RollupOptions, StorageError,
    TableId,
};
use rustc_hash::FxHashMap;

use crate::engine::graph::MemoryReferenceStore;
use crate::engine::references::sync_field_references;
use crate::record::Record;
use crate::traits::{FieldProvider, RecordStore, ReferenceStore, TableProvider};

#[derive(Debug, Clone)]
struct Row {
    id: RecordId,
    cells: FxHashMap<FieldId, CellValue>,
    /// Foreign-key columns (`__fk_*`).
    keys: FxHashMap<String, RecordId>,
}

impl Row {
    fn new(id: RecordId) -> Self {
        Self {
            id,
            cells: FxHashMap::default(),
            keys: FxHashMap::default(),
        }
    }

    fn column(&self, name: &str) -> Option<&RecordId> {
        if name == ID_COLUMN {
            Some(&self.id)
        } else {
            self.keys.get(name)
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PhysicalTable {
    rows: Vec<Row>,
}

impl PhysicalTable {
    fn row(&self, id: &RecordId) -> Option<&Row> {
        self.rows.iter().find(|r| &r.id == id)
    }

    fn row_mut(&mut self, id: &RecordId) -> &mut Row {
        let idx = match self.rows.iter().position(|r| &r.id == id) {
            Some(idx) => idx,
            None => {
                self.rows.push(Row::new(id.clone()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[idx]
    }
}

#[derive(Debug, Default)]
pub struct TestBase {
    fields: FxHashMap<FieldId, Field>,
    locations: FxHashMap<TableId, String>,
    storage: FxHashMap<String, PhysicalTable>,
    references: MemoryReferenceStore,
    queries: Cell<usize>,
}

impl TestBase {
    /* ─────────────── constructors ─────────────── */
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table stored at `tbl_<id>`.
    pub fn with_table(mut self, table: &str) -> Self {
        let location = format!("tbl_{table}");
        self.storage.entry(location.clone()).or_default();
        self.locations.insert(TableId::from(table), location);
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field).expect("field definition rejected");
        self
    }

    pub fn with_record(mut self, table: &str, record: Record) -> Self {
        self.insert_record(table, record);
        self
    }

    /// A link field on `table` plus its symmetric field on `foreign_table`.
    /// `relationship` is seen from `table`.
    pub fn with_link_pair(
        mut self,
        link: &str,
        table: &str,
        relationship: Relationship,
        symmetric: &str,
        foreign_table: &str,
        lookup: &str,
        symmetric_lookup: &str,
    ) -> Self {
        let forward = self.link_field(link, table, relationship, foreign_table, lookup, Some(symmetric));
        let back = self.link_field(
            symmetric,
            foreign_table,
            relationship.reverse(),
            table,
            symmetric_lookup,
            Some(link),
        );
        self.add_field(forward).expect("link rejected");
        self.add_field(back).expect("symmetric link rejected");
        self
    }

    /// Set a link cell in storage: keys, the cell itself and the symmetric
    /// cells of the foreign records involved.
    pub fn with_link(mut self, link: &str, record: &str, foreign: &[&str]) -> Self {
        let field = self.fields.get(&FieldId::from(link)).cloned().expect("unknown link field");
        let ids: Vec<RecordId> = foreign.iter().map(|f| RecordId::from(*f)).collect();
        let value = self.link_cell(&field, &ids);
        self.write_link(&field, &RecordId::from(record), &ids, value);
        self
    }

    /* ─────────────── field helpers ─────────────── */
    pub fn location_of(&self, table: &str) -> String {
        self.locations
            .get(&TableId::from(table))
            .cloned()
            .unwrap_or_else(|| format!("tbl_{table}"))
    }

    pub fn link_field(
        &self,
        id: &str,
        table: &str,
        relationship: Relationship,
        foreign_table: &str,
        lookup: &str,
        symmetric: Option<&str>,
    ) -> Field {
        let field_id = FieldId::from(id);
        let symmetric = symmetric.map(FieldId::from);
        let storage = LinkStorage::for_relationship(
            &field_id,
            relationship,
            symmetric.as_ref(),
            &self.location_of(table),
            &self.location_of(foreign_table),
        );
        Field::new(
            field_id,
            table,
            FieldKind::Link(LinkOptions {
                relationship,
                foreign_table_id: TableId::from(foreign_table),
                lookup_field_id: FieldId::from(lookup),
                symmetric_field_id: symmetric,
                storage,
            }),
        )
    }

    pub fn lookup_field(id: &str, table: &str, link: &str, foreign_table: &str, lookup: &str) -> Field {
        Field::new(
            id,
            table,
            FieldKind::Lookup(LookupOptions {
                link_field_id: FieldId::from(link),
                foreign_table_id: TableId::from(foreign_table),
                lookup_field_id: FieldId::from(lookup),
            }),
        )
    }

    pub fn rollup_field(
        id: &str,
        table: &str,
        link: &str,
        foreign_table: &str,
        lookup: &str,
        expression: &str,
    ) -> Field {
        Field::new(
            id,
            table,
            FieldKind::Rollup(RollupOptions {
                expression: expression.to_string(),
                lookup: LookupOptions {
                    link_field_id: FieldId::from(link),
                    foreign_table_id: TableId::from(foreign_table),
                    lookup_field_id: FieldId::from(lookup),
                },
            }),
        )
    }

    /* ─────────────── mutation ─────────────── */
    /// Define or redefine a field, re-deriving its incoming edges.
    pub fn add_field(&mut self, field: Field) -> CalcResult<()> {
        sync_field_references(&mut self.references, &field)?;
        self.fields.insert(field.id.clone(), field);
        Ok(())
    }

    pub fn insert_record(&mut self, table: &str, record: Record) {
        let location = self.location_of(table);
        let row = self.storage.entry(location).or_default().row_mut(&record.id);
        row.cells.extend(record.fields);
    }

    /// Persist a calculation result the way a host would: cell values, and
    /// foreign keys for link cells.
    pub fn apply(&mut self, changes: &[CellChange]) {
        for change in changes {
            let location = self.location_of(change.table_id.as_str());
            self.storage
                .entry(location)
                .or_default()
                .row_mut(&change.record_id)
                .cells
                .insert(change.field_id.clone(), change.new_value.clone());

            if let Some(field) = self.fields.get(&change.field_id).cloned() {
                if field.link_options().is_some() {
                    self.write_keys(&field, &change.record_id, &change.new_value.link_ids());
                }
            }
        }
    }

    /* ─────────────── inspection ─────────────── */
    pub fn cell(&self, table: &str, record: &str, field: &str) -> CellValue {
        self.storage
            .get(&self.location_of(table))
            .and_then(|t| t.row(&RecordId::from(record)))
            .and_then(|r| r.cells.get(&FieldId::from(field)))
            .cloned()
            .unwrap_or_default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    pub fn reset_queries(&self) {
        self.queries.set(0);
    }

    pub fn references(&self) -> &MemoryReferenceStore {
        &self.references
    }

    /* ─────────────── internals ─────────────── */
    fn count(&self) {
        self.queries.set(self.queries.get() + 1);
    }

    fn link_cell(&self, field: &Field, ids: &[RecordId]) -> CellValue {
        let Some(opts) = field.link_options() else {
            return CellValue::Null;
        };
        let foreign = self.storage.get(&self.location_of(opts.foreign_table_id.as_str()));
        let ends = ids
            .iter()
            .map(|id| {
                let title = foreign
                    .and_then(|t| t.row(id))
                    .and_then(|r| r.cells.get(&opts.lookup_field_id))
                    .filter(|v| !v.is_null());
                match title {
                    Some(t) => LinkRef::new(id.clone()).with_title(t.to_string()),
                    None => LinkRef::new(id.clone()),
                }
            })
            .collect();
        CellValue::from_links(ends, field.is_multiple)
    }

    fn write_link(&mut self, field: &Field, record: &RecordId, ids: &[RecordId], value: CellValue) {
        let Some(opts) = field.link_options().cloned() else {
            return;
        };
        let location = self.location_of(field.table_id.as_str());
        self.storage
            .entry(location)
            .or_default()
            .row_mut(record)
            .cells
            .insert(field.id.clone(), value);
        self.write_keys(field, record, ids);

        let Some(symmetric) = opts
            .symmetric_field_id
            .as_ref()
            .and_then(|s| self.fields.get(s))
            .cloned()
        else {
            return;
        };
        let foreign_location = self.location_of(opts.foreign_table_id.as_str());
        let foreign_ids: Vec<RecordId> = self
            .storage
            .get(&foreign_location)
            .map(|t| t.rows.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default();
        let Some(storage) = symmetric.link_options().map(|o| o.storage.clone()) else {
            return;
        };
        for foreign in foreign_ids {
            let owners: Vec<RecordId> = self
                .pairs(&storage.fk_host_table, &storage.self_key, &storage.foreign_key, &[foreign.clone()])
                .into_iter()
                .map(|(_, owner)| owner)
                .collect();
            let cell = self.link_cell(&symmetric, &owners);
            self.storage
                .entry(foreign_location.clone())
                .or_default()
                .row_mut(&foreign)
                .cells
                .insert(symmetric.id.clone(), cell);
        }
    }

    fn write_keys(&mut self, field: &Field, record: &RecordId, ids: &[RecordId]) {
        let Some(opts) = field.link_options() else {
            return;
        };
        let s = &opts.storage;
        let host = self.storage.entry(s.fk_host_table.clone()).or_default();
        if s.foreign_key == ID_COLUMN {
            for row in host.rows.iter_mut() {
                if row.keys.get(&s.self_key) == Some(record) {
                    row.keys.remove(&s.self_key);
                }
            }
            for id in ids {
                host.row_mut(id).keys.insert(s.self_key.clone(), record.clone());
            }
        } else if s.self_key == ID_COLUMN {
            let row = host.row_mut(record);
            match ids.first() {
                Some(id) => row.keys.insert(s.foreign_key.clone(), id.clone()),
                None => row.keys.remove(&s.foreign_key),
            };
        } else {
            host.rows.retain(|row| row.keys.get(&s.self_key) != Some(record));
            for id in ids {
                let mut row = Row::new(RecordId::new(format!("{record}:{id}")));
                row.keys.insert(s.self_key.clone(), record.clone());
                row.keys.insert(s.foreign_key.clone(), id.clone());
                host.rows.push(row);
            }
        }
    }

    fn pairs(
        &self,
        location: &str,
        key_column: &str,
        value_column: &str,
        keys: &[RecordId],
    ) -> Vec<(RecordId, RecordId)> {
        let Some(table) = self.storage.get(location) else {
            return Vec::new();
        };
        table
            .rows
            .iter()
            .filter_map(|row| {
                let key = row.column(key_column)?;
                let value = row.column(value_column)?;
                keys.contains(key).then(|| (key.clone(), value.clone()))
            })
            .collect()
    }
}

/* ─────────────── collaborator traits ─────────────── */
impl ReferenceStore for TestBase {
    fn edges_touching(&self, field_ids: &[FieldId]) -> Result<Vec<Edge>, StorageError> {
        self.count();
        self.references.edges_touching(field_ids)
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), StorageError> {
        self.references.add_edge(edge)
    }

    fn remove_edges_to(&mut self, field_id: &FieldId) -> Result<(), StorageError> {
        self.references.remove_edges_to(field_id)
    }
}

impl RecordStore for TestBase {
    fn fetch_records(
        &self,
        location: &str,
        record_ids: &[RecordId],
        columns: &[FieldId],
    ) -> Result<Vec<Record>, StorageError> {
        self.count();
        let table = self.storage.get(location).ok_or_else(|| StorageError::Query {
            table: location.to_string(),
            message: "no such table".to_string(),
        })?;
        Ok(record_ids
            .iter()
            .filter_map(|id| table.row(id))
            .map(|row| {
                let mut record = Record::new(row.id.clone());
                for column in columns {
                    if let Some(value) = row.cells.get(column) {
                        record.fields.insert(column.clone(), value.clone());
                    }
                }
                record
            })
            .collect())
    }

    fn select_pairs(
        &self,
        location: &str,
        key_column: &str,
        value_column: &str,
        keys: &[RecordId],
    ) -> Result<Vec<(RecordId, RecordId)>, StorageError> {
        self.count();
        Ok(self.pairs(location, key_column, value_column, keys))
    }
}

impl FieldProvider for TestBase {
    fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.get(id)
    }
}

impl TableProvider for TestBase {
    fn location(&self, table_id: &TableId) -> Option<&str> {
        self.locations.get(table_id).map(String::as_str)
    }
}
