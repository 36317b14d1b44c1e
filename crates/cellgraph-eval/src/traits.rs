//! cellgraph-eval – collaborator traits
//!
//! The engine owns no storage. Everything it reads goes through these
//! traits, implemented by the host over one open transaction.

use cellgraph_common::{Edge, Field, FieldId, RecordId, StorageError, TableId};

use crate::record::Record;

/* ───────────────────────── Reference graph ───────────────────────── */

/// Persisted `from -> to` reference edges between fields.
pub trait ReferenceStore {
    /// Every edge whose `from` or `to` is one of `field_ids`.
    fn edges_touching(&self, field_ids: &[FieldId]) -> Result<Vec<Edge>, StorageError>;

    fn add_edge(&mut self, edge: Edge) -> Result<(), StorageError>;

    /// Drop every edge pointing at `field_id` (its incoming references).
    fn remove_edges_to(&mut self, field_id: &FieldId) -> Result<(), StorageError>;
}

/* ───────────────────────── Record storage ───────────────────────── */

pub trait RecordStore {
    /// One batched read from a physical table, restricted to `record_ids`
    /// and to the `columns` listed. Unknown ids are skipped.
    fn fetch_records(
        &self,
        location: &str,
        record_ids: &[RecordId],
        columns: &[FieldId],
    ) -> Result<Vec<Record>, StorageError>;

    /// Rows of `location` whose `key_column` is one of `keys` and whose
    /// `value_column` is not null, as `(key, value)` pairs in storage order.
    /// `__id` names the row's own id.
    fn select_pairs(
        &self,
        location: &str,
        key_column: &str,
        value_column: &str,
        keys: &[RecordId],
    ) -> Result<Vec<(RecordId, RecordId)>, StorageError>;
}

/* ───────────────────────── Metadata ───────────────────────── */

pub trait FieldProvider {
    fn field(&self, id: &FieldId) -> Option<&Field>;
}

pub trait TableProvider {
    /// Physical location (storage table name) of a logical table.
    fn location(&self, table_id: &TableId) -> Option<&str>;
}

/// Everything a calculation pass needs, usually one object wrapping the
/// host's transaction and metadata caches.
pub trait CalcContext: ReferenceStore + RecordStore + FieldProvider + TableProvider {}

impl<T> CalcContext for T where T: ReferenceStore + RecordStore + FieldProvider + TableProvider + ?Sized
{}
