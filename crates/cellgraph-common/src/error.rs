//! Error taxonomy for a calculation pass.
//!
//! Every variant of [`CalcError`] is fatal for the pass: the caller rolls
//! back its transaction. An empty input is not an error; it yields an empty
//! change set.

use thiserror::Error;

use crate::{FieldId, RecordId, TableId};

/// Failure reported by a storage collaborator. The engine passes it through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("query against `{table}` failed: {message}")]
    Query { table: String, message: String },
    /// The surrounding transaction was aborted (timeout, conflict, shutdown).
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("cyclic dependency at field {field_id} (path: {})", display_path(.path))]
    CyclicDependency {
        field_id: FieldId,
        path: Vec<FieldId>,
    },
    #[error("field {field_id} on record {record_id} depends on missing record {missing}")]
    UnresolvedDependency {
        field_id: FieldId,
        record_id: RecordId,
        missing: RecordId,
    },
    #[error("field {field_id} of kind `{kind}` cannot be computed")]
    UnsupportedFieldType { field_id: FieldId, kind: &'static str },
    #[error("field {0} not found")]
    FieldNotFound(FieldId),
    #[error("table {0} not found")]
    TableNotFound(TableId),
    #[error("invalid formula on field {field_id}: {message}")]
    InvalidFormula { field_id: FieldId, message: String },
    #[error("link traversal exceeded {limit} hops")]
    TraversalLimit { limit: usize },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn display_path(path: &[FieldId]) -> String {
    path.iter()
        .map(FieldId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type CalcResult<T> = Result<T, CalcError>;
