use crate::{CellValue, FieldId, RecordId, TableId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A pending write supplied by the caller: the new value of one cell in the
/// origin table.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CellInput {
    pub record_id: RecordId,
    pub field_id: FieldId,
    pub new_value: CellValue,
}

impl CellInput {
    pub fn new<R, F, V>(record_id: R, field_id: F, new_value: V) -> Self
    where
        R: Into<RecordId>,
        F: Into<FieldId>,
        V: Into<CellValue>,
    {
        Self {
            record_id: record_id.into(),
            field_id: field_id.into(),
            new_value: new_value.into(),
        }
    }
}

/// One cell transition produced by a calculation pass.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CellChange {
    pub table_id: TableId,
    pub record_id: RecordId,
    pub field_id: FieldId,
    pub old_value: CellValue,
    pub new_value: CellValue,
}

/// Identity of a cell across tables; at most one change per key survives a
/// pass.
pub type CellKey = (TableId, RecordId, FieldId);

impl CellChange {
    pub fn key(&self) -> CellKey {
        (
            self.table_id.clone(),
            self.record_id.clone(),
            self.field_id.clone(),
        )
    }

    pub fn is_noop(&self) -> bool {
        self.old_value.same_value(&self.new_value)
    }
}

/// A directed reference edge: `from`'s value feeds `to`'s computation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub from: FieldId,
    pub to: FieldId,
}

impl Edge {
    pub fn new<A: Into<FieldId>, B: Into<FieldId>>(from: A, to: B) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}
