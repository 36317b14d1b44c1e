//! Cross-table record loading.

use cellgraph_common::{CalcError, CalcResult, CellChange, CellValue, FieldId, RecordId, TableId};

use crate::engine::link::RecordRefItem;
use crate::record::RecordMap;
use crate::traits::CalcContext;

/// A cell value written in this pass but not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub table_id: TableId,
    pub record_id: RecordId,
    pub field_id: FieldId,
    pub value: CellValue,
}

impl PendingWrite {
    pub fn new(table_id: TableId, record_id: RecordId, field_id: FieldId, value: CellValue) -> Self {
        Self {
            table_id,
            record_id,
            field_id,
            value,
        }
    }
}

/// Records and columns to read from one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub table_id: TableId,
    pub record_ids: Vec<RecordId>,
    pub columns: Vec<FieldId>,
}

/// Accumulates load requests, one per table, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct LoadRequests {
    requests: Vec<LoadRequest>,
}

impl LoadRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, table: &TableId) -> &mut LoadRequest {
        let idx = match self.requests.iter().position(|r| &r.table_id == table) {
            Some(idx) => idx,
            None => {
                self.requests.push(LoadRequest {
                    table_id: table.clone(),
                    record_ids: Vec::new(),
                    columns: Vec::new(),
                });
                self.requests.len() - 1
            }
        };
        &mut self.requests[idx]
    }

    pub fn add_records<'r, I>(&mut self, table: &TableId, records: I)
    where
        I: IntoIterator<Item = &'r RecordId>,
    {
        let slot = self.slot(table);
        for record in records {
            if !slot.record_ids.contains(record) {
                slot.record_ids.push(record.clone());
            }
        }
    }

    pub fn add_refs(&mut self, refs: &[RecordRefItem]) {
        for item in refs {
            self.add_records(&item.table_id, [&item.record_id]);
        }
    }

    pub fn add_column(&mut self, table: &TableId, column: &FieldId) {
        let slot = self.slot(table);
        if !slot.columns.contains(column) {
            slot.columns.push(column.clone());
        }
    }

    pub fn into_requests(self) -> Vec<LoadRequest> {
        self.requests
    }
}

/// Loaded projection plus the transitions produced by overlaying pending
/// writes onto it.
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: RecordMap,
    pub overlaid: Vec<CellChange>,
}

pub struct RecordLoader<'a, C: CalcContext + ?Sized> {
    ctx: &'a C,
}

impl<'a, C: CalcContext + ?Sized> RecordLoader<'a, C> {
    pub fn new(ctx: &'a C) -> Self {
        Self { ctx }
    }

    /// One fetch per table covering every requested record and column,
    /// then the pending writes laid over the fetched values. Tables with no
    /// records to read are never queried.
    pub fn load(
        &self,
        requests: &[LoadRequest],
        overlay: &[PendingWrite],
    ) -> CalcResult<LoadedRecords> {
        let mut merged = LoadRequests::new();
        for request in requests {
            merged.add_records(&request.table_id, &request.record_ids);
            for column in &request.columns {
                merged.add_column(&request.table_id, column);
            }
        }
        for write in overlay {
            merged.add_records(&write.table_id, [&write.record_id]);
            merged.add_column(&write.table_id, &write.field_id);
        }

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("record_load", tables = merged.requests.len()).entered();

        let mut loaded = LoadedRecords::default();
        for request in merged.into_requests() {
            if request.record_ids.is_empty() {
                continue;
            }
            let location = self
                .ctx
                .location(&request.table_id)
                .ok_or_else(|| CalcError::TableNotFound(request.table_id.clone()))?;
            let fetched = self
                .ctx
                .fetch_records(location, &request.record_ids, &request.columns)?;
            #[cfg(feature = "tracing")]
            tracing::trace!(table = %request.table_id, requested = request.record_ids.len(), fetched = fetched.len(), "table loaded");
            for record in fetched {
                loaded.records.insert(request.table_id.clone(), record);
            }
        }

        for write in overlay {
            let old_value = loaded.records.set(
                &write.table_id,
                &write.record_id,
                &write.field_id,
                write.value.clone(),
            );
            loaded.overlaid.push(CellChange {
                table_id: write.table_id.clone(),
                record_id: write.record_id.clone(),
                field_id: write.field_id.clone(),
                old_value,
                new_value: write.value.clone(),
            });
        }
        Ok(loaded)
    }
}
