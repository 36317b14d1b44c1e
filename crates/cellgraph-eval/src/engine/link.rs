//! Link traversal: one foreign-key hop at a time, in either direction.
//!
//! Every relationship reduces to association rows in `fk_host_table`
//! pairing `self_key` with `foreign_key` (see
//! [`LinkStorage`](cellgraph_common::LinkStorage)), so both directions are a
//! single batched `select_pairs` against the host table. Link cells written
//! earlier in the same pass are not in storage yet; the resolver reads them
//! from a [`LinkIndex`] of pending associations first.

use cellgraph_common::{CalcError, CalcResult, Field, FieldId, LinkOptions, RecordId, TableId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::traits::CalcContext;

/// Why a record was pulled into a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRefItem {
    pub record_id: RecordId,
    pub table_id: TableId,
    /// Link field crossed to reach this record.
    pub related_field_id: Option<FieldId>,
    /// Record on the owning side whose link cell points here.
    pub related_to_record_id: Option<RecordId>,
    /// Association column matched against the frontier.
    pub via_column: Option<String>,
}

impl RecordRefItem {
    pub fn new(record_id: RecordId, table_id: TableId) -> Self {
        Self {
            record_id,
            table_id,
            related_field_id: None,
            related_to_record_id: None,
            via_column: None,
        }
    }
}

/// Link field -> owning record -> foreign records, in cell order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkIndex {
    links: FxHashMap<FieldId, FxHashMap<RecordId, Vec<RecordId>>>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.links.values().all(|m| m.is_empty())
    }

    pub fn insert(&mut self, link: &FieldId, record: RecordId, foreign: Vec<RecordId>) {
        self.links
            .entry(link.clone())
            .or_default()
            .insert(record, foreign);
    }

    pub fn get(&self, link: &FieldId, record: &RecordId) -> Option<&[RecordId]> {
        self.links
            .get(link)
            .and_then(|m| m.get(record))
            .map(Vec::as_slice)
    }

    pub fn contains(&self, link: &FieldId, record: &RecordId) -> bool {
        self.get(link, record).is_some()
    }

    /// Entries of one link field, ordered by owning record id.
    pub fn entries(&self, link: &FieldId) -> Vec<(&RecordId, &[RecordId])> {
        let mut out: Vec<(&RecordId, &[RecordId])> = self
            .links
            .get(link)
            .into_iter()
            .flat_map(|m| m.iter().map(|(r, f)| (r, f.as_slice())))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// Owning records of `link` in this index.
    pub fn records(&self, link: &FieldId) -> Vec<RecordId> {
        self.entries(link).into_iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn extend(&mut self, other: LinkIndex) {
        for (link, entries) in other.links {
            self.links.entry(link).or_default().extend(entries);
        }
    }
}

pub(crate) fn link_options(field: &Field) -> CalcResult<&LinkOptions> {
    field
        .link_options()
        .ok_or_else(|| CalcError::UnsupportedFieldType {
            field_id: field.id.clone(),
            kind: field.kind.name(),
        })
}

pub struct LinkResolver<'a, C: CalcContext + ?Sized> {
    ctx: &'a C,
    pending: &'a LinkIndex,
}

impl<'a, C: CalcContext + ?Sized> LinkResolver<'a, C> {
    pub fn new(ctx: &'a C, pending: &'a LinkIndex) -> Self {
        Self { ctx, pending }
    }

    /// Foreign records each of `records` links to through `link`. Every
    /// queried record gets an entry, empty when it links to nothing.
    pub fn forward(&self, link: &Field, records: &[RecordId]) -> CalcResult<LinkIndex> {
        let mut out = LinkIndex::new();
        let mut stored_keys = Vec::new();
        for record in records {
            match self.pending.get(&link.id, record) {
                Some(ids) => out.insert(&link.id, record.clone(), ids.to_vec()),
                None => stored_keys.push(record.clone()),
            }
        }
        if !stored_keys.is_empty() {
            out.extend(self.forward_stored(link, &stored_keys)?);
        }
        Ok(out)
    }

    /// Stored associations only, ignoring pending link cells.
    pub fn forward_stored(&self, link: &Field, records: &[RecordId]) -> CalcResult<LinkIndex> {
        let opts = link_options(link)?;
        let mut grouped: FxHashMap<RecordId, Vec<RecordId>> =
            records.iter().map(|r| (r.clone(), Vec::new())).collect();
        if !records.is_empty() {
            let storage = &opts.storage;
            let pairs = self.ctx.select_pairs(
                &storage.fk_host_table,
                &storage.self_key,
                &storage.foreign_key,
                records,
            )?;
            for (record, foreign) in pairs {
                let ids = grouped.entry(record).or_default();
                if !ids.contains(&foreign) {
                    ids.push(foreign);
                }
            }
        }

        let mut out = LinkIndex::new();
        for (record, ids) in grouped {
            out.insert(&link.id, record, ids);
        }
        Ok(out)
    }

    /// Owning records whose `link` cell points at any of `foreign`, as
    /// `(owner, foreign)` pairs. Pending link cells replace what storage
    /// says for their owners.
    pub fn reverse(
        &self,
        link: &Field,
        foreign: &[RecordId],
    ) -> CalcResult<Vec<(RecordId, RecordId)>> {
        let mut pairs: Vec<(RecordId, RecordId)> = self
            .reverse_stored(link, foreign)?
            .into_iter()
            .filter(|(owner, _)| !self.pending.contains(&link.id, owner))
            .collect();

        let wanted: FxHashSet<&RecordId> = foreign.iter().collect();
        for (owner, ids) in self.pending.entries(&link.id) {
            for id in ids.iter().filter(|id| wanted.contains(id)) {
                pairs.push((owner.clone(), id.clone()));
            }
        }
        Ok(pairs)
    }

    pub fn reverse_stored(
        &self,
        link: &Field,
        foreign: &[RecordId],
    ) -> CalcResult<Vec<(RecordId, RecordId)>> {
        if foreign.is_empty() {
            return Ok(Vec::new());
        }
        let storage = &link_options(link)?.storage;
        let pairs = self.ctx.select_pairs(
            &storage.fk_host_table,
            &storage.foreign_key,
            &storage.self_key,
            foreign,
        )?;
        Ok(pairs.into_iter().map(|(f, owner)| (owner, f)).collect())
    }

    /// Reverse hop tagged for the loader: owners of `link` reached from
    /// `foreign`, deduplicated in discovery order.
    pub fn reverse_refs(&self, link: &Field, foreign: &[RecordId]) -> CalcResult<Vec<RecordRefItem>> {
        let opts = link_options(link)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(link = %link.id, frontier = foreign.len(), "reverse hop");

        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for (owner, _) in self.reverse(link, foreign)? {
            if seen.insert(owner.clone()) {
                out.push(RecordRefItem {
                    record_id: owner,
                    table_id: link.table_id.clone(),
                    related_field_id: Some(link.id.clone()),
                    related_to_record_id: None,
                    via_column: Some(opts.storage.foreign_key.clone()),
                });
            }
        }
        Ok(out)
    }
}
