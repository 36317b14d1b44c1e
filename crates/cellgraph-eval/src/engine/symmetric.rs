//! Link cell writes and the writes they imply elsewhere.
//!
//! Writing a link cell moves association rows, which changes other link
//! cells too: the symmetric field on each foreign record gained or lost,
//! and on single-owner relationships the link cell of the record that
//! owned a stolen foreign record. Those writes are derived here so the
//! rest of the pass treats them like caller input.

use cellgraph_common::{CalcError, CalcResult, CellValue, Field, LinkRef, RecordId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::link::{LinkIndex, LinkResolver, link_options};
use crate::engine::loader::PendingWrite;
use crate::traits::CalcContext;

#[derive(Debug, Default)]
pub struct LinkDerivation {
    /// Link cells written in this pass, caller input and derived alike.
    pub pending: LinkIndex,
    /// Writes implied by the caller's link writes.
    pub writes: Vec<PendingWrite>,
}

fn link_value(ids: &[RecordId], multiple: bool) -> CellValue {
    CellValue::from_links(ids.iter().cloned().map(LinkRef::new).collect(), multiple)
}

fn group_pairs(pairs: Vec<(RecordId, RecordId)>) -> FxHashMap<RecordId, Vec<RecordId>> {
    let mut out: FxHashMap<RecordId, Vec<RecordId>> = FxHashMap::default();
    for (owner, foreign) in pairs {
        let owners = out.entry(foreign).or_default();
        if !owners.contains(&owner) {
            owners.push(owner);
        }
    }
    out
}

pub fn derive_link_writes<C>(ctx: &C, writes: &[PendingWrite]) -> CalcResult<LinkDerivation>
where
    C: CalcContext + ?Sized,
{
    let mut by_link: Vec<(&Field, Vec<(RecordId, Vec<RecordId>)>)> = Vec::new();
    for write in writes {
        let field = ctx
            .field(&write.field_id)
            .ok_or_else(|| CalcError::FieldNotFound(write.field_id.clone()))?;
        if field.link_options().is_none() {
            continue;
        }
        let entry = (write.record_id.clone(), write.value.link_ids());
        match by_link.iter_mut().find(|(f, _)| f.id == field.id) {
            Some((_, entries)) => entries.push(entry),
            None => by_link.push((field, vec![entry])),
        }
    }

    let mut out = LinkDerivation::default();
    let nothing_pending = LinkIndex::new();
    for (link, entries) in by_link {
        let opts = link_options(link)?;
        let stored_view = LinkResolver::new(ctx, &nothing_pending);
        let records: Vec<RecordId> = entries.iter().map(|(r, _)| r.clone()).collect();
        let stored = stored_view.forward_stored(link, &records)?;

        let mut touched: Vec<RecordId> = Vec::new();
        let mut added: Vec<RecordId> = Vec::new();
        for (record, ids) in &entries {
            let before = stored.get(&link.id, record).unwrap_or_default();
            for id in ids.iter().filter(|id| !before.contains(id)) {
                if !added.contains(id) {
                    added.push(id.clone());
                }
            }
            for id in before.iter().chain(ids.iter()) {
                let moved = !before.contains(id) || !ids.contains(id);
                if moved && !touched.contains(id) {
                    touched.push(id.clone());
                }
            }
            out.pending.insert(&link.id, record.clone(), ids.clone());
        }

        // Single-owner sides: a foreign record linked here leaves its
        // previous owner's cell.
        if !opts.relationship.reverse().is_multiple() && !added.is_empty() {
            let written: FxHashSet<&RecordId> = records.iter().collect();
            let mut stolen: Vec<(RecordId, Vec<RecordId>)> = Vec::new();
            for (owner, foreign) in stored_view.reverse_stored(link, &added)? {
                if written.contains(&owner) {
                    continue;
                }
                match stolen.iter_mut().find(|(o, _)| *o == owner) {
                    Some((_, lost)) => lost.push(foreign),
                    None => stolen.push((owner, vec![foreign])),
                }
            }
            if !stolen.is_empty() {
                let owners: Vec<RecordId> = stolen.iter().map(|(o, _)| o.clone()).collect();
                let previous = stored_view.forward_stored(link, &owners)?;
                for (owner, lost) in stolen {
                    let kept: Vec<RecordId> = previous
                        .get(&link.id, &owner)
                        .unwrap_or_default()
                        .iter()
                        .filter(|id| !lost.contains(id))
                        .cloned()
                        .collect();
                    out.writes.push(PendingWrite::new(
                        link.table_id.clone(),
                        owner.clone(),
                        link.id.clone(),
                        link_value(&kept, link.is_multiple),
                    ));
                    out.pending.insert(&link.id, owner, kept);
                }
            }
        }

        let Some(symmetric_id) = &opts.symmetric_field_id else {
            continue;
        };
        let symmetric = ctx
            .field(symmetric_id)
            .ok_or_else(|| CalcError::FieldNotFound(symmetric_id.clone()))?;
        let before = group_pairs(stored_view.reverse_stored(link, &touched)?);
        let after = group_pairs(LinkResolver::new(ctx, &out.pending).reverse(link, &touched)?);
        for foreign in touched {
            let old_owners = before.get(&foreign).cloned().unwrap_or_default();
            let new_owners = after.get(&foreign).cloned().unwrap_or_default();
            let unchanged = old_owners.len() == new_owners.len()
                && old_owners.iter().all(|o| new_owners.contains(o));
            if unchanged {
                continue;
            }
            out.writes.push(PendingWrite::new(
                symmetric.table_id.clone(),
                foreign.clone(),
                symmetric.id.clone(),
                link_value(&new_owners, symmetric.is_multiple),
            ));
            out.pending.insert(&symmetric.id, foreign, new_owners);
        }
    }

    Ok(out)
}
