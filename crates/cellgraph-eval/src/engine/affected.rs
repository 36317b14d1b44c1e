//! Affected-record planning.
//!
//! Walks each topological order once, turning the seed records into the
//! records every later field must be recomputed for. Same-table
//! dependencies pass their records through; a dependency on a link's
//! foreign lookup field crosses the link backwards. Link, lookup and rollup
//! fields then get their foreign records resolved forwards so the evaluator
//! can bind them.

use cellgraph_common::{CalcError, CalcResult, Field, FieldId, FieldKind, RecordId, TableId};
use rustc_hash::FxHashMap;

use crate::engine::CalcConfig;
use crate::engine::link::{LinkIndex, LinkResolver, RecordRefItem};
use crate::engine::topo::TopoItem;
use crate::traits::CalcContext;

/// A topological item bound to the records it must be evaluated for.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub item: TopoItem,
    pub table_id: TableId,
    pub records: Vec<RecordId>,
}

#[derive(Debug, Clone, Default)]
pub struct AffectedPlan {
    /// One pass per seed field, each in topological order.
    pub passes: Vec<Vec<PlannedItem>>,
    /// Foreign records of every link crossed by a planned item.
    pub associations: LinkIndex,
    /// Every record pulled in by traversal, with the reason.
    pub refs: Vec<RecordRefItem>,
}

/// Field on the far side of a link that a computed field reads.
fn foreign_source(field: &Field) -> Option<&FieldId> {
    match &field.kind {
        FieldKind::Link(opts) => Some(&opts.lookup_field_id),
        FieldKind::Lookup(opts) => Some(&opts.lookup_field_id),
        FieldKind::Rollup(opts) => Some(&opts.lookup.lookup_field_id),
        _ => None,
    }
}

fn push_unique(into: &mut Vec<RecordId>, records: impl IntoIterator<Item = RecordId>) {
    for record in records {
        if !into.contains(&record) {
            into.push(record);
        }
    }
}

pub struct AffectedPlanner<'a, C: CalcContext + ?Sized> {
    ctx: &'a C,
    resolver: LinkResolver<'a, C>,
    max_hops: Option<usize>,
    hops: usize,
}

impl<'a, C: CalcContext + ?Sized> AffectedPlanner<'a, C> {
    pub fn new(ctx: &'a C, pending: &'a LinkIndex, config: &CalcConfig) -> Self {
        Self {
            ctx,
            resolver: LinkResolver::new(ctx, pending),
            max_hops: config.max_traversal_hops,
            hops: 0,
        }
    }

    /// Link hops taken so far.
    pub fn hops(&self) -> usize {
        self.hops
    }

    fn field(&self, id: &FieldId) -> CalcResult<&'a Field> {
        self.ctx
            .field(id)
            .ok_or_else(|| CalcError::FieldNotFound(id.clone()))
    }

    fn hop(&mut self) -> CalcResult<()> {
        self.hops += 1;
        match self.max_hops {
            Some(limit) if self.hops > limit => Err(CalcError::TraversalLimit { limit }),
            _ => Ok(()),
        }
    }

    /// Plan every pass. `passes` pairs each topological order with the
    /// records its first item (the seed) changed on.
    pub fn plan(&mut self, passes: Vec<(Vec<TopoItem>, Vec<RecordId>)>) -> CalcResult<AffectedPlan> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("link_traversal", passes = passes.len()).entered();

        let mut plan = AffectedPlan::default();
        for (order, seed_records) in passes {
            let planned = self.plan_pass(order, &seed_records, &mut plan.refs)?;
            plan.passes.push(planned);
        }
        self.resolve_associations(&mut plan)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(hops = self.hops(), refs = plan.refs.len(), "traversal planned");
        Ok(plan)
    }

    /// Records each item of one order must be evaluated for.
    pub fn plan_pass(
        &mut self,
        order: Vec<TopoItem>,
        seed_records: &[RecordId],
        refs: &mut Vec<RecordRefItem>,
    ) -> CalcResult<Vec<PlannedItem>> {
        let mut affected: FxHashMap<FieldId, Vec<RecordId>> = FxHashMap::default();
        let mut planned = Vec::with_capacity(order.len());

        for (idx, item) in order.into_iter().enumerate() {
            let field = self.field(&item.field_id)?;
            let mut records = Vec::new();
            if idx == 0 {
                push_unique(&mut records, seed_records.iter().cloned());
            } else {
                for dep in &item.dependencies {
                    let Some(frontier) = affected.get(dep).filter(|f| !f.is_empty()) else {
                        continue;
                    };
                    if foreign_source(field) == Some(dep) {
                        let via = field.via_link_field().unwrap_or(&field.id);
                        let link = self.field(via)?;
                        self.hop()?;
                        let found = self.resolver.reverse_refs(link, frontier)?;
                        push_unique(&mut records, found.iter().map(|r| r.record_id.clone()));
                        refs.extend(found);
                    } else if self.field(dep)?.table_id == field.table_id {
                        push_unique(&mut records, frontier.iter().cloned());
                    } else {
                        return Err(CalcError::UnsupportedFieldType {
                            field_id: field.id.clone(),
                            kind: field.kind.name(),
                        });
                    }
                }
            }

            affected.insert(item.field_id.clone(), records.clone());
            planned.push(PlannedItem {
                item,
                table_id: field.table_id.clone(),
                records,
            });
        }
        Ok(planned)
    }

    /// One batched forward hop per link field crossed by a planned link,
    /// lookup or rollup item.
    fn resolve_associations(&mut self, plan: &mut AffectedPlan) -> CalcResult<()> {
        let mut by_link: Vec<(FieldId, Vec<RecordId>)> = Vec::new();
        for item in plan.passes.iter().flatten() {
            let field = self.field(&item.item.field_id)?;
            let Some(via) = field.via_link_field() else {
                continue;
            };
            match by_link.iter_mut().find(|(l, _)| l == via) {
                Some((_, records)) => push_unique(records, item.records.iter().cloned()),
                None => by_link.push((via.clone(), item.records.clone())),
            }
        }

        for (link_id, records) in by_link {
            if records.is_empty() {
                continue;
            }
            let link = self.field(&link_id)?;
            let Some(opts) = link.link_options() else {
                return Err(CalcError::UnsupportedFieldType {
                    field_id: link.id.clone(),
                    kind: link.kind.name(),
                });
            };
            let found = self.resolver.forward(link, &records)?;
            for owner in &records {
                let foreign = found.get(&link_id, owner).unwrap_or_default();
                for id in foreign {
                    plan.refs.push(RecordRefItem {
                        record_id: id.clone(),
                        table_id: opts.foreign_table_id.clone(),
                        related_field_id: Some(link_id.clone()),
                        related_to_record_id: Some(owner.clone()),
                        via_column: None,
                    });
                }
            }
            plan.associations.extend(found);
        }
        Ok(())
    }
}
