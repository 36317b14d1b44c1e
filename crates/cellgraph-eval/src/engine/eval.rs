use cellgraph_common::{CalcError, CalcResult, CellChange, CellInput, Field, FieldId, RecordId, TableId};

use crate::engine::CalcConfig;
use crate::engine::affected::{AffectedPlan, AffectedPlanner};
use crate::engine::changes::ChangeCollector;
use crate::engine::evaluator::FieldEvaluator;
use crate::engine::graph::connected_component;
use crate::engine::loader::{LoadRequests, PendingWrite, RecordLoader};
use crate::engine::symmetric::derive_link_writes;
use crate::engine::topo::topological_sequence;
use crate::traits::CalcContext;

/// Stateless between passes: every [`Engine::calculate`] reads what it
/// needs through the context it is handed.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: CalcConfig,
}

impl Engine {
    pub fn new(config: CalcConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalcConfig {
        &self.config
    }

    /// Compute every cell change caused by `changes` on `origin_table`.
    ///
    /// The output holds the input cells themselves, link cells mirrored by
    /// them, and every computed cell downstream, at most once per cell.
    /// Nothing is written; the caller persists the result in the same
    /// transaction `ctx` reads from.
    pub fn calculate<C>(
        &self,
        ctx: &C,
        origin_table: &TableId,
        changes: Vec<CellInput>,
    ) -> CalcResult<Vec<CellChange>>
    where
        C: CalcContext + ?Sized,
    {
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("calculate", table = %origin_table, inputs = changes.len())
            .entered();

        let mut writes: Vec<PendingWrite> = changes
            .into_iter()
            .map(|c| PendingWrite::new(origin_table.clone(), c.record_id, c.field_id, c.new_value))
            .collect();
        let derived = derive_link_writes(ctx, &writes)?;
        writes.extend(derived.writes);

        let seeds = seed_records(&writes);
        let seed_ids: Vec<FieldId> = seeds.iter().map(|(f, _)| f.clone()).collect();
        let edges = connected_component(ctx, &seed_ids)?;

        let mut passes = Vec::with_capacity(seeds.len());
        for (field_id, records) in seeds {
            passes.push((topological_sequence(&field_id, &edges)?, records));
        }

        let plan = AffectedPlanner::new(ctx, &derived.pending, &self.config).plan(passes)?;
        let requests = load_requests(ctx, &plan)?;
        let loaded = RecordLoader::new(ctx).load(&requests.into_requests(), &writes)?;
        let mut records = loaded.records;

        let mut collector = ChangeCollector::new();
        collector.extend(loaded.overlaid);

        {
            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!("evaluate", passes = plan.passes.len()).entered();

            let mut evaluator = FieldEvaluator::new(&self.config);
            for pass in &plan.passes {
                for (idx, planned) in pass.iter().enumerate() {
                    let field = lookup_field(ctx, &planned.item.field_id)?;
                    // The seed holds caller values; only links are refreshed
                    // to pick up titles.
                    if idx == 0 && field.link_options().is_none() {
                        continue;
                    }
                    for record_id in &planned.records {
                        let change =
                            evaluator.evaluate(field, record_id, &records, &plan.associations)?;
                        records.set(
                            &change.table_id,
                            &change.record_id,
                            &change.field_id,
                            change.new_value.clone(),
                        );
                        collector.push(change);
                    }
                }
            }
        }

        Ok(collector.finish(self.config.skip_noop_changes))
    }
}

fn lookup_field<'c, C: CalcContext + ?Sized>(ctx: &'c C, id: &FieldId) -> CalcResult<&'c Field> {
    ctx.field(id)
        .ok_or_else(|| CalcError::FieldNotFound(id.clone()))
}

/// Written fields with the records written, in first-write order.
fn seed_records(writes: &[PendingWrite]) -> Vec<(FieldId, Vec<RecordId>)> {
    let mut seeds: Vec<(FieldId, Vec<RecordId>)> = Vec::new();
    for write in writes {
        let at = match seeds.iter().position(|(f, _)| f == &write.field_id) {
            Some(at) => at,
            None => {
                seeds.push((write.field_id.clone(), Vec::new()));
                seeds.len() - 1
            }
        };
        if !seeds[at].1.contains(&write.record_id) {
            seeds[at].1.push(write.record_id.clone());
        }
    }
    seeds
}

/// Records and columns the evaluation reads, per table.
fn load_requests<C: CalcContext + ?Sized>(ctx: &C, plan: &AffectedPlan) -> CalcResult<LoadRequests> {
    let mut requests = LoadRequests::new();
    for planned in plan.passes.iter().flatten() {
        requests.add_records(&planned.table_id, &planned.records);
    }
    requests.add_refs(&plan.refs);

    for planned in plan.passes.iter().flatten() {
        let computed = lookup_field(ctx, &planned.item.field_id)?;
        requests.add_column(&computed.table_id, &computed.id);
        for dep in &planned.item.dependencies {
            let upstream = lookup_field(ctx, dep)?;
            requests.add_column(&upstream.table_id, &upstream.id);
        }
        if let Some(opts) = computed.link_options() {
            requests.add_column(&opts.foreign_table_id, &opts.lookup_field_id);
        }
        if let Some(opts) = computed.lookup_options() {
            requests.add_column(&opts.foreign_table_id, &opts.lookup_field_id);
        }
    }
    Ok(requests)
}
