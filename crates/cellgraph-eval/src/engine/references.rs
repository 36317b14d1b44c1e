//! Reference edges derived from field definitions.

use cellgraph_common::{CalcError, CalcResult, Edge, Field, FieldId, FieldKind};

use crate::engine::graph::connected_component;
use crate::engine::topo::topological_sequence;
use crate::traits::ReferenceStore;

/// Upstream fields a field's value is computed from, in declaration order.
pub fn field_references(field: &Field) -> CalcResult<Vec<FieldId>> {
    let refs = match &field.kind {
        FieldKind::Text | FieldKind::Number | FieldKind::Checkbox => Vec::new(),
        FieldKind::Formula(opts) => cellgraph_parse::parse(&opts.expression)
            .map_err(|e| CalcError::InvalidFormula {
                field_id: field.id.clone(),
                message: e.to_string(),
            })?
            .references(),
        FieldKind::Link(opts) => vec![opts.lookup_field_id.clone()],
        FieldKind::Lookup(opts) => vec![opts.link_field_id.clone(), opts.lookup_field_id.clone()],
        FieldKind::Rollup(opts) => vec![
            opts.lookup.link_field_id.clone(),
            opts.lookup.lookup_field_id.clone(),
        ],
    };
    Ok(refs)
}

/// Replace a field's incoming edges with the ones its current definition
/// implies. A definition that would close a cycle is rejected before the
/// store is touched.
pub fn sync_field_references<S>(store: &mut S, field: &Field) -> CalcResult<()>
where
    S: ReferenceStore + ?Sized,
{
    let refs = field_references(field)?;
    if refs.contains(&field.id) {
        return Err(CalcError::CyclicDependency {
            field_id: field.id.clone(),
            path: vec![field.id.clone(), field.id.clone()],
        });
    }

    let mut seeds = refs.clone();
    seeds.push(field.id.clone());
    let mut candidate: Vec<Edge> = connected_component(&*store, &seeds)?
        .into_iter()
        .filter(|e| e.to != field.id)
        .collect();
    candidate.extend(refs.iter().map(|from| Edge::new(from.clone(), field.id.clone())));

    // Any cycle the new edges close runs through this field.
    topological_sequence(&field.id, &candidate)?;

    store.remove_edges_to(&field.id)?;
    for from in refs {
        store.add_edge(Edge::new(from, field.id.clone()))?;
    }
    Ok(())
}
