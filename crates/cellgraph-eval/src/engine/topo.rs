//! Dependency-ordered sequencing of one changed field and its dependents.

use cellgraph_common::{CalcError, CalcResult, Edge, FieldId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// One node of a topological order plus the fields feeding it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoItem {
    pub field_id: FieldId,
    pub dependencies: SmallVec<[FieldId; 4]>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Walk<'e> {
    outgoing: FxHashMap<&'e FieldId, Vec<&'e FieldId>>,
    marks: FxHashMap<&'e FieldId, Mark>,
    path: Vec<&'e FieldId>,
    post_order: Vec<&'e FieldId>,
}

impl<'e> Walk<'e> {
    fn visit(&mut self, node: &'e FieldId) -> CalcResult<()> {
        self.marks.insert(node, Mark::Visiting);
        self.path.push(node);

        let next: Vec<&'e FieldId> = self.outgoing.get(node).cloned().unwrap_or_default();
        for dependent in next {
            match self.marks.get(dependent) {
                Some(Mark::Visiting) => return Err(self.cycle_at(dependent)),
                Some(Mark::Done) => {}
                None => self.visit(dependent)?,
            }
        }

        self.path.pop();
        self.marks.insert(node, Mark::Done);
        self.post_order.push(node);
        Ok(())
    }

    fn cycle_at(&self, node: &FieldId) -> CalcError {
        let start = self.path.iter().position(|n| *n == node).unwrap_or(0);
        let mut path: Vec<FieldId> = self.path[start..].iter().map(|n| (*n).clone()).collect();
        path.push(node.clone());
        CalcError::CyclicDependency {
            field_id: node.clone(),
            path,
        }
    }
}

/// Order `start` and everything downstream of it so that every edge
/// `u -> v` among the visited nodes has `u` first.
///
/// Depth-first post-order over outgoing edges, reversed. Revisiting a node
/// that is still on the DFS stack fails with
/// [`CalcError::CyclicDependency`]. Each item's `dependencies` are its
/// direct incoming edges in `edges`, including ones from outside the
/// visited set.
pub fn topological_sequence(start: &FieldId, edges: &[Edge]) -> CalcResult<Vec<TopoItem>> {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("topo_sequence", start = %start, edges = edges.len()).entered();

    let mut outgoing: FxHashMap<&FieldId, Vec<&FieldId>> = FxHashMap::default();
    let mut incoming: FxHashMap<&FieldId, SmallVec<[FieldId; 4]>> = FxHashMap::default();
    for edge in edges {
        let out = outgoing.entry(&edge.from).or_default();
        if !out.contains(&&edge.to) {
            out.push(&edge.to);
        }
        let deps = incoming.entry(&edge.to).or_default();
        if !deps.contains(&edge.from) {
            deps.push(edge.from.clone());
        }
    }

    let mut walk = Walk {
        outgoing,
        marks: FxHashMap::default(),
        path: Vec::new(),
        post_order: Vec::new(),
    };
    walk.visit(start)?;

    Ok(walk
        .post_order
        .iter()
        .rev()
        .map(|id| TopoItem {
            field_id: (*id).clone(),
            dependencies: incoming.get(id).cloned().unwrap_or_default(),
        })
        .collect())
}
