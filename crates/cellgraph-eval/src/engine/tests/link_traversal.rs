//! Tests for link hops and affected-record planning.
use super::common::{linked_base, many_many_base};
use crate::engine::CalcConfig;
use crate::engine::affected::AffectedPlanner;
use crate::engine::graph::connected_component;
use crate::engine::link::{LinkIndex, LinkResolver};
use crate::engine::topo::topological_sequence;
use crate::traits::FieldProvider;
use cellgraph_common::{CalcError, FieldId, ID_COLUMN, RecordId};

fn rids(items: &[&str]) -> Vec<RecordId> {
    items.iter().map(|s| RecordId::from(*s)).collect()
}

#[test]
fn test_one_many_forward_and_reverse() {
    let base = linked_base().with_link("aLinks", "r1", &["r2", "r3"]);
    let pending = LinkIndex::new();
    let resolver = LinkResolver::new(&base, &pending);
    let link = base.field(&"aLinks".into()).unwrap();

    let found = resolver.forward(link, &rids(&["r1", "r0"])).unwrap();
    assert_eq!(found.get(&link.id, &"r1".into()), Some(rids(&["r2", "r3"]).as_slice()));
    assert_eq!(found.get(&link.id, &"r0".into()), Some(&[][..]));

    let owners = resolver.reverse(link, &rids(&["r3"])).unwrap();
    assert_eq!(owners, vec![(RecordId::from("r1"), RecordId::from("r3"))]);
}

#[test]
fn test_symmetric_side_reads_the_same_rows() {
    let base = linked_base().with_link("aLinks", "r1", &["r2"]);
    let pending = LinkIndex::new();
    let resolver = LinkResolver::new(&base, &pending);
    let back = base.field(&"bOwner".into()).unwrap();

    let found = resolver.forward(back, &rids(&["r2", "r3"])).unwrap();
    assert_eq!(found.get(&back.id, &"r2".into()), Some(rids(&["r1"]).as_slice()));
    assert_eq!(found.get(&back.id, &"r3".into()), Some(&[][..]));
}

#[test]
fn test_null_foreign_key_contributes_nothing() {
    let base = linked_base();
    let pending = LinkIndex::new();
    let resolver = LinkResolver::new(&base, &pending);
    let best = base.field(&"aBest".into()).unwrap();

    let found = resolver.forward(best, &rids(&["r1"])).unwrap();
    assert_eq!(found.get(&best.id, &"r1".into()), Some(&[][..]));
    assert!(resolver.reverse(best, &rids(&["r2"])).unwrap().is_empty());
}

#[test]
fn test_pending_links_shadow_storage() {
    let base = linked_base().with_link("aLinks", "r1", &["r2", "r3"]);
    let mut pending = LinkIndex::new();
    pending.insert(&"aLinks".into(), "r0".into(), rids(&["r3"]));
    let resolver = LinkResolver::new(&base, &pending);
    let link = base.field(&"aLinks".into()).unwrap();

    base.reset_queries();
    let found = resolver.forward(link, &rids(&["r0"])).unwrap();
    assert_eq!(found.get(&link.id, &"r0".into()), Some(rids(&["r3"]).as_slice()));
    assert_eq!(base.query_count(), 0, "pending cells need no query");

    let owners = resolver.reverse(link, &rids(&["r3"])).unwrap();
    assert_eq!(
        owners,
        vec![
            (RecordId::from("r1"), RecordId::from("r3")),
            (RecordId::from("r0"), RecordId::from("r3")),
        ]
    );

    // A pending cell replaces the stored one for its owner.
    pending.insert(&"aLinks".into(), "r1".into(), rids(&["r2"]));
    let resolver = LinkResolver::new(&base, &pending);
    let owners = resolver.reverse(link, &rids(&["r3"])).unwrap();
    assert_eq!(owners, vec![(RecordId::from("r0"), RecordId::from("r3"))]);
}

#[test]
fn test_reverse_refs_are_tagged() {
    let base = linked_base().with_link("aLinks", "r1", &["r2", "r3"]);
    let pending = LinkIndex::new();
    let resolver = LinkResolver::new(&base, &pending);
    let link = base.field(&"aLinks".into()).unwrap();

    let refs = resolver.reverse_refs(link, &rids(&["r2", "r3"])).unwrap();
    assert_eq!(refs.len(), 1, "one owner reached twice is listed once");
    assert_eq!(refs[0].record_id.as_str(), "r1");
    assert_eq!(refs[0].table_id.as_str(), "A");
    assert_eq!(refs[0].related_field_id, Some(FieldId::from("aLinks")));
    assert_eq!(refs[0].via_column.as_deref(), Some(ID_COLUMN));
}

#[test]
fn test_many_many_junction_both_ways() {
    let base = many_many_base().with_link("cTags", "c1", &["d1", "d2"]);
    let pending = LinkIndex::new();
    let resolver = LinkResolver::new(&base, &pending);
    let tags = base.field(&"cTags".into()).unwrap();
    let items = base.field(&"dItems".into()).unwrap();

    let found = resolver.forward(tags, &rids(&["c1"])).unwrap();
    assert_eq!(found.get(&tags.id, &"c1".into()), Some(rids(&["d1", "d2"]).as_slice()));

    let back = resolver.forward(items, &rids(&["d2"])).unwrap();
    assert_eq!(back.get(&items.id, &"d2".into()), Some(rids(&["c1"]).as_slice()));
}

#[test]
fn test_plan_without_links_keeps_frontier() {
    let base = super::common::diamond_base();
    let pending = LinkIndex::new();
    let component = base.references().edges().to_vec();
    let order = topological_sequence(&"a".into(), &component).unwrap();

    let plan = AffectedPlanner::new(&base, &pending, &CalcConfig::default())
        .plan(vec![(order, rids(&["r1"]))])
        .unwrap();
    assert_eq!(plan.passes.len(), 1);
    for item in &plan.passes[0] {
        assert_eq!(item.records, rids(&["r1"]), "{}", item.item.field_id);
    }
    assert!(plan.refs.is_empty());
    assert!(plan.associations.is_empty());
}

#[test]
fn test_plan_crosses_link_backwards_and_binds_foreign_records() {
    let base = linked_base().with_link("aLinks", "r1", &["r2", "r3"]);
    let pending = LinkIndex::new();
    let component = connected_component(&base, &["bName".into()]).unwrap();
    let order = topological_sequence(&"bName".into(), &component).unwrap();

    let mut planner = AffectedPlanner::new(&base, &pending, &CalcConfig::default());
    let plan = planner.plan(vec![(order, rids(&["r2"]))]).unwrap();

    for item in &plan.passes[0][1..] {
        assert_eq!(item.table_id.as_str(), "A");
        let expected = if item.item.field_id.as_str() == "aBest" {
            vec![]
        } else {
            rids(&["r1"])
        };
        assert_eq!(item.records, expected, "{}", item.item.field_id);
    }
    // aLinks, aBest and aNames each cross back once; aTotal rides on aLinks.
    assert_eq!(planner.hops(), 3);
    assert_eq!(
        plan.associations.get(&"aLinks".into(), &"r1".into()),
        Some(rids(&["r2", "r3"]).as_slice())
    );
    let forward: Vec<_> = plan
        .refs
        .iter()
        .filter(|r| r.related_to_record_id.is_some())
        .map(|r| r.record_id.as_str())
        .collect();
    assert_eq!(forward, ["r2", "r3"]);
}

#[test]
fn test_plan_respects_hop_limit() {
    let base = linked_base().with_link("aLinks", "r1", &["r2"]);
    let pending = LinkIndex::new();
    let component = connected_component(&base, &["bName".into()]).unwrap();
    let order = topological_sequence(&"bName".into(), &component).unwrap();
    let config = CalcConfig {
        max_traversal_hops: Some(1),
        ..CalcConfig::default()
    };

    let err = AffectedPlanner::new(&base, &pending, &config)
        .plan(vec![(order, rids(&["r2"]))])
        .unwrap_err();
    assert_eq!(err, CalcError::TraversalLimit { limit: 1 });
}
