//! Common test helpers
use std::cell::Cell;

use cellgraph_common::{
    CellChange, CellValue, Edge, Field, FieldId, LinkRef, RecordId, Relationship, StorageError, TableId,
};

use crate::record::Record;
use crate::test_base::TestBase;
use crate::traits::{FieldProvider, RecordStore, ReferenceStore, TableProvider};

pub fn edges(pairs: &[(&str, &str)]) -> Vec<Edge> {
    pairs.iter().map(|(a, b)| Edge::new(*a, *b)).collect()
}

pub fn ids(items: &[&str]) -> Vec<FieldId> {
    items.iter().map(|s| FieldId::from(*s)).collect()
}

pub fn link(id: &str, title: &str) -> CellValue {
    CellValue::Link(LinkRef::new(id).with_title(title))
}

pub fn links(items: &[(&str, &str)]) -> CellValue {
    CellValue::Array(items.iter().map(|(id, title)| link(id, title)).collect())
}

pub fn find<'c>(changes: &'c [CellChange], table: &str, record: &str, field: &str) -> &'c CellChange {
    let mut hits = changes.iter().filter(|c| {
        c.table_id.as_str() == table && c.record_id.as_str() == record && c.field_id.as_str() == field
    });
    let hit = hits
        .next()
        .unwrap_or_else(|| panic!("no change for {table}/{record}/{field}: {changes:#?}"));
    assert!(hits.next().is_none(), "duplicate change for {table}/{record}/{field}");
    hit
}

pub fn has_change(changes: &[CellChange], table: &str, record: &str, field: &str) -> bool {
    changes.iter().any(|c| {
        c.table_id.as_str() == table && c.record_id.as_str() == record && c.field_id.as_str() == field
    })
}

/// Reference store that counts `edges_touching` round trips.
#[derive(Default)]
pub struct CountingStore {
    pub edges: Vec<Edge>,
    pub calls: Cell<usize>,
}

impl CountingStore {
    pub fn new(edges: Vec<Edge>) -> Self {
        Self {
            edges,
            calls: Cell::new(0),
        }
    }
}

impl ReferenceStore for CountingStore {
    fn edges_touching(&self, field_ids: &[FieldId]) -> Result<Vec<Edge>, StorageError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self
            .edges
            .iter()
            .filter(|e| field_ids.contains(&e.from) || field_ids.contains(&e.to))
            .cloned()
            .collect())
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), StorageError> {
        self.edges.push(edge);
        Ok(())
    }

    fn remove_edges_to(&mut self, field_id: &FieldId) -> Result<(), StorageError> {
        self.edges.retain(|e| &e.to != field_id);
        Ok(())
    }
}

/// Table `T`: `number`, `text` and `fx = {number} & {text}`.
pub fn formula_base() -> TestBase {
    TestBase::new()
        .with_table("T")
        .with_field(Field::number("number", "T"))
        .with_field(Field::text("text", "T"))
        .with_field(Field::formula("fx", "T", "{number} & {text}"))
        .with_record("T", Record::new("r1").with_value("number", 0.0).with_value("text", "x"))
        .with_record("T", Record::new("r2"))
}

/// Table `T` with `c = a + 1`, `d = a + b`, `e = c * d`.
pub fn diamond_base() -> TestBase {
    TestBase::new()
        .with_table("T")
        .with_field(Field::number("a", "T"))
        .with_field(Field::number("b", "T"))
        .with_field(Field::formula("c", "T", "{a} + 1"))
        .with_field(Field::formula("d", "T", "{a} + {b}"))
        .with_field(Field::formula("e", "T", "{c} * {d}"))
        .with_record(
            "T",
            Record::new("r1")
                .with_value("a", 1.0)
                .with_value("b", 2.0)
                .with_value("c", 2.0)
                .with_value("d", 3.0)
                .with_value("e", 6.0),
        )
}

/// Tables `A` and `B`.
///
/// `A.aLinks` is one-many to `B` (titles from `bName`) with symmetric
/// many-one `B.bOwner` (titles from `aName`). `A.aNames` looks up `bName`,
/// `A.aTotal` sums `bScore`, `B.bOwnerName` looks up the owner's `aName`
/// and `B.bGreeting = {bOwnerName} & "!"`. `A.aBest` is a one-way
/// many-one link to `B`.
pub fn linked_base() -> TestBase {
    let base = TestBase::new()
        .with_table("A")
        .with_table("B")
        .with_field(Field::text("aName", "A"))
        .with_field(Field::text("bName", "B"))
        .with_field(Field::number("bScore", "B"))
        .with_link_pair(
            "aLinks",
            "A",
            Relationship::OneMany,
            "bOwner",
            "B",
            "bName",
            "aName",
        );
    let best = base.link_field("aBest", "A", Relationship::ManyOne, "B", "bName", None);
    base.with_field(best)
        .with_field(TestBase::lookup_field("aNames", "A", "aLinks", "B", "bName").multiple(true))
        .with_field(TestBase::rollup_field(
            "aTotal",
            "A",
            "aLinks",
            "B",
            "bScore",
            "sum({values})",
        ))
        .with_field(TestBase::lookup_field("bOwnerName", "B", "bOwner", "A", "aName"))
        .with_field(Field::formula("bGreeting", "B", "{bOwnerName} & \"!\""))
        .with_record("A", Record::new("r0").with_value("aName", "zero"))
        .with_record("A", Record::new("r1").with_value("aName", "one"))
        .with_record(
            "B",
            Record::new("r2").with_value("bName", "two").with_value("bScore", 5.0),
        )
        .with_record(
            "B",
            Record::new("r3").with_value("bName", "three").with_value("bScore", 7.0),
        )
}

/// Tables `C` and `D` joined many-many through `cTags` / `dItems`.
pub fn many_many_base() -> TestBase {
    TestBase::new()
        .with_table("C")
        .with_table("D")
        .with_field(Field::text("cName", "C"))
        .with_field(Field::text("dName", "D"))
        .with_link_pair(
            "cTags",
            "C",
            Relationship::ManyMany,
            "dItems",
            "D",
            "dName",
            "cName",
        )
        .with_record("C", Record::new("c1").with_value("cName", "first"))
        .with_record("C", Record::new("c2").with_value("cName", "second"))
        .with_record("D", Record::new("d1").with_value("dName", "red"))
        .with_record("D", Record::new("d2").with_value("dName", "blue"))
}

/// Tables `A` and `B` joined one-one through `o1` / `o2`; `r0 -> b1` and
/// `r1 -> b2` are linked.
pub fn one_one_base() -> TestBase {
    TestBase::new()
        .with_table("A")
        .with_table("B")
        .with_field(Field::text("aName", "A"))
        .with_field(Field::text("bName", "B"))
        .with_link_pair("o1", "A", Relationship::OneOne, "o2", "B", "bName", "aName")
        .with_record("A", Record::new("r0").with_value("aName", "zero"))
        .with_record("A", Record::new("r1").with_value("aName", "one"))
        .with_record("B", Record::new("b1").with_value("bName", "bee"))
        .with_record("B", Record::new("b2").with_value("bName", "bop"))
        .with_link("o1", "r0", &["b1"])
        .with_link("o1", "r1", &["b2"])
}

/// Which collaborator call a [`FailingBase`] rejects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailOn {
    Edges,
    Fetch,
    Pairs,
}

/// Wraps a [`TestBase`] and aborts one kind of storage call.
pub struct FailingBase {
    pub inner: TestBase,
    pub fail_on: FailOn,
}

impl FailingBase {
    pub fn new(inner: TestBase, fail_on: FailOn) -> Self {
        Self { inner, fail_on }
    }

    fn check(&self, call: FailOn) -> Result<(), StorageError> {
        if self.fail_on == call {
            return Err(StorageError::Aborted(format!("{call:?} timed out")));
        }
        Ok(())
    }
}

impl ReferenceStore for FailingBase {
    fn edges_touching(&self, field_ids: &[FieldId]) -> Result<Vec<Edge>, StorageError> {
        self.check(FailOn::Edges)?;
        self.inner.edges_touching(field_ids)
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), StorageError> {
        self.inner.add_edge(edge)
    }

    fn remove_edges_to(&mut self, field_id: &FieldId) -> Result<(), StorageError> {
        self.inner.remove_edges_to(field_id)
    }
}

impl RecordStore for FailingBase {
    fn fetch_records(
        &self,
        location: &str,
        record_ids: &[RecordId],
        columns: &[FieldId],
    ) -> Result<Vec<Record>, StorageError> {
        self.check(FailOn::Fetch)?;
        self.inner.fetch_records(location, record_ids, columns)
    }

    fn select_pairs(
        &self,
        location: &str,
        key_column: &str,
        value_column: &str,
        keys: &[RecordId],
    ) -> Result<Vec<(RecordId, RecordId)>, StorageError> {
        self.check(FailOn::Pairs)?;
        self.inner.select_pairs(location, key_column, value_column, keys)
    }
}

impl FieldProvider for FailingBase {
    fn field(&self, id: &FieldId) -> Option<&Field> {
        self.inner.field(id)
    }
}

impl TableProvider for FailingBase {
    fn location(&self, table_id: &TableId) -> Option<&str> {
        self.inner.location(table_id)
    }
}
