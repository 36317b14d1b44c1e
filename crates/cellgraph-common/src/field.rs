//! Field definitions.
//!
//! A [`Field`] carries its identity plus a [`FieldKind`]: a tagged union
//! holding exactly the options each kind needs. Consumers dispatch on the
//! tag with exhaustive matches instead of casting option bags.

use std::fmt::{self, Display};

use crate::{FieldId, ID_COLUMN, TableId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cardinality of a link field, seen from the table that owns the field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Relationship {
    OneOne,
    OneMany,
    ManyOne,
    ManyMany,
}

impl Relationship {
    /// Whether the owning side of the link holds many foreign records.
    pub fn is_multiple(self) -> bool {
        matches!(self, Relationship::OneMany | Relationship::ManyMany)
    }

    /// The relationship as seen from the symmetric field on the foreign table.
    pub fn reverse(self) -> Self {
        match self {
            Relationship::OneOne => Relationship::OneOne,
            Relationship::OneMany => Relationship::ManyOne,
            Relationship::ManyOne => Relationship::OneMany,
            Relationship::ManyMany => Relationship::ManyMany,
        }
    }
}

impl Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relationship::OneOne => "oneOne",
            Relationship::OneMany => "oneMany",
            Relationship::ManyOne => "manyOne",
            Relationship::ManyMany => "manyMany",
        })
    }
}

/// Where a link's association rows live and which columns pair the two
/// sides.
///
/// Every relationship is reduced to the same shape: rows of `fk_host_table`
/// pair `self_key` (a record of the owning table) with `foreign_key` (a
/// record of the foreign table). [`ID_COLUMN`] stands for the host row's own
/// id.
///
/// | relationship | host           | self_key           | foreign_key        |
/// |--------------|----------------|--------------------|--------------------|
/// | many-one     | owning table   | `__id`             | `__fk_<field>`     |
/// | one-one      | owning table   | `__id`             | `__fk_<field>`     |
/// | one-one (id sorts after symmetric) | foreign table | `__fk_<symmetric>` | `__id` |
/// | one-many     | foreign table  | `__fk_<symmetric>` | `__id`             |
/// | many-many    | junction table | `__fk_<symmetric>` | `__fk_<field>`     |
///
/// Without a symmetric field the back-reference column is
/// `__fk_<field>_self`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkStorage {
    pub fk_host_table: String,
    pub self_key: String,
    pub foreign_key: String,
}

impl LinkStorage {
    /// Default column layout for a link field. `symmetric` names the mirror
    /// field when one exists. A one-way link keeps its back-reference in a
    /// column of its own.
    ///
    /// Both sides of a one-one pair share the key column of the field whose
    /// id sorts first, so the pair always reads the same rows.
    pub fn for_relationship(
        field_id: &FieldId,
        relationship: Relationship,
        symmetric: Option<&FieldId>,
        self_location: &str,
        foreign_location: &str,
    ) -> Self {
        let own_fk = format!("__fk_{field_id}");
        let back_fk = match symmetric {
            Some(sym) => format!("__fk_{sym}"),
            None => format!("__fk_{field_id}_self"),
        };
        match relationship {
            Relationship::OneOne if symmetric.is_some_and(|sym| sym < field_id) => Self {
                fk_host_table: foreign_location.to_string(),
                self_key: back_fk,
                foreign_key: ID_COLUMN.to_string(),
            },
            Relationship::ManyOne | Relationship::OneOne => Self {
                fk_host_table: self_location.to_string(),
                self_key: ID_COLUMN.to_string(),
                foreign_key: own_fk,
            },
            Relationship::OneMany => Self {
                fk_host_table: foreign_location.to_string(),
                self_key: back_fk,
                foreign_key: ID_COLUMN.to_string(),
            },
            Relationship::ManyMany => {
                // Both sides of a many-many pair must agree on the junction name.
                let fk_host_table = match symmetric {
                    Some(sym) => {
                        let mut pair = [field_id.as_str(), sym.as_str()];
                        pair.sort_unstable();
                        format!("junction_{}_{}", pair[0], pair[1])
                    }
                    None => format!("junction_{field_id}"),
                };
                Self {
                    fk_host_table,
                    self_key: back_fk,
                    foreign_key: own_fk,
                }
            }
        }
    }

    /// The same association rows seen from the other side.
    pub fn mirrored(&self) -> Self {
        Self {
            fk_host_table: self.fk_host_table.clone(),
            self_key: self.foreign_key.clone(),
            foreign_key: self.self_key.clone(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOptions {
    pub relationship: Relationship,
    pub foreign_table_id: TableId,
    /// Foreign field whose value becomes the link title.
    pub lookup_field_id: FieldId,
    pub symmetric_field_id: Option<FieldId>,
    pub storage: LinkStorage,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupOptions {
    pub link_field_id: FieldId,
    pub foreign_table_id: TableId,
    pub lookup_field_id: FieldId,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaOptions {
    pub expression: String,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RollupOptions {
    /// Aggregation over the `{values}` slot, e.g. `sum({values})`.
    pub expression: String,
    pub lookup: LookupOptions,
}

/// Field kind plus the options that kind needs.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
    Formula(FormulaOptions),
    Link(LinkOptions),
    Lookup(LookupOptions),
    Rollup(RollupOptions),
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "singleLineText",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Formula(_) => "formula",
            FieldKind::Link(_) => "link",
            FieldKind::Lookup(_) => "lookup",
            FieldKind::Rollup(_) => "rollup",
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: FieldId,
    pub table_id: TableId,
    pub name: String,
    pub kind: FieldKind,
    /// Whether the cell holds an array of values.
    pub is_multiple: bool,
}

impl Field {
    pub fn new<I, T>(id: I, table_id: T, kind: FieldKind) -> Self
    where
        I: Into<FieldId>,
        T: Into<TableId>,
    {
        let id = id.into();
        let is_multiple = match &kind {
            FieldKind::Link(opts) => opts.relationship.is_multiple(),
            _ => false,
        };
        Self {
            name: id.to_string(),
            id,
            table_id: table_id.into(),
            kind,
            is_multiple,
        }
    }

    pub fn text<I: Into<FieldId>, T: Into<TableId>>(id: I, table_id: T) -> Self {
        Self::new(id, table_id, FieldKind::Text)
    }

    pub fn number<I: Into<FieldId>, T: Into<TableId>>(id: I, table_id: T) -> Self {
        Self::new(id, table_id, FieldKind::Number)
    }

    pub fn formula<I: Into<FieldId>, T: Into<TableId>>(id: I, table_id: T, expression: &str) -> Self {
        Self::new(
            id,
            table_id,
            FieldKind::Formula(FormulaOptions {
                expression: expression.to_string(),
            }),
        )
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn multiple(mut self, is_multiple: bool) -> Self {
        self.is_multiple = is_multiple;
        self
    }

    /// Computed fields are never written directly by a user.
    pub fn is_computed(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Formula(_) | FieldKind::Link(_) | FieldKind::Lookup(_) | FieldKind::Rollup(_)
        )
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self.kind, FieldKind::Lookup(_))
    }

    pub fn link_options(&self) -> Option<&LinkOptions> {
        match &self.kind {
            FieldKind::Link(opts) => Some(opts),
            _ => None,
        }
    }

    /// Lookup options shared by lookup and rollup fields.
    pub fn lookup_options(&self) -> Option<&LookupOptions> {
        match &self.kind {
            FieldKind::Lookup(opts) => Some(opts),
            FieldKind::Rollup(opts) => Some(&opts.lookup),
            _ => None,
        }
    }

    /// The link field a cross-table dependency of this field travels
    /// through. For a link field that is the field itself.
    pub fn via_link_field(&self) -> Option<&FieldId> {
        match &self.kind {
            FieldKind::Link(_) => Some(&self.id),
            FieldKind::Lookup(opts) => Some(&opts.link_field_id),
            FieldKind::Rollup(opts) => Some(&opts.lookup.link_field_id),
            _ => None,
        }
    }
}
