use std::fmt::{self, Display};

use crate::RecordId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One end of a link cell: the foreign record id plus the display title
/// copied from the foreign table's primary (lookup) field.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRef {
    pub id: RecordId,
    pub title: Option<String>,
}

impl LinkRef {
    pub fn new<I: Into<RecordId>>(id: I) -> Self {
        Self {
            id: id.into(),
            title: None,
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A cell value as seen by the engine.
///
/// Multi-valued cells (many-side links, lookups over many records) are
/// `Array`s; arrays never nest once flattened.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
    Link(LinkRef),
    Array(Vec<CellValue>),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(b) => write!(f, "{b}"),
            CellValue::Link(link) => match &link.title {
                Some(title) => f.write_str(title),
                None => f.write_str(link.id.as_str()),
            },
            CellValue::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

/// Render a number the way a grid shows it: integral values without a
/// trailing `.0`.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<LinkRef> for CellValue {
    fn from(link: LinkRef) -> Self {
        CellValue::Link(link)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Array(items) => items.iter().all(CellValue::is_null),
            _ => false,
        }
    }

    /// Build a link cell from its ends: a single link for one-valued sides,
    /// an array for many-valued sides, null when empty.
    pub fn from_links(links: Vec<LinkRef>, multiple: bool) -> Self {
        if links.is_empty() {
            return CellValue::Null;
        }
        if multiple {
            CellValue::Array(links.into_iter().map(CellValue::Link).collect())
        } else {
            links
                .into_iter()
                .next()
                .map(CellValue::Link)
                .unwrap_or(CellValue::Null)
        }
    }

    /// Foreign record ids held by a link cell, in cell order.
    pub fn link_ids(&self) -> Vec<RecordId> {
        match self {
            CellValue::Link(link) => vec![link.id.clone()],
            CellValue::Array(items) => items.iter().flat_map(CellValue::link_ids).collect(),
            _ => Vec::new(),
        }
    }

    /// Flatten nested arrays into a single level, dropping nothing.
    pub fn flatten(self) -> Vec<CellValue> {
        match self {
            CellValue::Array(items) => items.into_iter().flat_map(CellValue::flatten).collect(),
            other => vec![other],
        }
    }

    /// Lenient numeric view: numbers, booleans, numeric text. Null is zero.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Null => Some(0.0),
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Link(_) => None,
            CellValue::Array(items) if items.len() == 1 => items[0].as_number(),
            CellValue::Array(_) => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Null => false,
            CellValue::Number(n) => *n != 0.0,
            CellValue::Text(s) => !s.is_empty(),
            CellValue::Boolean(b) => *b,
            CellValue::Link(_) => true,
            CellValue::Array(items) => items.iter().any(CellValue::is_truthy),
        }
    }

    /// Equality under cell semantics: empty text and empty arrays equal null,
    /// numbers compare by value.
    pub fn same_value(&self, other: &CellValue) -> bool {
        match (self, other) {
            (a, b) if a.is_null() && b.is_null() => true,
            (CellValue::Array(a), CellValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_value(y))
            }
            (a, b) => a == b,
        }
    }
}
