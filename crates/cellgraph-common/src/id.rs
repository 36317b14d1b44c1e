//! String-backed identifiers for fields, tables and records.
//!
//! Ids are opaque to the engine; they only need to be hashable, ordered and
//! cheap to clone into change sets.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identity of a field (a column definition).
    FieldId
);
string_id!(
    /// Logical table identity. Physical storage is resolved through a
    /// `TableProvider`.
    TableId
);
string_id!(
    /// Identity of a row within one table.
    RecordId
);

/// Reserved column holding a record's own id in every physical table.
pub const ID_COLUMN: &str = "__id";

/// Name of the synthetic field a rollup expression reads its aggregated
/// values from (`sum({values})`).
pub const VALUES_SLOT: &str = "values";
