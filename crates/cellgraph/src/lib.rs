//! Meta crate that re-exports the cellgraph building blocks. Hosts depend on
//! this crate and pick layers with feature flags; the underlying crates stay
//! reachable for deeper integration.

#[cfg(feature = "common")]
pub use cellgraph_common as common;

#[cfg(feature = "parse")]
pub use cellgraph_parse as parse;

#[cfg(feature = "eval")]
pub use cellgraph_eval as eval;

#[cfg(feature = "common")]
pub use cellgraph_common::{
    CalcError, CalcResult, CellChange, CellInput, CellValue, Field, FieldId, FieldKind, LinkRef,
    RecordId, Relationship, StorageError, TableId,
};

#[cfg(feature = "eval")]
pub use cellgraph_eval::{
    CalcConfig, CalcContext, Engine, FieldProvider, Record, RecordMap, RecordStore,
    ReferenceStore, TableProvider,
};
