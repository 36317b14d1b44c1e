pub mod builtins;
pub mod coercion;
pub mod function;
pub mod interpreter;
pub mod record;
pub mod traits;

pub mod engine;
pub mod test_base;

pub use cellgraph_common::{
    CalcError, CalcResult, CellChange, CellInput, CellValue, Edge, Field, FieldId, FieldKind,
    LinkRef, RecordId, StorageError, TableId,
};
pub use engine::{CalcConfig, Engine};
pub use record::{Record, RecordMap};
pub use traits::{CalcContext, FieldProvider, RecordStore, ReferenceStore, TableProvider};
