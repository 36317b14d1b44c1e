//! Builtin function registry.
//!
//! Names are matched case-insensitively; the tokenizer upper-cases them.

pub mod array;
pub mod logical;
pub mod math;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::function::FunctionSpec;

static REGISTRY: Lazy<FxHashMap<&'static str, FunctionSpec>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    for spec in math::FUNCTIONS
        .iter()
        .chain(logical::FUNCTIONS)
        .chain(array::FUNCTIONS)
    {
        map.insert(spec.name, *spec);
    }
    map
});

pub fn lookup(name: &str) -> Option<&'static FunctionSpec> {
    let upper = name.to_ascii_uppercase();
    REGISTRY.get(upper.as_str())
}

pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.keys().copied()
}
