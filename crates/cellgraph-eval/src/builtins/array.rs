//! Text and array helpers, mostly used by rollups over `{values}`.

use cellgraph_common::CellValue;

use crate::coercion::{flatten_args, to_text};
use crate::function::{FunctionSpec, ValueFault};

pub(crate) static FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec::new("CONCATENATE", 0, None, concatenate),
    FunctionSpec::new("ARRAY_JOIN", 1, Some(2), array_join),
    FunctionSpec::new("ARRAY_UNIQUE", 1, Some(1), array_unique),
    FunctionSpec::new("ARRAY_COMPACT", 1, Some(1), array_compact),
];

fn concatenate(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Text(args.iter().map(to_text).collect()))
}

fn array_join(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    let separator = args.get(1).map_or_else(|| ", ".to_string(), to_text);
    let parts: Vec<String> = flatten_args(&args[..1])
        .iter()
        .filter(|v| !v.is_null())
        .map(to_text)
        .collect();
    Ok(CellValue::Text(parts.join(&separator)))
}

fn array_unique(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    let mut out: Vec<CellValue> = Vec::new();
    for v in flatten_args(args) {
        if !out.iter().any(|seen| seen.same_value(&v)) {
            out.push(v);
        }
    }
    Ok(CellValue::Array(out))
}

fn array_compact(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Array(
        flatten_args(args).into_iter().filter(|v| !v.is_null()).collect(),
    ))
}
