use cellgraph_common::CellValue;

use crate::coercion::flatten_args;
use crate::function::{FunctionSpec, ValueFault};

pub(crate) static FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec::new("IF", 2, Some(3), if_fn),
    FunctionSpec::new("AND", 1, None, and),
    FunctionSpec::new("OR", 1, None, or),
];

fn if_fn(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    if args[0].is_truthy() {
        Ok(args[1].clone())
    } else {
        Ok(args.get(2).cloned().unwrap_or_default())
    }
}

fn and(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Boolean(
        flatten_args(args).iter().all(CellValue::is_truthy),
    ))
}

fn or(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Boolean(
        flatten_args(args).iter().any(CellValue::is_truthy),
    ))
}
