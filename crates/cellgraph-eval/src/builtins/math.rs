use cellgraph_common::CellValue;

use crate::coercion::{flatten_args, number, to_number};
use crate::function::{FunctionSpec, ValueFault};

pub(crate) static FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec::new("SUM", 0, None, sum),
    FunctionSpec::new("AVERAGE", 0, None, average),
    FunctionSpec::new("MAX", 0, None, max),
    FunctionSpec::new("MIN", 0, None, min),
    FunctionSpec::new("COUNT", 0, None, count),
    FunctionSpec::new("COUNTA", 0, None, counta),
    FunctionSpec::new("COUNTALL", 0, None, countall),
    FunctionSpec::new("ROUND", 1, Some(2), round),
];

/// Numeric items of the flattened arguments; nulls and text are skipped.
fn numbers(args: &[CellValue]) -> Vec<f64> {
    flatten_args(args)
        .iter()
        .filter_map(|v| match v {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        })
        .collect()
}

fn sum(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    number(numbers(args).iter().sum())
}

fn average(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    let nums = numbers(args);
    if nums.is_empty() {
        return Ok(CellValue::Null);
    }
    number(nums.iter().sum::<f64>() / nums.len() as f64)
}

fn max(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::max)
        .map_or(CellValue::Null, CellValue::Number))
}

fn min(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(numbers(args)
        .into_iter()
        .reduce(f64::min)
        .map_or(CellValue::Null, CellValue::Number))
}

fn count(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Number(numbers(args).len() as f64))
}

/// Non-empty items.
fn counta(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    let n = flatten_args(args).iter().filter(|v| !v.is_null()).count();
    Ok(CellValue::Number(n as f64))
}

/// Every item, empty or not.
fn countall(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    Ok(CellValue::Number(flatten_args(args).len() as f64))
}

fn round(args: &[CellValue]) -> Result<CellValue, ValueFault> {
    let value = to_number(&args[0])?;
    let digits = match args.get(1) {
        Some(d) => to_number(d)?.trunc() as i32,
        None => 0,
    };
    let factor = 10f64.powi(digits);
    number((value * factor).round() / factor)
}
