use std::cmp::Ordering;

use cellgraph_common::CellValue;

use crate::function::ValueFault;

pub fn to_number(v: &CellValue) -> Result<f64, ValueFault> {
    v.as_number()
        .ok_or_else(|| ValueFault::NotANumber(v.to_string()))
}

/// Text view used by `&` and text builtins; null is the empty string.
pub fn to_text(v: &CellValue) -> String {
    v.to_string()
}

pub fn number(n: f64) -> Result<CellValue, ValueFault> {
    if n.is_finite() {
        Ok(CellValue::Number(n))
    } else {
        Err(ValueFault::NotFinite)
    }
}

/// Arguments with arrays spread one level deep, the shape aggregates see.
pub fn flatten_args(args: &[CellValue]) -> Vec<CellValue> {
    args.iter().cloned().flat_map(CellValue::flatten).collect()
}

/// Ordering for comparison operators: numerically when both sides are
/// numeric, otherwise by text.
pub fn compare(left: &CellValue, right: &CellValue) -> Ordering {
    let numeric = |v: &CellValue| match v {
        CellValue::Number(_) | CellValue::Boolean(_) | CellValue::Null => v.as_number(),
        _ => None,
    };
    match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => to_text(left).cmp(&to_text(right)),
    }
}
