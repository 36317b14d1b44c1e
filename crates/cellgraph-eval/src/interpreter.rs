use std::cmp::Ordering;

use cellgraph_common::{CellValue, FieldId, VALUES_SLOT};
use cellgraph_parse::{ASTNode, ASTNodeType};

use crate::builtins;
use crate::coercion::{compare, number, to_number, to_text};
use crate::function::ValueFault;
use crate::record::Record;

/// Where an expression reads its `{fieldId}` operands from.
pub trait FieldValues {
    /// Value of a referenced field; `None` reads as null.
    fn field_value(&self, field_id: &FieldId) -> Option<&CellValue>;
}

impl FieldValues for Record {
    fn field_value(&self, field_id: &FieldId) -> Option<&CellValue> {
        self.get(field_id)
    }
}

/// The synthetic `{values}` slot lookups and rollups aggregate over.
pub struct ValuesSlot {
    slot: FieldId,
    values: CellValue,
}

impl ValuesSlot {
    pub fn new(values: CellValue) -> Self {
        Self {
            slot: FieldId::new(VALUES_SLOT),
            values,
        }
    }
}

impl FieldValues for ValuesSlot {
    fn field_value(&self, field_id: &FieldId) -> Option<&CellValue> {
        (field_id == &self.slot).then_some(&self.values)
    }
}

pub struct Interpreter<'a> {
    pub context: &'a dyn FieldValues,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a dyn FieldValues) -> Self {
        Self { context }
    }

    pub fn evaluate_ast(&self, node: &ASTNode) -> Result<CellValue, ValueFault> {
        match &node.node_type {
            ASTNodeType::Literal(v) => Ok(v.clone()),
            ASTNodeType::Reference { field_id, .. } => Ok(self
                .context
                .field_value(field_id)
                .cloned()
                .unwrap_or_default()),
            ASTNodeType::UnaryOp { op, expr } => self.eval_unary(op, expr),
            ASTNodeType::BinaryOp { op, left, right } => self.eval_binary(op, left, right),
            ASTNodeType::Function { name, args } => self.eval_function(name, args),
        }
    }

    /* ===================  unary  =================== */
    fn eval_unary(&self, op: &str, expr: &ASTNode) -> Result<CellValue, ValueFault> {
        let v = self.evaluate_ast(expr)?;
        match op {
            "-" => number(-to_number(&v)?),
            "+" => number(to_number(&v)?),
            _ => Err(ValueFault::Operator(op.to_string())),
        }
    }

    /* ===================  binary ops  =================== */
    fn eval_binary(
        &self,
        op: &str,
        left: &ASTNode,
        right: &ASTNode,
    ) -> Result<CellValue, ValueFault> {
        let l = self.evaluate_ast(left)?;
        let r = self.evaluate_ast(right)?;

        match op {
            "+" => number(to_number(&l)? + to_number(&r)?),
            "-" => number(to_number(&l)? - to_number(&r)?),
            "*" => number(to_number(&l)? * to_number(&r)?),
            "/" => {
                let divisor = to_number(&r)?;
                if divisor == 0.0 {
                    return Err(ValueFault::DivByZero);
                }
                number(to_number(&l)? / divisor)
            }
            "&" => Ok(CellValue::Text(format!("{}{}", to_text(&l), to_text(&r)))),
            "=" | "<>" | "<" | ">" | "<=" | ">=" => Ok(CellValue::Boolean(Self::compare_op(op, &l, &r))),
            _ => Err(ValueFault::Operator(op.to_string())),
        }
    }

    fn compare_op(op: &str, l: &CellValue, r: &CellValue) -> bool {
        if op == "=" || op == "<>" {
            let equal = l.same_value(r) || compare(l, r) == Ordering::Equal;
            return (op == "=") == equal;
        }
        let ord = compare(l, r);
        match op {
            "<" => ord == Ordering::Less,
            ">" => ord == Ordering::Greater,
            "<=" => ord != Ordering::Greater,
            _ => ord != Ordering::Less,
        }
    }

    /* ===================  function calls  =================== */
    fn eval_function(&self, name: &str, args: &[ASTNode]) -> Result<CellValue, ValueFault> {
        let spec =
            builtins::lookup(name).ok_or_else(|| ValueFault::UnknownFunction(name.to_string()))?;
        let values = args
            .iter()
            .map(|arg| self.evaluate_ast(arg))
            .collect::<Result<Vec<_>, _>>()?;
        spec.call(&values)
    }
}
