//! Builtin function signature and the value-level fault type.

use cellgraph_common::CellValue;
use thiserror::Error;

/// A fault inside formula evaluation. Faults are value-level: the engine
/// turns them into a null cell instead of failing the pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueFault {
    #[error("division by zero")]
    DivByZero,
    #[error("cannot use `{0}` as a number")]
    NotANumber(String),
    #[error("result is not a finite number")]
    NotFinite,
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("{name} expects {expected} arguments, got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("unsupported operator `{0}`")]
    Operator(String),
}

pub type BuiltinFn = fn(&[CellValue]) -> Result<CellValue, ValueFault>;

/// Registry entry for a builtin. Arguments arrive fully evaluated.
#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub eval: BuiltinFn,
}

impl FunctionSpec {
    pub const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        eval: BuiltinFn,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            eval,
        }
    }

    pub fn call(&self, args: &[CellValue]) -> Result<CellValue, ValueFault> {
        let too_few = args.len() < self.min_args;
        let too_many = self.max_args.is_some_and(|max| args.len() > max);
        if too_few || too_many {
            let expected = match (self.min_args, self.max_args) {
                (0, None) => "any number of",
                (1, None) => "at least 1",
                (1, Some(1)) => "exactly 1",
                (2, Some(3)) => "2 or 3",
                (1, Some(2)) => "1 or 2",
                _ => "a different number of",
            };
            return Err(ValueFault::Arity {
                name: self.name,
                expected,
                got: args.len(),
            });
        }
        (self.eval)(args)
    }
}
