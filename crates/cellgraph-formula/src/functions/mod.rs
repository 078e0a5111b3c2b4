//! Built-in functions
//!
//! Handlers receive their arguments unevaluated, together with a callback into
//! the evaluator, so each function decides what to evaluate and when. `IF`
//! uses this to evaluate only the branch it takes.

pub mod logical;
pub mod math;
pub mod statistical;

use crate::ast::{CellReference, FormulaExpr, RangeReference};
use crate::error::FormulaResult;
use crate::evaluator::EvalContext;
use cellgraph_core::{CellValue, RangeOrder};
use std::collections::HashMap;

/// Evaluator callback handed to function implementations
pub type EvalFn = fn(&FormulaExpr, &mut EvalContext<'_>) -> FormulaResult<CellValue>;

/// Function implementation signature
pub type FunctionImpl =
    fn(&[FormulaExpr], &mut EvalContext<'_>, EvalFn) -> FormulaResult<CellValue>;

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Implementation
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_logical_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Names of all registered functions, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.values().map(|def| def.name).collect();
        names.sort_unstable();
        names
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            name: "SUM",
            implementation: math::fn_sum,
        });
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef {
            name: "AVG",
            implementation: statistical::fn_avg,
        });
        self.register(FunctionDef {
            name: "MIN",
            implementation: statistical::fn_min,
        });
        self.register(FunctionDef {
            name: "MAX",
            implementation: statistical::fn_max,
        });
        self.register(FunctionDef {
            name: "COUNT",
            implementation: statistical::fn_count,
        });
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef {
            name: "IF",
            implementation: logical::fn_if,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of every cell in a range, column by column
///
/// Cells that fail to evaluate (including empty cells, which are bad
/// references) are skipped rather than failing the whole range.
pub fn range_values(
    range_ref: &RangeReference,
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> Vec<CellValue> {
    let mut values = Vec::new();
    for address in range_ref.range().cells(RangeOrder::ColumnMajor) {
        let node = FormulaExpr::CellRef(CellReference { address });
        if let Ok(value) = eval(&node, ctx) {
            values.push(value);
        }
    }
    ctx.record_range(range_ref);
    values
}

/// Flatten arguments into values: ranges expand through [`range_values`],
/// anything else is evaluated and its errors propagate
pub(crate) fn collect_values(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<Vec<CellValue>> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            FormulaExpr::RangeRef(range_ref) => values.extend(range_values(range_ref, ctx, eval)),
            _ => values.push(eval(arg, ctx)?),
        }
    }
    Ok(values)
}

/// Only values that are numbers already; booleans and numeric text are ignored
pub(crate) fn numbers(values: &[CellValue]) -> impl Iterator<Item = f64> + '_ {
    values.iter().filter_map(CellValue::as_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("sum").map(|def| def.name), Some("SUM"));
        assert_eq!(registry.get("If").map(|def| def.name), Some("IF"));
        assert!(registry.get("AVERAGE").is_none());
    }

    #[test]
    fn test_registry_names() {
        let registry = FunctionRegistry::default();
        assert_eq!(
            registry.names(),
            ["AVG", "COUNT", "IF", "MAX", "MIN", "SUM"]
        );
    }
}
