//! Logical functions

use super::EvalFn;
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::EvalContext;
use cellgraph_core::CellValue;

/// IF(condition, value_if_true, [value_if_false])
///
/// Only the chosen branch is evaluated. With fewer than two arguments, or when
/// the chosen branch is missing, the result is empty.
pub fn fn_if(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    if args.len() < 2 {
        return Ok(CellValue::Empty);
    }

    let condition = eval(&args[0], ctx)?;
    let branch = if condition.is_truthy() {
        args.get(1)
    } else {
        args.get(2)
    };

    match branch {
        Some(expr) => eval(expr, ctx),
        None => Ok(CellValue::Empty),
    }
}
