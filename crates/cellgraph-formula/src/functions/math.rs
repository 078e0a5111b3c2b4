//! Math functions

use super::{collect_values, numbers, EvalFn};
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::EvalContext;
use cellgraph_core::CellValue;

/// SUM function
pub fn fn_sum(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    let values = collect_values(args, ctx, eval)?;
    Ok(CellValue::Number(numbers(&values).sum()))
}
