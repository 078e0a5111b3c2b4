//! Statistical functions

use super::{collect_values, numbers, EvalFn};
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::EvalContext;
use cellgraph_core::CellValue;

/// AVG function; 0 when there are no numbers
pub fn fn_avg(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    let values = collect_values(args, ctx, eval)?;

    let mut sum = 0.0;
    let mut count = 0;
    for n in numbers(&values) {
        sum += n;
        count += 1;
    }

    if count == 0 {
        Ok(CellValue::Number(0.0))
    } else {
        Ok(CellValue::Number(sum / count as f64))
    }
}

/// MIN function; 0 when there are no numbers
pub fn fn_min(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    let values = collect_values(args, ctx, eval)?;
    Ok(CellValue::Number(extreme(numbers(&values), f64::min)))
}

/// MAX function; 0 when there are no numbers
pub fn fn_max(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    let values = collect_values(args, ctx, eval)?;
    Ok(CellValue::Number(extreme(numbers(&values), f64::max)))
}

/// COUNT function: every non-empty value, whatever its type
pub fn fn_count(
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
    eval: EvalFn,
) -> FormulaResult<CellValue> {
    let values = collect_values(args, ctx, eval)?;
    let count = values.iter().filter(|v| !v.is_empty()).count();
    Ok(CellValue::Number(count as f64))
}

/// Fold with `pick`, where any NaN makes the result NaN
fn extreme(mut nums: impl Iterator<Item = f64>, pick: fn(f64, f64) -> f64) -> f64 {
    let Some(first) = nums.next() else {
        return 0.0;
    };
    nums.fold(first, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            pick(acc, n)
        }
    })
}
