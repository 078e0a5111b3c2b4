//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`Sheet`]. Referenced formula cells are
//! evaluated recursively on demand; a visited set threaded through the
//! recursion turns any reference back into the active chain into a `CYCLE`
//! error instead of unbounded recursion.
//!
//! A [`ResultCache`] of cells already evaluated in dependency order lets a
//! reference stop at the cached result, so evaluating a long chain in order
//! never recurses deeper than one level.

use crate::ast::{BinaryOperator, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{range_values, FunctionRegistry};
use crate::parser::parse_formula;
use crate::sheet::{Cell, Sheet};
use ahash::{AHashMap, AHashSet};
use cellgraph_core::{parse_number, CellAddress, CellRange, CellValue, ErrorCode};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// Get the shared built-in function registry
pub fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// A typed evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("{code}: {message}")]
pub struct EvalError {
    pub code: ErrorCode,
    pub message: String,
}

impl EvalError {
    /// Create an error with an explicit message
    pub fn new<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<FormulaError> for EvalError {
    fn from(err: FormulaError) -> Self {
        let code = err.code();
        let message = match code {
            ErrorCode::Parse => err.to_string(),
            ErrorCode::Ref => "Bad reference".to_string(),
            ErrorCode::Cycle => "Circular reference".to_string(),
            ErrorCode::Div0 => "Division by zero".to_string(),
        };
        Self { code, message }
    }
}

/// Outcome of evaluating one cell: a value or an error, never both
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Value(CellValue),
    Error(EvalError),
}

impl EvalResult {
    /// The value, if evaluation succeeded
    pub fn value(&self) -> Option<&CellValue> {
        match self {
            EvalResult::Value(v) => Some(v),
            EvalResult::Error(_) => None,
        }
    }

    /// The error, if evaluation failed
    pub fn error(&self) -> Option<&EvalError> {
        match self {
            EvalResult::Value(_) => None,
            EvalResult::Error(e) => Some(e),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }
}

impl From<FormulaResult<CellValue>> for EvalResult {
    fn from(result: FormulaResult<CellValue>) -> Self {
        match result {
            Ok(value) => EvalResult::Value(value),
            Err(err) => EvalResult::Error(err.into()),
        }
    }
}

/// Errors display as `#CODE`, values as their text form
impl fmt::Display for EvalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalResult::Value(v) => write!(f, "{}", v),
            EvalResult::Error(e) => write!(f, "#{}", e.code),
        }
    }
}

/// One step of an explained evaluation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExplainTrace {
    /// Cell being evaluated
    pub cell: CellAddress,
    /// Its formula source
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub formula: Option<String>,
    /// Cell read in this step
    pub dependencies: Vec<CellAddress>,
    /// Range expanded in this step
    pub ranges: Vec<CellRange>,
    /// Value read; empty for range steps
    pub value: CellValue,
}

/// A result together with its explain trace, when one was requested
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvaluation {
    pub result: EvalResult,
    pub explain: Option<Vec<ExplainTrace>>,
}

impl CellEvaluation {
    fn value(value: CellValue) -> Self {
        Self {
            result: EvalResult::Value(value),
            explain: None,
        }
    }

    fn error(error: EvalError) -> Self {
        Self {
            result: EvalResult::Error(error),
            explain: None,
        }
    }
}

/// Results of formula cells evaluated earlier in the same pass
pub type ResultCache = AHashMap<CellAddress, EvalResult>;

/// Evaluation context
///
/// Holds the sheet being read, the cell whose formula is being evaluated, the
/// chain of cells currently under evaluation, the results already known and,
/// when explaining, the trace.
pub struct EvalContext<'a> {
    sheet: &'a Sheet,
    current_cell: CellAddress,
    visited: &'a mut AHashSet<CellAddress>,
    cache: Option<&'a ResultCache>,
    trace: Option<Vec<ExplainTrace>>,
}

impl<'a> EvalContext<'a> {
    /// Create a context for evaluating an expression on behalf of `current_cell`
    ///
    /// `visited` should contain `current_cell` if the expression is that
    /// cell's own formula, so self references are reported as cycles.
    pub fn new(
        sheet: &'a Sheet,
        current_cell: CellAddress,
        visited: &'a mut AHashSet<CellAddress>,
    ) -> Self {
        Self {
            sheet,
            current_cell: current_cell.relative(),
            visited,
            cache: None,
            trace: None,
        }
    }

    /// Read formula cells found in `cache` instead of evaluating them again
    pub fn with_cache(mut self, cache: &'a ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The sheet being read
    pub fn sheet(&self) -> &'a Sheet {
        self.sheet
    }

    /// The cell whose formula is being evaluated
    pub fn current_cell(&self) -> CellAddress {
        self.current_cell
    }

    /// Start recording an explain trace
    pub fn enable_trace(&mut self) {
        self.trace.get_or_insert_with(Vec::new);
    }

    /// Take the recorded trace, if tracing was enabled
    pub fn take_trace(&mut self) -> Option<Vec<ExplainTrace>> {
        self.trace.take()
    }

    fn current_formula(&self) -> Option<String> {
        self.sheet
            .get(self.current_cell)
            .and_then(Cell::formula_src)
            .map(str::to_string)
    }

    fn record_reference(&mut self, address: CellAddress, value: &CellValue) {
        if self.trace.is_none() {
            return;
        }
        let entry = ExplainTrace {
            cell: self.current_cell,
            formula: self.current_formula(),
            dependencies: vec![address],
            ranges: Vec::new(),
            value: value.clone(),
        };
        if let Some(trace) = &mut self.trace {
            trace.push(entry);
        }
    }

    pub(crate) fn record_range(&mut self, range_ref: &RangeReference) {
        if self.trace.is_none() {
            return;
        }
        let entry = ExplainTrace {
            cell: self.current_cell,
            formula: self.current_formula(),
            dependencies: Vec::new(),
            ranges: vec![range_ref.range()],
            value: CellValue::Empty,
        };
        if let Some(trace) = &mut self.trace {
            trace.push(entry);
        }
    }
}

/// Evaluate a single cell
///
/// Empty cells evaluate to [`CellValue::Empty`], literals to their value and
/// stored error cells to their error. Formula cells are parsed if needed and
/// evaluated; the trace is only recorded when `explain` is set.
pub fn evaluate_cell(sheet: &Sheet, address: CellAddress, explain: bool) -> CellEvaluation {
    let mut visited = AHashSet::new();
    evaluate_cell_in(sheet, address, explain, &mut visited, None)
}

/// Evaluate a single cell, reusing the results in `cache` for any formula
/// cell it reads
///
/// The cell's own entry is ignored. Callers evaluating many cells should walk
/// them in dependency order and insert each result as it is produced.
pub fn evaluate_cell_cached(
    sheet: &Sheet,
    address: CellAddress,
    explain: bool,
    cache: &ResultCache,
) -> CellEvaluation {
    let mut visited = AHashSet::new();
    evaluate_cell_in(sheet, address, explain, &mut visited, Some(cache))
}

fn evaluate_cell_in(
    sheet: &Sheet,
    address: CellAddress,
    explain: bool,
    visited: &mut AHashSet<CellAddress>,
    cache: Option<&ResultCache>,
) -> CellEvaluation {
    let address = address.relative();

    let (src, cached) = match sheet.get(address) {
        None => return CellEvaluation::value(CellValue::Empty),
        Some(Cell::Literal { value }) => return CellEvaluation::value(value.clone()),
        Some(Cell::Error { code, message }) => {
            return CellEvaluation::error(EvalError::new(*code, message.clone()))
        }
        Some(Cell::Formula { src, ast }) => (src, ast.as_ref()),
    };

    let parsed;
    let ast = match cached {
        Some(ast) => ast,
        None => match parse_formula(src) {
            Ok(expr) => {
                parsed = expr;
                &parsed
            }
            Err(err) => return CellEvaluation::error(err.into()),
        },
    };

    if !visited.insert(address) {
        return CellEvaluation::error(FormulaError::CircularReference(address).into());
    }

    let mut ctx = EvalContext::new(sheet, address, visited);
    ctx.cache = cache;
    if explain {
        ctx.enable_trace();
    }
    let outcome = evaluate(ast, &mut ctx);
    let trace = ctx.take_trace();
    ctx.visited.remove(&address);

    match outcome {
        Ok(value) => {
            tracing::trace!(cell = %address, value = %value, "evaluated");
            CellEvaluation {
                result: EvalResult::Value(value),
                explain: trace,
            }
        }
        Err(err) => {
            tracing::trace!(cell = %address, error = %err, "evaluation failed");
            CellEvaluation::error(err.into())
        }
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &mut EvalContext<'_>) -> FormulaResult<CellValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(CellValue::Number(*n)),
        FormulaExpr::String(s) => Ok(CellValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(CellValue::Boolean(*b)),

        // === References ===
        FormulaExpr::CellRef(cell_ref) => evaluate_reference(cell_ref.address, ctx),

        // Outside a function a range yields its first readable value
        FormulaExpr::RangeRef(range_ref) => Ok(range_values(range_ref, ctx, evaluate)
            .into_iter()
            .next()
            .unwrap_or_default()),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Read the value of a referenced cell
///
/// Fails with a cycle if the target is already being evaluated and with a bad
/// reference if there is no cell. Errors stored in or produced by the target
/// are re-raised under the same code.
pub fn evaluate_reference(
    address: CellAddress,
    ctx: &mut EvalContext<'_>,
) -> FormulaResult<CellValue> {
    let address = address.relative();

    if ctx.visited.contains(&address) {
        return Err(FormulaError::CircularReference(address));
    }

    let value = match ctx.sheet.get(address) {
        None => return Err(FormulaError::InvalidReference(address)),
        Some(Cell::Literal { value }) => value.clone(),
        Some(Cell::Error { code, message }) => {
            return Err(FormulaError::Propagated {
                code: *code,
                message: message.clone(),
            })
        }
        Some(Cell::Formula { .. }) => {
            let outcome = match ctx.cache.and_then(|cache| cache.get(&address)) {
                Some(cached) => cached.clone(),
                None => evaluate_cell_in(ctx.sheet, address, false, ctx.visited, ctx.cache).result,
            };
            match outcome {
                EvalResult::Value(value) => value,
                EvalResult::Error(err) => {
                    return Err(FormulaError::Propagated {
                        code: err.code,
                        message: err.message,
                    })
                }
            }
        }
    };

    ctx.record_reference(address, &value);
    Ok(value)
}

fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &mut EvalContext<'_>,
) -> FormulaResult<CellValue> {
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;
    let both_numeric = left_val.is_numeric_coercible() && right_val.is_numeric_coercible();

    let result = match op {
        // Arithmetic
        BinaryOperator::Add if both_numeric => {
            CellValue::Number(left_val.to_number() + right_val.to_number())
        }
        BinaryOperator::Add => {
            CellValue::String(format!("{}{}", left_val.to_text(), right_val.to_text()))
        }
        BinaryOperator::Subtract => CellValue::Number(left_val.to_number() - right_val.to_number()),
        BinaryOperator::Multiply => CellValue::Number(left_val.to_number() * right_val.to_number()),
        BinaryOperator::Divide => {
            let divisor = right_val.to_number();
            if divisor == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            CellValue::Number(left_val.to_number() / divisor)
        }
        BinaryOperator::Power => {
            CellValue::Number(js_pow(left_val.to_number(), right_val.to_number()))
        }

        // Comparison
        BinaryOperator::Equal => CellValue::Boolean(values_equal(&left_val, &right_val, both_numeric)),
        BinaryOperator::NotEqual => {
            CellValue::Boolean(!values_equal(&left_val, &right_val, both_numeric))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqual => {
            let ordering = compare_values(&left_val, &right_val, both_numeric);
            CellValue::Boolean(match op {
                BinaryOperator::LessThan => ordering == Some(Ordering::Less),
                BinaryOperator::LessEqual => {
                    matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                }
                BinaryOperator::GreaterThan => ordering == Some(Ordering::Greater),
                _ => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            })
        }
    };

    Ok(result)
}

fn values_equal(left: &CellValue, right: &CellValue, numeric: bool) -> bool {
    if numeric {
        left.to_number() == right.to_number()
    } else {
        left.to_text() == right.to_text()
    }
}

/// Numeric order when both sides are numeric, text order otherwise; `None`
/// when either number is NaN
fn compare_values(left: &CellValue, right: &CellValue, numeric: bool) -> Option<Ordering> {
    if numeric {
        left.to_number().partial_cmp(&right.to_number())
    } else {
        Some(left.to_text().cmp(&right.to_text()))
    }
}

/// `base` raised to `exponent` with JavaScript's edge cases
///
/// Differs from [`f64::powf`] where the exponent is NaN, or where `|base|` is 1
/// and the exponent infinite: both give NaN instead of 1.
pub(crate) fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent == 0.0 {
        1.0
    } else if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &mut EvalContext<'_>,
) -> FormulaResult<CellValue> {
    let value = evaluate(operand, ctx)?;

    match op {
        UnaryOperator::Negate => Ok(CellValue::Number(match value {
            CellValue::Empty => 0.0,
            CellValue::Number(n) => -n,
            CellValue::Boolean(true) => -1.0,
            CellValue::Boolean(false) => 0.0,
            CellValue::String(s) => parse_number(&s).map_or(0.0, |n| -n),
        })),
    }
}

fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &mut EvalContext<'_>,
) -> FormulaResult<CellValue> {
    let registry = get_function_registry();

    let func = registry
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    (func.implementation)(args, ctx, evaluate)
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::{CellEvaluation, EvalResult};
    use cellgraph_core::CellValue;
    use serde::ser::{Serialize, SerializeMap, Serializer};

    fn write_result<M: SerializeMap>(result: &EvalResult, map: &mut M) -> Result<(), M::Error> {
        match result {
            EvalResult::Value(value) => map.serialize_entry("value", value),
            EvalResult::Error(error) => {
                map.serialize_entry("value", &CellValue::Empty)?;
                map.serialize_entry("error", error)
            }
        }
    }

    /// `{value}` or `{value: null, error: {code, message}}`
    impl Serialize for EvalResult {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            write_result(self, &mut map)?;
            map.end()
        }
    }

    impl Serialize for CellEvaluation {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(None)?;
            write_result(&self.result, &mut map)?;
            if let Some(explain) = &self.explain {
                map.serialize_entry("explain", explain)?;
            }
            map.end()
        }
    }
}
