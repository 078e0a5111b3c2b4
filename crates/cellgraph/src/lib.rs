//! # cellgraph
//!
//! A spreadsheet formula engine with dependency tracking.
//!
//! Cellgraph evaluates A1-style formulas over a single sheet and keeps results
//! current as cells change, recomputing only what an edit can affect.
//!
//! ## Features
//!
//! - Formula parsing with cell and range references
//! - JavaScript-compatible value coercion
//! - Built-in SUM, AVG, MIN, MAX, COUNT and IF
//! - Cycle, bad reference and division by zero detection
//! - Incremental recalculation after single-cell edits
//! - Optional explain traces of every reference read
//!
//! ## Example
//!
//! ```rust
//! use cellgraph::prelude::*;
//!
//! let mut sheet = Sheet::new("Budget", 100, 26);
//! let a1 = CellAddress::parse("A1").unwrap();
//! let b1 = CellAddress::parse("B1").unwrap();
//!
//! sheet.set(a1, Cell::literal(1.0));
//! sheet.set(b1, Cell::formula("=A1+1"));
//!
//! let mut engine = FormulaEngine::new();
//! let results = engine.evaluate_sheet(&mut sheet);
//! assert_eq!(results.get(b1).and_then(EvalResult::value), Some(&CellValue::Number(2.0)));
//!
//! // Apply an edit typed by a user
//! let edit = EditCommand::classify("10");
//! let recalc = engine.update_cell(&mut sheet, a1, edit.into_cell());
//! assert_eq!(recalc.results.get(b1).map(|r| r.to_string()), Some("11".to_string()));
//! ```

pub mod calculation;
pub mod edit;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, EvalResults, FormulaEngine, Recalculation};
pub use edit::EditCommand;

// Re-export core types
pub use cellgraph_core::{
    format_number, parse_number, CellAddress, CellRange, CellValue, Error, ErrorCode, RangeOrder,
    Result,
};

// Re-export formula types
pub use cellgraph_formula::{
    evaluate, evaluate_cell, evaluate_cell_cached, parse_formula, Cell, CellEvaluation,
    DependencyGraph, EvalContext, EvalError, EvalResult, ExplainTrace, FormulaError, FormulaExpr,
    FormulaResult, ResultCache, Sheet,
};
