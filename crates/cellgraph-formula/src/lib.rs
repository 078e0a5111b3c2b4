//! # cellgraph-formula
//!
//! Formula language and evaluation for cellgraph.
//!
//! This crate provides:
//! - Tokenizing and parsing formulas (text → AST)
//! - The [`Sheet`] cell model the evaluator reads from
//! - Formula evaluation with cycle and error detection (AST → value)
//! - Built-in functions: SUM, AVG, MIN, MAX, COUNT, IF
//! - A dependency graph for ordering recalculation
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_core::{CellAddress, CellValue};
//! use cellgraph_formula::{evaluate_cell, Cell, Sheet};
//!
//! let mut sheet = Sheet::new("Sheet1", 100, 26);
//! sheet.set(CellAddress::parse("A1").unwrap(), Cell::literal(2.0));
//! sheet.set(CellAddress::parse("B1").unwrap(), Cell::formula("=A1*21"));
//!
//! let eval = evaluate_cell(&sheet, CellAddress::parse("B1").unwrap(), false);
//! assert_eq!(eval.result.value(), Some(&CellValue::Number(42.0)));
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod sheet;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use dependency::DependencyGraph;
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate, evaluate_cell, evaluate_cell_cached, evaluate_reference, get_function_registry,
    CellEvaluation, EvalContext, EvalError, EvalResult, ExplainTrace, ResultCache,
};
pub use functions::{FunctionDef, FunctionRegistry};
pub use lexer::{tokenize, Lexer, Token};
pub use parser::parse_formula;
pub use sheet::{Cell, Sheet};
