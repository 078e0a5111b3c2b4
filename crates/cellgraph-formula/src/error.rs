//! Formula error types

use cellgraph_core::{CellAddress, ErrorCode};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// A character the lexer has no token for
    #[error("Unexpected character '{ch}' at {pos}")]
    Lex { ch: char, pos: usize },

    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Reference to an address with no cell
    #[error("Bad reference: {0}")]
    InvalidReference(CellAddress),

    /// Reference back into the chain being evaluated
    #[error("Circular reference: {0}")]
    CircularReference(CellAddress),

    /// Division by a value that coerces to zero
    #[error("Division by zero")]
    DivisionByZero,

    /// An error already carried by a referenced cell
    #[error("{message}")]
    Propagated { code: ErrorCode, message: String },
}

impl FormulaError {
    /// The result code this error is reported under
    pub fn code(&self) -> ErrorCode {
        match self {
            FormulaError::Lex { .. }
            | FormulaError::Parse(_)
            | FormulaError::UnknownFunction(_) => ErrorCode::Parse,
            FormulaError::InvalidReference(_) => ErrorCode::Ref,
            FormulaError::CircularReference(_) => ErrorCode::Cycle,
            FormulaError::DivisionByZero => ErrorCode::Div0,
            FormulaError::Propagated { code, .. } => *code,
        }
    }
}
