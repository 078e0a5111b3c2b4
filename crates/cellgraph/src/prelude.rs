//! Prelude module - common imports for cellgraph users
//!
//! ```rust
//! use cellgraph::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    // Sheet model
    Cell,
    CellAddress,
    CellRange,
    // Values and errors
    CellValue,
    EditCommand,
    ErrorCode,
    EvalError,
    EvalResult,
    EvalResults,
    FormulaEngine,
    Recalculation,
    Sheet,
};
