//! # cellgraph-core
//!
//! Core data structures for the cellgraph formula engine.
//!
//! This crate provides the fundamental types used throughout cellgraph:
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing and range iteration
//! - [`CellValue`] - Cell values with JavaScript-compatible coercions
//! - [`ErrorCode`] - Evaluation error codes
//!
//! ## Example
//!
//! ```rust
//! use cellgraph_core::{CellAddress, CellRange, CellValue, RangeOrder};
//!
//! let addr = CellAddress::parse("$B$3").unwrap();
//! assert_eq!(addr.relative().to_string(), "B3");
//!
//! let range = CellRange::parse("A1:B2").unwrap();
//! let cells: Vec<String> = range
//!     .cells(RangeOrder::ColumnMajor)
//!     .map(|a| a.to_string())
//!     .collect();
//! assert_eq!(cells, ["A1", "A2", "B1", "B2"]);
//!
//! assert!(CellValue::from("5").is_numeric_coercible());
//! ```

pub mod cell;
pub mod error;

// Re-exports for convenience
pub use cell::{
    format_number, parse_number, CellAddress, CellRange, CellRangeIterator, CellValue, ErrorCode,
    RangeOrder,
};
pub use error::{Error, Result};
