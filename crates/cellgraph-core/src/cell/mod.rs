//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - A value held by or computed for a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular block of cells (e.g., "A1:B10")
//! - [`ErrorCode`] - The typed error codes a formula can produce

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator, RangeOrder};
pub use value::{format_number, parse_number, CellValue, ErrorCode};
