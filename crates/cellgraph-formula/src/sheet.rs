//! Sheet and cell model consumed by the evaluator

use crate::ast::FormulaExpr;
use crate::error::FormulaError;
use crate::parser::parse_formula;
use cellgraph_core::{CellAddress, CellValue, ErrorCode};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Contents of one cell
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum Cell {
    /// A constant value
    Literal { value: CellValue },

    /// A formula and, once parsed, its AST
    Formula {
        /// Source text, normally with the leading `=`
        src: String,
        /// Cached parse of `src`; `None` until parsed or when it does not parse
        #[cfg_attr(feature = "serde", serde(skip))]
        ast: Option<FormulaExpr>,
    },

    /// A stored error state
    Error { code: ErrorCode, message: String },
}

impl Cell {
    /// Create a literal cell
    pub fn literal<V: Into<CellValue>>(value: V) -> Self {
        Cell::Literal {
            value: value.into(),
        }
    }

    /// Create an unparsed formula cell
    pub fn formula<S: Into<String>>(src: S) -> Self {
        Cell::Formula {
            src: src.into(),
            ast: None,
        }
    }

    /// Create a stored error cell
    pub fn error<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        Cell::Error {
            code,
            message: message.into(),
        }
    }

    /// Check if the cell holds a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, Cell::Formula { .. })
    }

    /// Formula source, if this is a formula cell
    pub fn formula_src(&self) -> Option<&str> {
        match self {
            Cell::Formula { src, .. } => Some(src),
            _ => None,
        }
    }

    /// Cached AST, if this is a parsed formula cell
    pub fn ast(&self) -> Option<&FormulaExpr> {
        match self {
            Cell::Formula { ast, .. } => ast.as_ref(),
            _ => None,
        }
    }

    /// Parse the formula source if no AST is cached yet
    ///
    /// Non-formula cells and already parsed formulas are left alone.
    pub fn ensure_parsed(&mut self) -> Result<(), FormulaError> {
        if let Cell::Formula { src, ast } = self {
            if ast.is_none() {
                *ast = Some(parse_formula(src)?);
            }
        }
        Ok(())
    }
}

/// A grid of cells
///
/// Keys are always relative addresses; every accessor normalizes the address
/// it is given, so `$A$1` and `A1` name the same cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Sheet {
    /// Populated cells; anything absent is empty
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "serde_impl::relative_keys")
    )]
    pub cells: BTreeMap<CellAddress, Cell>,
    /// Number of rows in the grid extent
    pub rows: u32,
    /// Number of columns in the grid extent
    pub cols: u32,
    /// Display name
    pub name: String,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Sheet {
    /// Create an empty sheet with the given extent
    pub fn new<S: Into<String>>(name: S, rows: u32, cols: u32) -> Self {
        Self {
            cells: BTreeMap::new(),
            rows,
            cols,
            name: name.into(),
            updated_at: Utc::now(),
        }
    }

    /// Get a cell
    pub fn get(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&addr.relative())
    }

    /// Get a mutable cell
    pub fn get_mut(&mut self, addr: CellAddress) -> Option<&mut Cell> {
        self.cells.get_mut(&addr.relative())
    }

    /// Store a cell, returning the previous contents
    pub fn set(&mut self, addr: CellAddress, cell: Cell) -> Option<Cell> {
        self.cells.insert(addr.relative(), cell)
    }

    /// Remove a cell, returning its contents
    pub fn remove(&mut self, addr: CellAddress) -> Option<Cell> {
        self.cells.remove(&addr.relative())
    }

    /// Addresses of all formula cells, in row-major address order
    pub fn formula_cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(addr, _)| *addr)
    }

    /// Whether the address lies within `rows` x `cols`
    pub fn is_valid_address(&self, addr: CellAddress) -> bool {
        addr.row < self.rows && addr.col < self.cols
    }

    /// Parse and cache the AST of every formula cell that has none
    ///
    /// Cells whose source does not parse keep `ast: None` and are returned
    /// together with the error.
    pub fn parse_formulas(&mut self) -> Vec<(CellAddress, FormulaError)> {
        let mut failures = Vec::new();
        for (addr, cell) in self.cells.iter_mut() {
            if let Err(err) = cell.ensure_parsed() {
                failures.push((*addr, err));
            }
        }
        failures
    }

    /// Mark the sheet as modified now
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Cell;
    use cellgraph_core::CellAddress;
    use serde::{Deserialize, Deserializer};
    use std::collections::BTreeMap;

    pub(super) fn relative_keys<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<CellAddress, Cell>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let cells = BTreeMap::<CellAddress, Cell>::deserialize(deserializer)?;
        Ok(cells
            .into_iter()
            .map(|(addr, cell)| (addr.relative(), cell))
            .collect())
    }
}
