//! Classification of raw user input into cell edits

use crate::{parse_number, Cell, CellValue};

/// What a piece of typed input does to a cell
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Remove the cell
    Clear,
    /// Store a formula; the text keeps its leading `=`
    Formula(String),
    /// Store a constant
    Literal(CellValue),
}

impl EditCommand {
    /// Classify raw input
    ///
    /// Input is trimmed first. Blank input clears the cell, a leading `=`
    /// makes a formula, then numbers, then `true`/`false` in any case, and
    /// anything else is kept as text.
    pub fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return EditCommand::Clear;
        }
        if trimmed.starts_with('=') {
            return EditCommand::Formula(trimmed.to_string());
        }
        if let Some(n) = parse_number(trimmed) {
            return EditCommand::Literal(CellValue::Number(n));
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return EditCommand::Literal(CellValue::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return EditCommand::Literal(CellValue::Boolean(false));
        }
        EditCommand::Literal(CellValue::String(trimmed.to_string()))
    }

    /// The cell to store, or `None` to clear
    pub fn into_cell(self) -> Option<Cell> {
        match self {
            EditCommand::Clear => None,
            EditCommand::Formula(src) => Some(Cell::formula(src)),
            EditCommand::Literal(value) => Some(Cell::Literal { value }),
        }
    }
}
