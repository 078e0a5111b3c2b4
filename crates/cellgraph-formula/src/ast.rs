//! Formula Abstract Syntax Tree types

use cellgraph_core::{CellAddress, CellRange};
use std::fmt;

/// Formula expression AST
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    // === Literals ===
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),

    // === References ===
    /// Single cell reference
    CellRef(CellReference),
    /// Range reference
    RangeRef(RangeReference),

    // === Operators ===
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    // === Function call ===
    /// Function call; `name` is upper-cased and arguments are left unevaluated
    Function {
        name: String,
        args: Vec<FormulaExpr>,
    },
}

impl FormulaExpr {
    /// Every cell this expression reads for ordering purposes
    ///
    /// Yields each `CellRef` target and both written endpoints of each
    /// `RangeRef`, in source order, normalized to relative addresses and
    /// without duplicates. Interior cells of a range are not included.
    pub fn precedents(&self) -> Vec<CellAddress> {
        let mut refs = Vec::new();
        collect_precedents(self, &mut refs);
        refs
    }
}

fn collect_precedents(expr: &FormulaExpr, refs: &mut Vec<CellAddress>) {
    match expr {
        FormulaExpr::CellRef(cell_ref) => push_unique(refs, cell_ref.address),
        FormulaExpr::RangeRef(range_ref) => {
            push_unique(refs, range_ref.start);
            push_unique(refs, range_ref.end);
        }
        FormulaExpr::BinaryOp { left, right, .. } => {
            collect_precedents(left, refs);
            collect_precedents(right, refs);
        }
        FormulaExpr::UnaryOp { operand, .. } => collect_precedents(operand, refs),
        FormulaExpr::Function { args, .. } => {
            for arg in args {
                collect_precedents(arg, refs);
            }
        }
        FormulaExpr::Number(_) | FormulaExpr::String(_) | FormulaExpr::Boolean(_) => {}
    }
}

fn push_unique(refs: &mut Vec<CellAddress>, addr: CellAddress) {
    let addr = addr.relative();
    if !refs.contains(&addr) {
        refs.push(addr);
    }
}

/// Cell reference; the address keeps any `$` markers from the source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellReference {
    pub address: CellAddress,
}

/// Range reference with its endpoints as written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeReference {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeReference {
    /// The normalized rectangle the endpoints span
    pub fn range(&self) -> CellRange {
        CellRange::new(self.start, self.end)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Equal | BinaryOperator::NotEqual => 1,
            BinaryOperator::LessThan
            | BinaryOperator::LessEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterEqual => 2,
            BinaryOperator::Add | BinaryOperator::Subtract => 3,
            BinaryOperator::Multiply | BinaryOperator::Divide => 4,
            BinaryOperator::Power => 5,
        }
    }

    /// Only `^` groups to the right
    pub fn is_right_associative(&self) -> bool {
        matches!(self, BinaryOperator::Power)
    }

    /// The operator as written in formulas
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }

    /// Look up an operator by its symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "^" => BinaryOperator::Power,
            "=" => BinaryOperator::Equal,
            "<>" => BinaryOperator::NotEqual,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterEqual,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(s: &str) -> FormulaExpr {
        FormulaExpr::CellRef(CellReference {
            address: CellAddress::parse(s).unwrap(),
        })
    }

    #[test]
    fn test_precedents_walks_all_nodes() {
        // SUM(A1:B3, -C1) + $A$1
        let expr = FormulaExpr::BinaryOp {
            op: BinaryOperator::Add,
            left: Box::new(FormulaExpr::Function {
                name: "SUM".into(),
                args: vec![
                    FormulaExpr::RangeRef(RangeReference {
                        start: CellAddress::parse("A1").unwrap(),
                        end: CellAddress::parse("B3").unwrap(),
                    }),
                    FormulaExpr::UnaryOp {
                        op: UnaryOperator::Negate,
                        operand: Box::new(cell("C1")),
                    },
                ],
            }),
            right: Box::new(cell("$A$1")),
        };

        let names: Vec<String> = expr.precedents().iter().map(|a| a.to_string()).collect();
        assert_eq!(names, ["A1", "B3", "C1"]);
    }

    #[test]
    fn test_literals_have_no_precedents() {
        assert!(FormulaExpr::Number(1.0).precedents().is_empty());
        assert!(FormulaExpr::String("A1".into()).precedents().is_empty());
    }

    #[test]
    fn test_operator_table() {
        for symbol in ["+", "-", "*", "/", "^", "=", "<>", "<", "<=", ">", ">="] {
            let op = BinaryOperator::from_symbol(symbol).unwrap();
            assert_eq!(op.symbol(), symbol);
        }
        assert!(BinaryOperator::Power.precedence() > BinaryOperator::Multiply.precedence());
        assert!(BinaryOperator::Add.precedence() > BinaryOperator::LessThan.precedence());
        assert!(BinaryOperator::LessThan.precedence() > BinaryOperator::Equal.precedence());
        assert!(BinaryOperator::Power.is_right_associative());
        assert!(!BinaryOperator::Subtract.is_right_associative());
        assert_eq!(BinaryOperator::from_symbol("&"), None);
    }
}
