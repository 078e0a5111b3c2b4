//! Formula parser
//!
//! A precedence-climbing parser over the [`Lexer`](crate::lexer::Lexer) token
//! stream.
//!
//! Precedence (lowest to highest):
//! 1. Equality: `=`, `<>`
//! 2. Comparison: `<`, `<=`, `>`, `>=`
//! 3. Addition/Subtraction: `+`, `-`
//! 4. Multiplication/Division: `*`, `/`
//! 5. Exponentiation: `^` (right associative)
//!
//! Prefix `-` applies to the primary that follows it, before any binary
//! operator, so `-2^2` is `(-2)^2`.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{Lexer, Token};
use cellgraph_core::CellAddress;

/// Parse a formula string into an AST
///
/// A single leading `=` is optional. An empty body parses to the number 0.
///
/// # Example
/// ```rust
/// use cellgraph_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("=SUM(A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let mut parser = FormulaParser::new(body)?;
    if parser.current_token() == &Token::Eof {
        return Ok(FormulaExpr::Number(0.0));
    }

    let expr = parser.parse_expression(0)?;

    // Make sure we consumed all input
    if parser.current_token() != &Token::Eof {
        return Err(FormulaError::Parse("Unexpected trailing input".into()));
    }

    Ok(expr)
}

/// Formula parser
struct FormulaParser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Self {
            lexer,
            current_token,
        })
    }

    // === Helper methods ===

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current_token, next))
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(FormulaError::Parse(format!(
                "Expected {}, got {}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self, min_precedence: u8) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_primary()?;

        while let Token::Operator(op) = *self.current_token() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.consume()?;

            let next_min = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_expression(next_min)?;
            left = FormulaExpr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.consume()? {
            Token::Number(n) => Ok(FormulaExpr::Number(n)),

            Token::String(s) => Ok(FormulaExpr::String(s)),

            Token::Boolean(b) => Ok(FormulaExpr::Boolean(b)),

            Token::Function(name) => {
                if self.current_token() == &Token::LParen {
                    self.parse_function_call(name)
                } else {
                    Err(FormulaError::Parse(format!(
                        "Unexpected identifier {}",
                        name
                    )))
                }
            }

            Token::CellRef(text) => {
                let start = parse_reference(&text)?;
                if self.current_token() != &Token::Colon {
                    return Ok(FormulaExpr::CellRef(CellReference { address: start }));
                }

                self.consume()?;
                match self.consume()? {
                    Token::CellRef(end) => Ok(FormulaExpr::RangeRef(RangeReference {
                        start,
                        end: parse_reference(&end)?,
                    })),
                    _ => Err(FormulaError::Parse(
                        "Range end must be cell reference".into(),
                    )),
                }
            }

            Token::LParen => {
                let expr = self.parse_expression(0)?;
                if self.current_token() != &Token::RParen {
                    return Err(FormulaError::Parse("Missing )".into()));
                }
                self.consume()?;
                Ok(expr)
            }

            Token::Operator(BinaryOperator::Subtract) => {
                let operand = self.parse_primary()?;
                Ok(FormulaExpr::UnaryOp {
                    op: UnaryOperator::Negate,
                    operand: Box::new(operand),
                })
            }

            Token::Operator(op) => Err(FormulaError::Parse(format!(
                "Unexpected operator {}",
                op
            ))),

            token => Err(FormulaError::Parse(format!("Unexpected {}", token))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();

        if self.current_token() != &Token::RParen {
            loop {
                args.push(self.parse_expression(0)?);
                if self.current_token() == &Token::Comma {
                    self.consume()?;
                    continue;
                }
                break;
            }
        }

        self.expect(&Token::RParen)?;

        Ok(FormulaExpr::Function { name, args })
    }
}

fn parse_reference(text: &str) -> FormulaResult<CellAddress> {
    CellAddress::parse(text).map_err(|e| FormulaError::Parse(e.to_string()))
}
