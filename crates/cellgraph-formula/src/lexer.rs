//! Formula tokenizer
//!
//! Splits formula source (without the leading `=`) into a flat token stream.
//! Tokens are produced lazily, so a bad character is only reported once the
//! parser reaches it.

use crate::ast::BinaryOperator;
use crate::error::{FormulaError, FormulaResult};
use std::fmt;

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),

    // Identifiers and references
    /// Cell reference like `A1` or `$B$2`, upper-cased
    CellRef(String),
    /// Any other identifier, upper-cased
    Function(String),

    // Operators
    Operator(BinaryOperator),
    Colon,
    Comma,

    // Delimiters
    LParen,
    RParen,

    // End of input
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::String(s) => write!(f, "string \"{}\"", s),
            Token::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Token::CellRef(r) => write!(f, "reference {}", r),
            Token::Function(name) => write!(f, "identifier {}", name),
            Token::Operator(op) => write!(f, "operator {}", op),
            Token::Colon => f.write_str("':'"),
            Token::Comma => f.write_str("','"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Formula lexer with one token of lookahead
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over formula source
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            peeked: None,
        }
    }

    /// Consume and return the next token
    ///
    /// Once the input is exhausted this keeps returning [`Token::Eof`].
    pub fn next_token(&mut self) -> FormulaResult<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.scan_token(),
        }
    }

    /// Look at the next token without consuming it
    pub fn peek(&mut self) -> FormulaResult<&Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    // === Token scanning ===

    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        // Single-character punctuation
        let punct = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            _ => None,
        };
        if let Some(token) = punct {
            self.advance();
            return Ok(token);
        }

        if c == '"' {
            return Ok(self.scan_string());
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return Ok(self.scan_number());
        }

        // Two-character operators win over their one-character prefixes
        if let Some(op) = self
            .input
            .get(self.pos..self.pos + 2)
            .and_then(BinaryOperator::from_symbol)
        {
            self.pos += 2;
            return Ok(Token::Operator(op));
        }

        let mut buf = [0u8; 4];
        if let Some(op) = BinaryOperator::from_symbol(c.encode_utf8(&mut buf)) {
            self.advance();
            return Ok(Token::Operator(op));
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return Ok(self.scan_identifier_or_ref());
        }

        Err(FormulaError::Lex {
            ch: c,
            pos: self.input[..self.pos].chars().count(),
        })
    }

    /// Double-quoted string; `\"` is the only escape and a missing closing
    /// quote ends the string at end of input
    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            match c {
                '"' => {
                    self.advance();
                    break;
                }
                '\\' if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                _ => {
                    s.push(c);
                    self.advance();
                }
            }
        }

        Token::String(s)
    }

    /// Digits with at most one decimal point; there is no exponent syntax
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;

        while let Some(c) = self.peek_char() {
            if c == '.' && !seen_dot {
                seen_dot = true;
            } else if !c.is_ascii_digit() {
                break;
            }
            self.advance();
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(0.0))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;

        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }

        let upper = self.input[start..self.pos].to_ascii_uppercase();

        if Self::is_cell_reference(&upper) {
            return Token::CellRef(upper);
        }

        match upper.as_str() {
            "TRUE" => Token::Boolean(true),
            "FALSE" => Token::Boolean(false),
            _ => Token::Function(upper),
        }
    }

    /// `[$]letters[$]digits` and nothing else
    fn is_cell_reference(text: &str) -> bool {
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let letter_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letter_start {
            return false;
        }

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }

        let digit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == digit_start {
            return false;
        }

        i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }
}

/// Tokenize a whole formula body, ending with [`Token::Eof`]
pub fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(symbol: &str) -> Token {
        Token::Operator(BinaryOperator::from_symbol(symbol).unwrap())
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(
            tokenize("1 + A1*2").unwrap(),
            vec![
                Token::Number(1.0),
                op("+"),
                Token::CellRef("A1".into()),
                op("*"),
                Token::Number(2.0),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("3.25 .5 7.").unwrap(),
            vec![
                Token::Number(3.25),
                Token::Number(0.5),
                Token::Number(7.0),
                Token::Eof
            ]
        );
        // A second dot starts a new number
        assert_eq!(
            tokenize("1.2.3").unwrap(),
            vec![Token::Number(1.2), Token::Number(0.3), Token::Eof]
        );
        // No exponent syntax: `1e5` is a number followed by an identifier
        assert_eq!(
            tokenize("1e5").unwrap(),
            vec![
                Token::Number(1.0),
                Token::CellRef("E5".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokenize(r#""say \"hi\"""#).unwrap(),
            vec![Token::String("say \"hi\"".into()), Token::Eof]
        );
        assert_eq!(
            tokenize(r#""a\b""#).unwrap(),
            vec![Token::String("a\\b".into()), Token::Eof]
        );
        assert_eq!(
            tokenize(r#""open"#).unwrap(),
            vec![Token::String("open".into()), Token::Eof]
        );
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            tokenize("sum $a$1 b$2 true False if_2").unwrap(),
            vec![
                Token::Function("SUM".into()),
                Token::CellRef("$A$1".into()),
                Token::CellRef("B$2".into()),
                Token::Boolean(true),
                Token::Boolean(false),
                Token::Function("IF_2".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("<= >= <> < > = - / ^").unwrap(),
            vec![
                op("<="),
                op(">="),
                op("<>"),
                op("<"),
                op(">"),
                op("="),
                op("-"),
                op("/"),
                op("^"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            tokenize("F(A1:B2,)").unwrap(),
            vec![
                Token::Function("F".into()),
                Token::LParen,
                Token::CellRef("A1".into()),
                Token::Colon,
                Token::CellRef("B2".into()),
                Token::Comma,
                Token::RParen,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_unexpected_character() {
        assert_eq!(
            tokenize("1 + #").unwrap_err(),
            FormulaError::Lex { ch: '#', pos: 4 }
        );
        assert_eq!(
            tokenize("\"é\" & 1").unwrap_err(),
            FormulaError::Lex { ch: '&', pos: 4 }
        );
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("A1 + 2");
        assert_eq!(lexer.peek().unwrap(), &Token::CellRef("A1".into()));
        assert_eq!(lexer.peek().unwrap(), &Token::CellRef("A1".into()));
        assert_eq!(lexer.next_token().unwrap(), Token::CellRef("A1".into()));
        assert_eq!(lexer.next_token().unwrap(), op("+"));
        assert_eq!(lexer.peek().unwrap(), &Token::Number(2.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Number(2.0));
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
        assert_eq!(lexer.next_token().unwrap(), Token::Eof);
    }
}
