//! Cell value types
//!
//! Values follow JavaScript's implicit conversion rules: [`CellValue::to_number`]
//! behaves like `Number(v)`, [`CellValue::to_text`] like `String(v)` and
//! [`CellValue::is_truthy`] like `!!v`. Formulas rely on these being exact so
//! results are reproducible across implementations.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Represents the value stored in or produced for a cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CellValue {
    /// No value (serialized as `null`)
    #[default]
    Empty,

    /// Boolean value
    Boolean(bool),

    /// Numeric value
    Number(f64),

    /// String value
    String(String),
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The number, if this value is a number (no conversion)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this value is a boolean (no conversion)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The string, if this value is a string (no conversion)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether arithmetic and comparisons treat this value as a number
    ///
    /// Numbers and booleans always are. Strings are when [`parse_number`]
    /// accepts them, which includes the empty string. `Empty` never is.
    pub fn is_numeric_coercible(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Boolean(_) | CellValue::Number(_) => true,
            CellValue::String(s) => parse_number(s).is_some(),
        }
    }

    /// Numeric view of the value; anything that does not convert becomes 0
    pub fn to_number(&self) -> f64 {
        match self {
            CellValue::Empty => 0.0,
            CellValue::Boolean(true) => 1.0,
            CellValue::Boolean(false) => 0.0,
            CellValue::Number(n) => *n,
            CellValue::String(s) => parse_number(s).unwrap_or(0.0),
        }
    }

    /// Text view of the value; `Empty` becomes the empty string
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::String(s) => s.clone(),
        }
    }

    /// `Empty`, `false`, `0`, `NaN` and `""` are falsy; everything else is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Boolean(b) => *b,
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CellValue::String(s) => !s.is_empty(),
        }
    }

    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Boolean(_) => "boolean",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// Parse text the way JavaScript's `Number(text)` does
///
/// Returns `None` where `Number` would produce `NaN`. Surrounding whitespace is
/// ignored and blank text is 0. Accepts decimal literals with an optional sign
/// and exponent, `Infinity`, and unsigned `0x`/`0o`/`0b` integers.
///
/// ```
/// use cellgraph_core::parse_number;
///
/// assert_eq!(parse_number(" 42 "), Some(42.0));
/// assert_eq!(parse_number(""), Some(0.0));
/// assert_eq!(parse_number("0x1F"), Some(31.0));
/// assert_eq!(parse_number("12px"), None);
/// ```
pub fn parse_number(text: &str) -> Option<f64> {
    let s = text.trim_matches(is_js_whitespace);
    if s.is_empty() {
        return Some(0.0);
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix_integer(&s[2..], radix);
    }

    let unsigned = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    if unsigned == "Infinity" {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    if !is_decimal_literal(unsigned) {
        return None;
    }
    s.parse().ok()
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

fn parse_radix_integer(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
    })
}

/// `digits [. digits] [e [+-] digits]` with at least one mantissa digit
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut pos = 0;

    let count_digits = |pos: &mut usize| {
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
        *pos - start
    };

    let mut mantissa_digits = count_digits(&mut pos);
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        mantissa_digits += count_digits(&mut pos);
    }
    if mantissa_digits == 0 {
        return false;
    }

    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) {
            pos += 1;
        }
        if count_digits(&mut pos) == 0 {
            return false;
        }
    }

    pos == bytes.len()
}

/// Format a number the way JavaScript's `String(n)` does
///
/// Uses the shortest digits that round-trip. Plain notation is used for
/// magnitudes in `[1e-6, 1e21)`, exponent notation (`1e+21`, `1.5e-7`)
/// otherwise. Negative zero prints as `0`.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if n == 0.0 {
        return "0".into();
    }

    let sign = if n < 0.0 { "-" } else { "" };
    let sci = format!("{:e}", n.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    // `digits` × 10^(point - k), following ECMAScript Number::toString
    let k = digits.len() as i32;
    let point = exponent + 1;

    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let e_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, e_sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, e_sign, e.abs())
        }
    };

    format!("{}{}", sign, body)
}

/// Typed evaluation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ErrorCode {
    /// Formula could not be tokenized or parsed, or names an unknown function
    Parse,
    /// Reference to an address with no cell
    Ref,
    /// Reference back into the chain currently being evaluated
    Cycle,
    /// Division by a value that coerces to zero
    Div0,
}

impl ErrorCode {
    /// The code as written in results (`"PARSE"`, `"REF"`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Parse => "PARSE",
            ErrorCode::Ref => "REF",
            ErrorCode::Cycle => "CYCLE",
            ErrorCode::Div0 => "DIV0",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PARSE" => Ok(ErrorCode::Parse),
            "REF" => Ok(ErrorCode::Ref),
            "CYCLE" => Ok(ErrorCode::Cycle),
            "DIV0" => Ok(ErrorCode::Div0),
            other => Err(Error::other(format!("unknown error code '{}'", other))),
        }
    }
}
