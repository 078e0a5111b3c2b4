//! Cell address and range types
//!
//! Columns use bijective base-26 letters (`A`..`Z`, `AA`, ...) with no zero
//! digit; rows are 1-based in text and 0-based internally.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// The optional `$` markers are carried as flags. They take part in equality
/// (two addresses are equal iff their A1 strings match), so code that uses an
/// address as a lookup key should normalize it with [`CellAddress::relative`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., Z=25, AA=26)
    pub col: u32,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create a new cell address with specified absolute/relative flags
    pub fn with_absolute(row: u32, col: u32, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u32) -> Self {
        Self::with_absolute(row, col, true, true)
    }

    /// The same position with both absolute markers cleared.
    pub fn relative(&self) -> Self {
        Self::new(self.row, self.col)
    }

    /// Whether either component carries a `$` marker
    pub fn is_absolute(&self) -> bool {
        self.row_absolute || self.col_absolute
    }

    /// Parse a cell address from A1-style notation
    ///
    /// The whole input must match `(\$)?[A-Z]+(\$)?[0-9]+` and the row must be
    /// at least 1.
    ///
    /// # Examples
    /// ```
    /// use cellgraph_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("A1").unwrap();
    /// assert_eq!(addr.row, 0);
    /// assert_eq!(addr.col, 0);
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!(addr.row, 1);
    /// assert_eq!(addr.col, 1);
    /// assert!(addr.row_absolute);
    /// assert!(addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = if bytes.first() == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_uppercase() {
            pos += 1;
        }

        if pos == col_start {
            return Err(Error::InvalidAddress(format!(
                "no column letters in '{}'",
                s
            )));
        }

        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = if bytes.get(pos) == Some(&b'$') {
            pos += 1;
            true
        } else {
            false
        };

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        if !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!(
                "invalid row number in '{}'",
                s
            )));
        }

        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("row number too large in '{}'", s)))?;

        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }

        Ok(Self {
            row: row - 1,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u32) -> String {
        let mut letters = Vec::new();
        let mut n = col as u64 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            letters.push((n % 26) as u8 + b'A');
            n /= 26;
        }

        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    ///
    /// Only uppercase `A`-`Z` are accepted.
    pub fn letters_to_column(letters: &str) -> Result<u32> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u64 = 0;
        for c in letters.chars() {
            if !c.is_ascii_uppercase() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c as u64 - 'A' as u64 + 1);
            if col > u32::MAX as u64 {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' is too large",
                    letters
                )));
            }
        }

        Ok((col - 1) as u32)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();

        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&Self::column_to_letters(self.col));

        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&(self.row as u64 + 1).to_string());

        result
    }

    /// Create a range from this address to another
    pub fn to(&self, other: CellAddress) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Traversal order for [`CellRange::cells`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeOrder {
    /// Top to bottom within a column, then the next column
    #[default]
    ColumnMajor,
    /// Left to right within a row, then the next row
    RowMajor,
}

/// A rectangular range of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    /// Start address (top-left)
    pub start: CellAddress,
    /// End address (bottom-right)
    pub end: CellAddress,
}

impl CellRange {
    /// Create a new cell range
    ///
    /// The corners may be given in any order; the range is normalized so that
    /// `start` is top-left and `end` is bottom-right.
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let (start_row, end_row) = if start.row <= end.row {
            (start.row, end.row)
        } else {
            (end.row, start.row)
        };

        let (start_col, end_col) = if start.col <= end.col {
            (start.col, end.col)
        } else {
            (end.col, start.col)
        };

        Self {
            start: CellAddress::with_absolute(
                start_row,
                start_col,
                start.row_absolute,
                start.col_absolute,
            ),
            end: CellAddress::with_absolute(end_row, end_col, end.row_absolute, end.col_absolute),
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from A1:B10 notation
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None) => {
                let start = CellAddress::parse(start)?;
                let end = CellAddress::parse(end)?;
                Ok(Self::new(start, end))
            }
            _ => Err(Error::InvalidRange(format!("expected START:END, got '{}'", s))),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, addr: &CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }

    /// Get the number of rows in the range
    pub fn row_count(&self) -> u64 {
        (self.end.row - self.start.row) as u64 + 1
    }

    /// Get the number of columns in the range
    pub fn col_count(&self) -> u64 {
        (self.end.col - self.start.col) as u64 + 1
    }

    /// Get the total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() * self.col_count()
    }

    /// Iterate over all cell addresses in the range
    ///
    /// The yielded addresses are relative. Every call starts a fresh pass.
    pub fn cells(&self, order: RangeOrder) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            order,
            next: Some((self.start.row, self.start.col)),
            remaining: self.cell_count(),
        }
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range
#[derive(Debug, Clone)]
pub struct CellRangeIterator {
    range: CellRange,
    order: RangeOrder,
    next: Option<(u32, u32)>,
    remaining: u64,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.next?;
        let start = self.range.start;
        let end = self.range.end;

        self.next = match self.order {
            RangeOrder::ColumnMajor if row < end.row => Some((row + 1, col)),
            RangeOrder::ColumnMajor if col < end.col => Some((start.row, col + 1)),
            RangeOrder::RowMajor if col < end.col => Some((row, col + 1)),
            RangeOrder::RowMajor if row < end.row => Some((row + 1, start.col)),
            _ => None,
        };
        self.remaining -= 1;

        Some(CellAddress::new(row, col))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CellRangeIterator {}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::CellAddress;
    use serde::de::{self, Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    impl Serialize for CellAddress {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_a1_string())
        }
    }

    impl<'de> Deserialize<'de> for CellAddress {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let text = String::deserialize(deserializer)?;
            CellAddress::parse(&text).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_column_to_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(1), "B");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(27), "AB");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(702), "AAA");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 0);
        assert_eq!(CellAddress::letters_to_column("Z").unwrap(), 25);
        assert_eq!(CellAddress::letters_to_column("AA").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("ZZ").unwrap(), 701);
        assert_eq!(CellAddress::letters_to_column("AAA").unwrap(), 702);

        // Lowercase is not part of the address grammar
        assert!(CellAddress::letters_to_column("a").is_err());
        assert!(CellAddress::letters_to_column("").is_err());
        assert!(CellAddress::letters_to_column("AAAAAAAAAAAAAAAA").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        let a1 = addr("A1");
        assert_eq!((a1.row, a1.col), (0, 0));
        assert!(!a1.row_absolute);
        assert!(!a1.col_absolute);

        let b3 = addr("$B$3");
        assert_eq!((b3.row, b3.col), (2, 1));
        assert!(b3.row_absolute);
        assert!(b3.col_absolute);

        let mixed = addr("$A1");
        assert!(mixed.col_absolute);
        assert!(!mixed.row_absolute);

        let mixed = addr("A$1");
        assert!(!mixed.col_absolute);
        assert!(mixed.row_absolute);
    }

    #[test]
    fn test_cell_address_parse_errors() {
        for bad in ["", "A", "1", "A0", "a1", " A1", "A1 ", "A1B", "$$A1", "A$$1", "A-1"] {
            assert!(
                matches!(CellAddress::parse(bad), Err(Error::InvalidAddress(_))),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(CellAddress::new(0, 0).to_string(), "A1");
        assert_eq!(CellAddress::new(99, 2).to_string(), "C100");
        assert_eq!(CellAddress::absolute(0, 0).to_string(), "$A$1");
        assert_eq!(CellAddress::with_absolute(4, 27, true, false).to_string(), "AB$5");
    }

    #[test]
    fn test_equality_includes_markers() {
        assert_ne!(addr("$A$1"), addr("A1"));
        assert_eq!(addr("$A$1").relative(), addr("A1"));
    }

    #[test]
    fn test_cell_range_parse() {
        let range = CellRange::parse("A1:B2").unwrap();
        assert_eq!(range.start, CellAddress::new(0, 0));
        assert_eq!(range.end, CellAddress::new(1, 1));

        assert!(CellRange::parse("A1").is_err());
        assert!(CellRange::parse("A1:B2:C3").is_err());
    }

    #[test]
    fn test_cell_range_contains() {
        let range = CellRange::parse("B2:D4").unwrap();

        assert!(range.contains(&CellAddress::new(1, 1)));
        assert!(range.contains(&CellAddress::new(3, 3)));
        assert!(!range.contains(&CellAddress::new(0, 0)));
        assert!(!range.contains(&CellAddress::new(4, 1)));
    }

    #[test]
    fn test_column_major_iteration() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<String> = range
            .cells(RangeOrder::ColumnMajor)
            .map(|a| a.to_string())
            .collect();
        assert_eq!(cells, ["A1", "A2", "B1", "B2"]);
    }

    #[test]
    fn test_row_major_iteration() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<String> = range
            .cells(RangeOrder::RowMajor)
            .map(|a| a.to_string())
            .collect();
        assert_eq!(cells, ["A1", "B1", "A2", "B2"]);
    }

    #[test]
    fn test_iteration_is_restartable() {
        let range = CellRange::parse("B2:C4").unwrap();
        let first: Vec<_> = range.cells(RangeOrder::default()).collect();
        let second: Vec<_> = range.cells(RangeOrder::default()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
    }

    #[test]
    fn test_iterator_exact_size() {
        let range = CellRange::parse("A1:C3").unwrap();
        let mut cells = range.cells(RangeOrder::ColumnMajor);
        assert_eq!(cells.len(), 9);
        cells.next();
        cells.next();
        assert_eq!(cells.len(), 7);
    }

    #[test]
    fn test_range_normalization() {
        let forward: Vec<_> = addr("A1").to(addr("C3")).cells(RangeOrder::ColumnMajor).collect();
        let backward: Vec<_> = addr("C3").to(addr("A1")).cells(RangeOrder::ColumnMajor).collect();
        assert_eq!(forward.len(), 9);
        assert_eq!(forward, backward);

        let anti: Vec<_> = addr("C1").to(addr("A3")).cells(RangeOrder::ColumnMajor).collect();
        assert_eq!(forward, anti);
    }

    proptest! {
        #[test]
        fn prop_column_round_trip(col in 0u32..1_000_000) {
            let letters = CellAddress::column_to_letters(col);
            prop_assert_eq!(CellAddress::letters_to_column(&letters).unwrap(), col);
        }

        #[test]
        fn prop_address_round_trip(
            row in 0u32..10_000_000,
            col in 0u32..100_000,
            row_abs in any::<bool>(),
            col_abs in any::<bool>(),
        ) {
            let original = CellAddress::with_absolute(row, col, row_abs, col_abs);
            let parsed = CellAddress::parse(&original.to_a1_string()).unwrap();
            prop_assert_eq!(parsed, original);
        }

        #[test]
        fn prop_range_corners_commute(
            r1 in 0u32..20, c1 in 0u32..20, r2 in 0u32..20, c2 in 0u32..20,
        ) {
            let a = CellAddress::new(r1, c1);
            let b = CellAddress::new(r2, c2);
            let mut forward: Vec<_> = a.to(b).cells(RangeOrder::ColumnMajor).collect();
            let mut backward: Vec<_> = b.to(a).cells(RangeOrder::RowMajor).collect();
            forward.sort();
            backward.sort();
            prop_assert_eq!(&forward, &backward);
            let expected = ((r1 as i64 - r2 as i64).abs() + 1) * ((c1 as i64 - c2 as i64).abs() + 1);
            prop_assert_eq!(forward.len() as i64, expected);
        }
    }
}
