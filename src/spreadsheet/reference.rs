//! A1-style cell references and column bands.
//!
//! Rows and columns are 1-based throughout the crate: `A1` is `(1, 1)`.

use crate::spreadsheet::SpreadsheetError;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// Highest column index a worksheet can address (`XFD`).
pub const MAX_COLUMN: usize = 16_384;

static CELL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("Hardcode regex pattern"));

static COLUMN_BAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z]{1,3})\s*(?::\s*([A-Za-z]{1,3})\s*)?$").expect("Hardcode regex pattern"));

/// Converts column letters (`A`, `l`, `AA`) to a 1-based column index.
pub fn column_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index = 0usize;
    for character in letters.chars() {
        if !character.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (character.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index).filter(|index| *index <= MAX_COLUMN)
}

/// Converts a 1-based column index to its letters (`1` -> `A`, `27` -> `AA`).
pub fn index_to_column(index: usize) -> String {
    let mut letters = Vec::<u8>::new();
    let mut remainder = index;
    while remainder > 0 {
        let digit = (remainder - 1) % 26;
        letters.push(b'A' + digit as u8);
        remainder = (remainder - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Parses a cell reference such as `B12` or `$B$12` into `(row, col)`.
pub fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let captures = CELL_REFERENCE.captures(reference)?;
    let col = column_to_index(captures.get(1)?.as_str())?;
    let row = captures.get(2)?.as_str().parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row, col))
}

/// Formats `(row, col)` as an A1-style reference.
pub fn index_to_reference(row: usize, col: usize) -> String {
    format!("{}{}", index_to_column(col), row)
}

/// An inclusive band of columns, e.g. `A:F`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnBand {
    /// First column (1-based, inclusive)
    pub first: usize,
    /// Last column (1-based, inclusive)
    pub last: usize,
}

impl ColumnBand {
    /// Columns `A` through `F`, the primary loadout block.
    pub const A_TO_F: ColumnBand = ColumnBand { first: 1, last: 6 };
    /// Columns `G` through `L`, the extended loadout block.
    pub const G_TO_L: ColumnBand = ColumnBand { first: 7, last: 12 };
    /// Columns `A` through `L`, the editable block.
    pub const A_TO_L: ColumnBand = ColumnBand { first: 1, last: 12 };

    pub fn new(first: usize, last: usize) -> Result<Self, SpreadsheetError> {
        if first == 0 || first > last || last > MAX_COLUMN {
            return Err(SpreadsheetError::InvalidColumnBand(format!("{first}:{last}")));
        }
        Ok(ColumnBand { first, last })
    }

    pub fn contains(&self, col: usize) -> bool {
        self.first <= col && col <= self.last
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn columns(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }
}

impl TryFrom<&str> for ColumnBand {
    type Error = SpreadsheetError;

    /// Parses `"A:F"`, `"g:l"` or a single column `"C"`.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || SpreadsheetError::InvalidColumnBand(value.to_owned());
        let captures = COLUMN_BAND.captures(value).ok_or_else(invalid)?;
        let first = captures
            .get(1)
            .and_then(|matcher| column_to_index(matcher.as_str()))
            .ok_or_else(invalid)?;
        let last = match captures.get(2) {
            Some(matcher) => column_to_index(matcher.as_str()).ok_or_else(invalid)?,
            None => first,
        };
        ColumnBand::new(first, last).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ColumnBand {
    type Error = SpreadsheetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ColumnBand::try_from(value.as_str())
    }
}

impl From<ColumnBand> for String {
    fn from(band: ColumnBand) -> Self {
        band.to_string()
    }
}

impl Display for ColumnBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", index_to_column(self.first), index_to_column(self.last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_round_trip_at_boundaries() {
        assert_eq!(column_to_index("A"), Some(1));
        assert_eq!(column_to_index("l"), Some(12));
        assert_eq!(column_to_index("Z"), Some(26));
        assert_eq!(column_to_index("AA"), Some(27));
        assert_eq!(column_to_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_to_index("XFE"), None);
        assert_eq!(column_to_index(""), None);
        assert_eq!(column_to_index("1"), None);
        assert_eq!(index_to_column(1), "A");
        assert_eq!(index_to_column(26), "Z");
        assert_eq!(index_to_column(27), "AA");
        assert_eq!(index_to_column(MAX_COLUMN), "XFD");
    }

    #[test]
    fn cell_references() {
        assert_eq!(reference_to_index("B12"), Some((12, 2)));
        assert_eq!(reference_to_index("$C$3"), Some((3, 3)));
        assert_eq!(reference_to_index("A0"), None);
        assert_eq!(reference_to_index("12"), None);
        assert_eq!(index_to_reference(5, 28), "AB5");
    }

    #[test]
    fn column_band_parsing() {
        assert_eq!(ColumnBand::try_from("A:F").ok(), Some(ColumnBand::A_TO_F));
        assert_eq!(ColumnBand::try_from(" g : l ").ok(), Some(ColumnBand::G_TO_L));
        assert_eq!(ColumnBand::try_from("C").ok(), Some(ColumnBand { first: 3, last: 3 }));
        assert!(ColumnBand::try_from("F:A").is_err());
        assert!(ColumnBand::try_from("A1:B2").is_err());
        assert_eq!(ColumnBand::A_TO_L.to_string(), "A:L");
        assert_eq!(ColumnBand::G_TO_L.len(), 6);
        assert!(ColumnBand::A_TO_L.contains(12));
        assert!(!ColumnBand::A_TO_L.contains(13));
    }
}
