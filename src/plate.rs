use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Row labels of a 96-well plate, top to bottom.
pub const ROWS: &str = "ABCDEFGH";
pub const NUM_ROWS: usize = 8;
pub const NUM_COLS: usize = 12;
pub const PLATE_SIZE: usize = NUM_ROWS * NUM_COLS;

/// A single position on a 96-well plate.
///
/// `row` and `col` are zero-based; the label uses the plate convention
/// (`A1` is `row 0, col 0`, `H12` is `row 7, col 11`).  Ordering is plate
/// order: across a row first, then down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Well {
    row: u8,
    col: u8,
}

impl Well {
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < NUM_ROWS && col < NUM_COLS).then_some(Well {
            row: row as u8,
            col: col as u8,
        })
    }

    pub fn row(&self) -> usize {
        self.row as usize
    }

    pub fn col(&self) -> usize {
        self.col as usize
    }

    pub fn row_letter(&self) -> char {
        ROWS.as_bytes()[self.row()] as char
    }

    /// One-based column number as printed on the plate.
    pub fn col_number(&self) -> usize {
        self.col() + 1
    }
}

impl fmt::Display for Well {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.col_number())
    }
}

impl Serialize for Well {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a well between A1 and H12")]
pub struct ParseWellError(pub String);

/// Only canonical labels parse: `A1`, never `a1` or `A01`.
impl FromStr for Well {
    type Err = ParseWellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseWellError(s.to_string());
        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(err)?;
        let row = ROWS.find(letter).ok_or_else(err)?;
        let digits = chars.as_str();
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let col: usize = digits.parse().map_err(|_| err())?;
        if col == 0 {
            return Err(err());
        }
        Well::new(row, col - 1).ok_or_else(err)
    }
}

/// All 96 wells in plate order.
pub fn all_wells() -> Vec<Well> {
    (0..NUM_ROWS)
        .flat_map(|r| (0..NUM_COLS).map(move |c| Well { row: r as u8, col: c as u8 }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_labels() {
        let a1: Well = "A1".parse().unwrap();
        assert_eq!((a1.row(), a1.col()), (0, 0));
        let h12: Well = "H12".parse().unwrap();
        assert_eq!((h12.row(), h12.col()), (7, 11));
        assert_eq!(h12.to_string(), "H12");
        assert_eq!(
            "A01".parse::<Well>().unwrap_err().to_string(),
            "'A01' is not a well between A1 and H12"
        );
    }

    #[test]
    fn rejects_labels_off_the_grid() {
        for bad in ["", "A", "I1", "A0", "A13", "A01", "a1", "1A", "B 3", "C-1"] {
            assert!(bad.parse::<Well>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn all_wells_is_plate_order() {
        let wells = all_wells();
        assert_eq!(wells.len(), PLATE_SIZE);
        assert_eq!(wells[0].to_string(), "A1");
        assert_eq!(wells[11].to_string(), "A12");
        assert_eq!(wells[12].to_string(), "B1");
        assert_eq!(wells[95].to_string(), "H12");
        assert!(wells.windows(2).all(|w| w[0] < w[1]));
        for (i, w) in wells.iter().enumerate() {
            assert_eq!(w.row() * NUM_COLS + w.col(), i);
            assert_eq!(w.to_string().parse::<Well>().unwrap(), *w);
        }
    }
}
