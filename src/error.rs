use std::path::PathBuf;

use thiserror::Error;

/// Everything that stops a run before any output is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlateError {
    #[error("Input file must contain the following columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("There must be {expected} values in the source_well column (found {found})")]
    WrongRowCount { expected: usize, found: usize },

    #[error("This {capacity}-well plate apparently has more than {capacity} rows! (found {found})")]
    TooManyRows { capacity: usize, found: usize },

    #[error("Empty/null source_wells are not allowed")]
    NullSourceWell,

    #[error("Each row must have a unique source_well (duplicated: {0})")]
    DuplicateSourceWell(String),

    #[error("invalid source_well values: {{{}}}", .0.join(", "))]
    InvalidSourceWells(Vec<String>),

    #[error("Empty/null library_ids are not allowed")]
    NullLibraryId,

    #[error("Each row must have a unique library_id (duplicated: {0})")]
    DuplicateLibraryId(String),

    #[error("Column '{column}' row {row}: '{value}' is not a concentration")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("When shuffling wells, input cannot already have barcode associations ({0})")]
    ShuffleWithBarcodes(String),

    #[error("Barcode file must include columns plate_well and bc_read")]
    BarcodeColumns,

    #[error("Barcode file lists plate_well {0} more than once")]
    DuplicateBarcodeWell(String),

    #[error("No barcode for destination well {0}")]
    MissingBarcode(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Output directory {} already exists", .0.display())]
    OutputExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, PlateError>;
