use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::plate::Well;

// ---------------------------------------------------------------------------
// MetadataValue – a single cell of the input sheet
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring what a spreadsheet column can hold.
/// Using `BTreeMap` / `BTreeSet` downstream so `MetadataValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date string kept as text for simplicity.
    Date(String),
    Null,
}

// -- Manual Eq/Ord so we can put MetadataValue in BTreeSet --

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use MetadataValue::*;
        fn discriminant(v: &MetadataValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for MetadataValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            MetadataValue::String(s) | MetadataValue::Date(s) => s.hash(state),
            MetadataValue::Integer(i) => i.hash(state),
            MetadataValue::Float(f) => f.to_bits().hash(state),
            MetadataValue::Bool(b) => b.hash(state),
            MetadataValue::Null => {}
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Date(d) => write!(f, "{d}"),
            MetadataValue::Null => Ok(()),
        }
    }
}

impl MetadataValue {
    /// Try to interpret the value as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }

    /// The cell as an identifier or well label; `None` for nulls.
    pub fn as_label(&self) -> Option<String> {
        match self {
            MetadataValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Render for a delimited output file: floats at 3 decimals, nulls empty.
    pub fn to_cell(&self) -> String {
        match self {
            MetadataValue::Float(v) => format_volume(Some(*v)),
            other => other.to_string(),
        }
    }
}

/// Fixed 3-decimal rendering used by every table this tool writes.
pub fn format_volume(v: Option<f64>) -> String {
    match v {
        Some(v) if v.is_nan() => String::new(),
        Some(v) => format!("{v:.3}"),
        None => String::new(),
    }
}

static NULL: MetadataValue = MetadataValue::Null;

/// Columns read as text whatever they look like, so identifiers such as
/// `007` survive loading unchanged.
pub const IDENTIFIER_COLUMNS: [&str; 5] =
    ["library_id", "sample_id", "source_well", "plate_well", "bc_read"];

/// One input row: column_name → value.
pub type Record = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// RawTable – the sheet exactly as loaded
// ---------------------------------------------------------------------------

/// A loaded sheet before any schema is applied.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names in file order.
    pub column_names: Vec<String>,
    pub rows: Vec<Record>,
}

impl RawTable {
    pub fn new(column_names: Vec<String>, rows: Vec<Record>) -> Self {
        RawTable { column_names, rows }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the sheet has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell of a given row, `Null` when the column is absent.
    pub fn value<'a>(&'a self, row: usize, column: &str) -> &'a MetadataValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Plate layouts and the typed sample rows built from them
// ---------------------------------------------------------------------------

/// Which normalization scheme a sheet follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One source plate, exactly 96 rows.
    SinglePlate,
    /// Two dilutions of the same samples, up to 96 rows.
    TwoPlate,
}

impl Layout {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Layout::SinglePlate => &["library_id", "sample_id", "source_well", "conc_ug_ml"],
            Layout::TwoPlate => &[
                "library_id",
                "source_well",
                "conc_plate_1_ug_ml",
                "conc_plate_2_ug_ml",
            ],
        }
    }

    pub fn concentration_columns(&self) -> &'static [&'static str] {
        match self {
            Layout::SinglePlate => &["conc_ug_ml"],
            Layout::TwoPlate => &["conc_plate_1_ug_ml", "conc_plate_2_ug_ml"],
        }
    }

    /// Name of the classification column in written tables.
    pub fn flag_column(&self) -> &'static str {
        match self {
            Layout::SinglePlate => "norm_flag",
            Layout::TwoPlate => "flag",
        }
    }
}

/// Measured concentrations (µg/mL) of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Concentrations {
    Single(Option<f64>),
    Pair(Option<f64>, Option<f64>),
}

/// A validated input row.
#[derive(Debug, Clone)]
pub struct SampleRow {
    pub library_id: Option<String>,
    pub source_well: Well,
    pub concentrations: Concentrations,
    /// Every input cell of the row, including the typed ones above.
    pub metadata: Record,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Outcome of normalizing one well.  Exactly one applies per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormFlag {
    Valid,
    Empty,
    TooDilute,
    TooConcentrated,
    Invalid,
    Weird,
}

impl NormFlag {
    pub const ALL: [NormFlag; 6] = [
        NormFlag::Valid,
        NormFlag::Empty,
        NormFlag::TooDilute,
        NormFlag::TooConcentrated,
        NormFlag::Invalid,
        NormFlag::Weird,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NormFlag::Valid => "valid",
            NormFlag::Empty => "empty",
            NormFlag::TooDilute => "too_dilute",
            NormFlag::TooConcentrated => "too_concentrated",
            NormFlag::Invalid => "invalid",
            NormFlag::Weird => "weird",
        }
    }

    pub fn is_valid(&self) -> bool {
        *self == NormFlag::Valid
    }
}

impl fmt::Display for NormFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plate a two-plate transfer draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourcePlate {
    #[serde(rename = "plate_1")]
    Plate1,
    #[serde(rename = "plate_2")]
    Plate2,
}

impl SourcePlate {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePlate::Plate1 => "plate_1",
            SourcePlate::Plate2 => "plate_2",
        }
    }
}

impl fmt::Display for SourcePlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed transfer volumes (µL).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transfer {
    Single {
        volume_ul: Option<f64>,
    },
    TwoPlate {
        plate_1_ul: Option<f64>,
        plate_2_ul: Option<f64>,
        source: Option<SourcePlate>,
    },
}

impl Transfer {
    /// Volume that will actually be pipetted, if any plate provides one.
    pub fn volume_ul(&self) -> Option<f64> {
        match *self {
            Transfer::Single { volume_ul } => volume_ul,
            Transfer::TwoPlate {
                plate_1_ul,
                plate_2_ul,
                source,
            } => match source {
                Some(SourcePlate::Plate1) => plate_1_ul,
                Some(SourcePlate::Plate2) => plate_2_ul,
                None => None,
            },
        }
    }

    pub fn source_plate(&self) -> Option<SourcePlate> {
        match *self {
            Transfer::Single { .. } => None,
            Transfer::TwoPlate { source, .. } => source,
        }
    }
}

/// A sample row after normalization, shuffling and barcode assignment.
#[derive(Debug, Clone)]
pub struct NormalizedRow {
    pub sample: SampleRow,
    pub dest_well: Well,
    pub transfer: Transfer,
    pub flag: NormFlag,
    pub bc_read: Option<String>,
}

impl NormalizedRow {
    pub fn library_id(&self) -> Option<&str> {
        self.sample.library_id.as_deref()
    }
}

/// Sorted set of distinct values a column takes across the rows.
pub fn unique_values<'a>(
    rows: impl IntoIterator<Item = &'a Record>,
    column: &str,
) -> BTreeSet<MetadataValue> {
    rows.into_iter()
        .map(|r| r.get(column).cloned().unwrap_or(MetadataValue::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_labels_are_snake_case() {
        let labels: Vec<&str> = NormFlag::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(
            labels,
            ["valid", "empty", "too_dilute", "too_concentrated", "invalid", "weird"]
        );
        assert_eq!(
            serde_json::to_string(&NormFlag::TooConcentrated).unwrap(),
            "\"too_concentrated\""
        );
    }

    #[test]
    fn cells_render_for_tables() {
        assert_eq!(MetadataValue::Float(12.34567).to_cell(), "12.346");
        assert_eq!(MetadataValue::Integer(7).to_cell(), "7");
        assert_eq!(MetadataValue::Null.to_cell(), "");
        assert_eq!(format_volume(Some(f64::INFINITY)), "inf");
        assert_eq!(format_volume(None), "");
    }

    #[test]
    fn chosen_plate_decides_the_volume() {
        let t = Transfer::TwoPlate {
            plate_1_ul: Some(4.0),
            plate_2_ul: Some(40.0),
            source: Some(SourcePlate::Plate2),
        };
        assert_eq!(t.volume_ul(), Some(40.0));
        let none = Transfer::TwoPlate {
            plate_1_ul: Some(4.0),
            plate_2_ul: None,
            source: None,
        };
        assert_eq!(none.volume_ul(), None);
    }

    #[test]
    fn metadata_ordering_puts_null_first() {
        let mut set = BTreeSet::new();
        set.insert(MetadataValue::String("b".into()));
        set.insert(MetadataValue::Null);
        set.insert(MetadataValue::Integer(3));
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(ordered[0], MetadataValue::Null);
        assert_eq!(ordered[1], MetadataValue::Integer(3));
    }
}
