/// Data layer: core types and loading.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .xlsx / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ RawTable  │  column names + Vec<Record>
///   └──────────┘
///        │  validate
///        ▼
///   ┌───────────┐
///   │ SampleRow  │  typed wells / concentrations
///   └───────────┘
///        │  normalize, shuffle, barcodes
///        ▼
///   ┌──────────────┐
///   │ NormalizedRow │  dest well, volumes, flag, barcode
///   └──────────────┘
/// ```

pub mod loader;
pub mod model;
