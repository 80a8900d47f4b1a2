use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use calamine::{Data, Reader, open_workbook_auto};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{IDENTIFIER_COLUMNS, MetadataValue, RawTable, Record};

/// Cell texts read as missing values, following what spreadsheet exports
/// typically write for blanks.
const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "#N/A", "NaN", "nan", "null", "NULL", "None", "none",
];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sample sheet from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`                  – comma-separated, header row
/// * `.tsv` / `.txt`         – tab-separated, header row
/// * `.xls` / `.xlsx` / `.xlsm` / `.ods` – first worksheet, header row
/// * `.json`                 – `[{ "source_well": "A1", ... }, ...]`
/// * `.parquet`              – flat columns of strings / numbers / bools
pub fn load_file(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_delimited(path, b','),
        "tsv" | "txt" => load_delimited(path, b'\t'),
        "xls" | "xlsx" | "xlsm" | "ods" => load_spreadsheet(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Input must be .tsv, .csv, .xls, or .xlsx (also .json, .parquet); got .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    if table.is_empty() {
        log::warn!("{} has a header but no data rows", path.display());
    }
    log::debug!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.column_names.len(),
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV / TSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one sample per line.  Short lines are
/// padded with nulls.
fn load_delimited(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .context("opening delimited file")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("row {row_no}"))?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let mut row = Record::new();
        for (col_idx, col_name) in headers.iter().enumerate() {
            let value = record.get(col_idx).unwrap_or("");
            row.insert(col_name.clone(), read_cell(col_name, value));
        }
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

/// Identifier columns keep their text as written (`007` stays `007`);
/// every other column is type-guessed.
pub(crate) fn read_cell(column: &str, s: &str) -> MetadataValue {
    if !IDENTIFIER_COLUMNS.contains(&column) {
        return guess_metadata_type(s);
    }
    let s = s.trim();
    if NULL_TOKENS.contains(&s) {
        MetadataValue::Null
    } else {
        MetadataValue::String(s.to_string())
    }
}

/// `f64` parsing accepts `nan` in any case and sign, so NaN is a null too.
pub(crate) fn guess_metadata_type(s: &str) -> MetadataValue {
    let s = s.trim();
    if NULL_TOKENS.contains(&s) {
        return MetadataValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return MetadataValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return float_cell(f);
    }
    match s {
        "true" | "True" | "TRUE" => return MetadataValue::Bool(true),
        "false" | "False" | "FALSE" => return MetadataValue::Bool(false),
        _ => {}
    }
    MetadataValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// First worksheet only; its first non-empty row holds the column names.
fn load_spreadsheet(path: &Path) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).context("opening workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheets")?
        .context("reading first worksheet")?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .context("worksheet is empty")?
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for cells in sheet_rows {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let mut row = Record::new();
        for (col_idx, col_name) in headers.iter().enumerate() {
            let value = cells
                .get(col_idx)
                .map(|c| cell_to_metadata(col_name, c))
                .unwrap_or(MetadataValue::Null);
            row.insert(col_name.clone(), value);
        }
        rows.push(row);
    }

    Ok(RawTable::new(headers, rows))
}

fn float_cell(f: f64) -> MetadataValue {
    if f.is_nan() {
        MetadataValue::Null
    } else {
        MetadataValue::Float(f)
    }
}

fn cell_to_metadata(column: &str, cell: &Data) -> MetadataValue {
    match cell {
        Data::Empty | Data::Error(_) => MetadataValue::Null,
        Data::Int(i) => MetadataValue::Integer(*i),
        Data::Float(f) => float_cell(*f),
        Data::Bool(b) => MetadataValue::Bool(*b),
        Data::String(s) => read_cell(column, s),
        other => MetadataValue::Date(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "library_id": "L01", "source_well": "A1", "conc_ug_ml": 20.5 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<RawTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut row = BTreeMap::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            row.insert(key.clone(), json_to_metadata(key, val));
        }
        rows.push(row);
    }

    Ok(RawTable::new(column_names, rows))
}

fn json_to_metadata(key: &str, val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => read_cell(key, s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                MetadataValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                MetadataValue::Float(f)
            } else {
                MetadataValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one sample per row.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).  Nested columns are stringified.
fn load_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut record = Record::new();
            for (col_idx, col_name) in column_names.iter().enumerate() {
                let value = extract_metadata_value(col_name, batch.column(col_idx), row);
                record.insert(col_name.clone(), value);
            }
            rows.push(record);
        }
    }

    Ok(RawTable::new(column_names, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_metadata_value(column: &str, col: &Arc<dyn Array>, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => read_cell(column, col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => read_cell(column, col.as_string::<i64>().value(row)),
        DataType::Int32 => MetadataValue::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => MetadataValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => MetadataValue::Bool(col.as_boolean().value(row)),
        other => MetadataValue::String(format!("{other:?}")),
    }
}
