use std::collections::{BTreeSet, HashSet};

use crate::data::model::{Concentrations, Layout, MetadataValue, RawTable, SampleRow};
use crate::error::{PlateError, Result};
use crate::plate::{PLATE_SIZE, Well};

/// Check a loaded sheet against the layout's schema and turn it into typed
/// rows.  The first violation aborts.
///
/// Single-plate sheets must describe the full plate (96 rows); two-plate
/// sheets may leave wells out but every row needs a library_id.
pub fn validate(raw: &RawTable, layout: Layout) -> Result<Vec<SampleRow>> {
    let missing: Vec<String> = layout
        .required_columns()
        .iter()
        .filter(|c| !raw.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PlateError::MissingColumns(
            layout.required_columns().iter().map(|c| c.to_string()).collect(),
        ));
    }

    match layout {
        Layout::SinglePlate if raw.len() != PLATE_SIZE => {
            return Err(PlateError::WrongRowCount {
                expected: PLATE_SIZE,
                found: raw.len(),
            });
        }
        Layout::TwoPlate if raw.len() > PLATE_SIZE => {
            return Err(PlateError::TooManyRows {
                capacity: PLATE_SIZE,
                found: raw.len(),
            });
        }
        _ => {}
    }

    let wells = source_wells(raw)?;
    let library_ids = library_ids(raw, layout)?;

    let mut rows = Vec::with_capacity(raw.len());
    for (idx, ((record, source_well), library_id)) in raw
        .rows
        .iter()
        .zip(wells)
        .zip(library_ids)
        .enumerate()
    {
        let concentrations = match layout.concentration_columns() {
            [single] => Concentrations::Single(concentration(raw, idx, single)?),
            [first, second] => Concentrations::Pair(
                concentration(raw, idx, first)?,
                concentration(raw, idx, second)?,
            ),
            _ => unreachable!("layouts have one or two concentration columns"),
        };
        rows.push(SampleRow {
            library_id,
            source_well,
            concentrations,
            metadata: record.clone(),
        });
    }
    Ok(rows)
}

fn source_wells(raw: &RawTable) -> Result<Vec<Well>> {
    let labels: Vec<String> = (0..raw.len())
        .map(|i| raw.value(i, "source_well").as_label())
        .collect::<Option<_>>()
        .ok_or(PlateError::NullSourceWell)?;

    let mut seen = HashSet::new();
    if let Some(dup) = labels.iter().find(|l| !seen.insert(l.as_str())) {
        return Err(PlateError::DuplicateSourceWell(dup.clone()));
    }

    let invalid: BTreeSet<&String> = labels
        .iter()
        .filter(|l| l.parse::<Well>().is_err())
        .collect();
    if !invalid.is_empty() {
        return Err(PlateError::InvalidSourceWells(
            invalid.into_iter().cloned().collect(),
        ));
    }

    labels
        .iter()
        .map(|l| l.parse::<Well>().map_err(|e| PlateError::InvalidSourceWells(vec![e.0])))
        .collect()
}

fn library_ids(raw: &RawTable, layout: Layout) -> Result<Vec<Option<String>>> {
    let ids: Vec<Option<String>> = (0..raw.len())
        .map(|i| raw.value(i, "library_id").as_label())
        .collect();

    if layout == Layout::TwoPlate && ids.iter().any(Option::is_none) {
        return Err(PlateError::NullLibraryId);
    }

    let mut seen = HashSet::new();
    if let Some(dup) = ids.iter().flatten().find(|id| !seen.insert(id.as_str())) {
        return Err(PlateError::DuplicateLibraryId(dup.clone()));
    }
    Ok(ids)
}

fn concentration(raw: &RawTable, row: usize, column: &str) -> Result<Option<f64>> {
    match raw.value(row, column) {
        MetadataValue::Null => Ok(None),
        v => v.as_f64().map(Some).ok_or_else(|| PlateError::NonNumeric {
            column: column.to_string(),
            row: row + 1,
            value: v.to_string(),
        }),
    }
}
