use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::data::loader::load_file;
use crate::data::model::{NormalizedRow, RawTable};
use crate::error::PlateError;

/// `plate_well` → `bc_read`, one entry per barcode well.
#[derive(Debug, Clone, Default)]
pub struct BarcodeMap {
    reads: BTreeMap<String, Option<String>>,
}

impl BarcodeMap {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = load_file(path)?;
        Ok(Self::from_table(&raw)?)
    }

    /// Rows without a `plate_well` are ignored; a well listed twice is an
    /// error.
    pub fn from_table(raw: &RawTable) -> Result<Self, PlateError> {
        if !(raw.has_column("plate_well") && raw.has_column("bc_read")) {
            return Err(PlateError::BarcodeColumns);
        }
        let mut reads = BTreeMap::new();
        for i in 0..raw.len() {
            let Some(well) = raw.value(i, "plate_well").as_label() else {
                continue;
            };
            let read = raw.value(i, "bc_read").as_label();
            if reads.insert(well.clone(), read).is_some() {
                return Err(PlateError::DuplicateBarcodeWell(well));
            }
        }
        Ok(BarcodeMap { reads })
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Inner join on destination well.  Every row must find a barcode.
    pub fn attach(&self, rows: &mut [NormalizedRow]) -> Result<(), PlateError> {
        for row in rows.iter_mut() {
            let well = row.dest_well.to_string();
            match self.reads.get(&well) {
                Some(Some(read)) => row.bc_read = Some(read.clone()),
                _ => return Err(PlateError::MissingBarcode(well)),
            }
        }
        log::debug!("attached barcodes to {} rows", rows.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Layout, MetadataValue, NormFlag, Record, Transfer};
    use crate::plate::all_wells;
    use crate::validate::tests::two_plate_sheet;
    use crate::validate::validate;

    fn barcode_sheet(wells: usize) -> RawTable {
        let rows = all_wells()
            .iter()
            .take(wells)
            .enumerate()
            .map(|(i, w)| {
                let mut r = Record::new();
                r.insert("plate_well".into(), MetadataValue::String(w.to_string()));
                r.insert("bc_read".into(), MetadataValue::String(format!("ACGT{i:03}")));
                r
            })
            .collect();
        RawTable::new(vec!["plate_well".into(), "bc_read".into()], rows)
    }

    fn normalized(n: usize) -> Vec<NormalizedRow> {
        validate(&two_plate_sheet(n), Layout::TwoPlate)
            .unwrap()
            .into_iter()
            .map(|sample| NormalizedRow {
                dest_well: sample.source_well,
                sample,
                transfer: Transfer::Single { volume_ul: None },
                flag: NormFlag::Empty,
                bc_read: None,
            })
            .collect()
    }

    #[test]
    fn joins_on_destination_well() {
        let map = BarcodeMap::from_table(&barcode_sheet(96)).unwrap();
        let mut rows = normalized(10);
        map.attach(&mut rows).unwrap();
        assert_eq!(rows[0].bc_read.as_deref(), Some("ACGT000"));
        assert_eq!(rows[9].bc_read.as_deref(), Some("ACGT009"));
    }

    #[test]
    fn missing_barcode_fails() {
        let map = BarcodeMap::from_table(&barcode_sheet(5)).unwrap();
        let mut rows = normalized(10);
        assert_eq!(
            map.attach(&mut rows).unwrap_err(),
            PlateError::MissingBarcode("A6".into())
        );
    }

    #[test]
    fn duplicate_barcode_well_fails() {
        let mut sheet = barcode_sheet(4);
        sheet.rows[3].insert("plate_well".into(), MetadataValue::String("A1".into()));
        assert_eq!(
            BarcodeMap::from_table(&sheet).unwrap_err(),
            PlateError::DuplicateBarcodeWell("A1".into())
        );
    }

    #[test]
    fn requires_both_columns() {
        let mut sheet = barcode_sheet(4);
        sheet.column_names.retain(|c| c != "bc_read");
        assert_eq!(
            BarcodeMap::from_table(&sheet).unwrap_err(),
            PlateError::BarcodeColumns
        );
    }

    #[test]
    fn wells_without_plate_well_are_skipped() {
        let mut sheet = barcode_sheet(2);
        for row in &mut sheet.rows {
            row.insert("plate_well".into(), MetadataValue::Null);
        }
        let map = BarcodeMap::from_table(&sheet).unwrap();
        assert!(map.is_empty());
        assert_eq!(
            map.attach(&mut normalized(1)).unwrap_err(),
            PlateError::MissingBarcode("A1".into())
        );
    }
}
