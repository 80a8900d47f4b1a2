use anyhow::Result;

use crate::data::model::{Layout, NormalizedRow};
use crate::export::{protocol_columns, tsv_string};

const DATA_MARKER: &str = "{data}";

const SINGLE_PLATE_TEMPLATE: &str = include_str!("../templates/single-plate-protocol.py");
const TWO_PLATE_TEMPLATE: &str = include_str!("../templates/two-plate-protocol.py");

/// The OT-2 script a layout's transfers are embedded into.
pub fn template(layout: Layout) -> &'static str {
    match layout {
        Layout::SinglePlate => SINGLE_PLATE_TEMPLATE,
        Layout::TwoPlate => TWO_PLATE_TEMPLATE,
    }
}

/// Robot script with the transfer table pasted in as tab-delimited text.
/// Only the columns the script reads are embedded.
pub fn render(layout: Layout, rows: &[NormalizedRow]) -> Result<String> {
    let table = tsv_string(rows, &protocol_columns(layout))?;
    Ok(template(layout).replacen(DATA_MARKER, &table, 1))
}
