use std::io;

use anyhow::{Context, Result};

use crate::config::SampleSheetConfig;
use crate::data::model::{Layout, NormalizedRow, format_volume};

// ---------------------------------------------------------------------------
// Annotated table columns
// ---------------------------------------------------------------------------

/// A column of a written table: either carried over from the input sheet
/// or produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputColumn {
    Input(String),
    Computed(&'static str),
}

impl OutputColumn {
    pub fn name(&self) -> &str {
        match self {
            OutputColumn::Input(name) => name,
            OutputColumn::Computed(name) => name,
        }
    }

    pub fn render(&self, row: &NormalizedRow) -> String {
        match self {
            OutputColumn::Input(name) => row
                .sample
                .metadata
                .get(name)
                .map(|v| v.to_cell())
                .unwrap_or_default(),
            OutputColumn::Computed(name) => computed_cell(row, name),
        }
    }
}

fn computed_cell(row: &NormalizedRow, name: &str) -> String {
    use crate::data::model::Transfer;

    match (name, &row.transfer) {
        ("source_well", _) => row.sample.source_well.to_string(),
        ("dest_well" | "plate_well", _) => row.dest_well.to_string(),
        ("norm_flag" | "flag", _) => row.flag.to_string(),
        ("bc_read", _) => row.bc_read.clone().unwrap_or_default(),
        ("transfer_vol_ul", t) => format_volume(t.volume_ul()),
        ("transfer_vol_plate_1_ul", Transfer::TwoPlate { plate_1_ul, .. }) => format_volume(*plate_1_ul),
        ("transfer_vol_plate_2_ul", Transfer::TwoPlate { plate_2_ul, .. }) => format_volume(*plate_2_ul),
        ("source_plate", t) => t.source_plate().map(|p| p.to_string()).unwrap_or_default(),
        _ => String::new(),
    }
}

/// Columns the pipeline appends after the input columns.
pub fn computed_columns(layout: Layout, with_barcodes: bool) -> Vec<&'static str> {
    let mut cols = match layout {
        Layout::SinglePlate => vec!["transfer_vol_ul", layout.flag_column(), "dest_well"],
        Layout::TwoPlate => vec![
            "dest_well",
            "transfer_vol_plate_1_ul",
            "transfer_vol_plate_2_ul",
            "source_plate",
            layout.flag_column(),
        ],
    };
    if with_barcodes {
        cols.extend(["plate_well", "bc_read"]);
    }
    cols
}

/// Every input column in file order, then the computed ones.  An input
/// column sharing a name with a computed column is dropped in its favour.
pub fn annotated_columns(
    input_columns: &[String],
    layout: Layout,
    with_barcodes: bool,
) -> Vec<OutputColumn> {
    let computed = computed_columns(layout, with_barcodes);
    let mut cols: Vec<OutputColumn> = Vec::with_capacity(input_columns.len() + computed.len());
    for name in input_columns {
        if computed.contains(&name.as_str()) {
            log::warn!("input column '{name}' is replaced by the computed column of the same name");
            continue;
        }
        cols.push(OutputColumn::Input(name.clone()));
    }
    cols.extend(computed.into_iter().map(OutputColumn::Computed));
    cols
}

/// Columns embedded into the generated robot protocol.
pub fn protocol_columns(layout: Layout) -> Vec<OutputColumn> {
    let names: &[&'static str] = match layout {
        Layout::SinglePlate => &["source_well", "dest_well", "transfer_vol_ul"],
        Layout::TwoPlate => &[
            "source_plate",
            "source_well",
            "dest_well",
            "transfer_vol_plate_1_ul",
            "transfer_vol_plate_2_ul",
        ],
    };
    std::iter::once(layout.flag_column())
        .chain(names.iter().copied())
        .map(OutputColumn::Computed)
        .collect()
}

/// Write a header line and one line per row, tab-delimited.
pub fn write_tsv<W: io::Write>(writer: W, rows: &[NormalizedRow], columns: &[OutputColumn]) -> Result<()> {
    let mut out = csv::WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    out.write_record(columns.iter().map(OutputColumn::name))
        .context("writing header")?;
    for row in rows {
        out.write_record(columns.iter().map(|c| c.render(row)))
            .with_context(|| format!("writing row for {}", row.sample.source_well))?;
    }
    out.flush().context("flushing table")?;
    Ok(())
}

pub fn tsv_string(rows: &[NormalizedRow], columns: &[OutputColumn]) -> Result<String> {
    let mut buf = Vec::new();
    write_tsv(&mut buf, rows, columns)?;
    String::from_utf8(buf).context("table is not UTF-8")
}

// ---------------------------------------------------------------------------
// Illumina sample sheet
// ---------------------------------------------------------------------------

/// IEM v4 sample sheet: one `[Data]` line per library, index taken from the
/// attached barcode read.
pub fn sample_sheet(
    rows: &[NormalizedRow],
    experiment_name: &str,
    date: &str,
    config: &SampleSheetConfig,
) -> Result<String> {
    let mut sheet = String::new();
    let header: [(&str, &str); 9] = [
        ("IEM4FileVersion", "4"),
        ("Investigator Name", config.investigator.as_str()),
        ("Experiment Name", experiment_name),
        ("Date", date),
        ("Workflow", "GenerateFASTQ"),
        ("Application", "NextSeq FASTQ Only"),
        ("Assay", "TruSeq HT"),
        ("Description", ""),
        ("Chemistry", "Default"),
    ];
    sheet.push_str("[Header]\n");
    sheet.push_str(&csv_lines(header.iter().map(|(k, v)| vec![*k, *v]))?);
    sheet.push_str(&format!(
        "\n[Reads]\n{}\n\n[Settings]\n\n[Data]\n",
        config.read_length
    ));

    let data = rows.iter().filter_map(|r| {
        r.library_id()
            .map(|id| vec![id, r.bc_read.as_deref().unwrap_or("")])
    });
    sheet.push_str(&csv_lines(std::iter::once(vec!["Sample_ID", "index"]).chain(data))?);
    Ok(sheet)
}

fn csv_lines<'a>(records: impl Iterator<Item = Vec<&'a str>>) -> Result<String> {
    let mut buf = Vec::new();
    {
        let mut out = csv::WriterBuilder::new().flexible(true).from_writer(&mut buf);
        for record in records {
            out.write_record(&record).context("writing sample sheet")?;
        }
        out.flush().context("flushing sample sheet")?;
    }
    String::from_utf8(buf).context("sample sheet is not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizationParams;
    use crate::data::model::{Concentrations, MetadataValue, Record, SampleRow};
    use crate::normalize::normalize;

    fn row(well: &str, dest: &str, id: Option<&str>, conc: Option<f64>) -> NormalizedRow {
        let params = NormalizationParams::defaults_for(Layout::SinglePlate);
        let (transfer, flag) = normalize(Concentrations::Single(conc), &params);
        let mut metadata = Record::new();
        metadata.insert("source_well".into(), MetadataValue::String(well.into()));
        metadata.insert(
            "library_id".into(),
            id.map(|s| MetadataValue::String(s.into())).unwrap_or(MetadataValue::Null),
        );
        metadata.insert(
            "conc_ug_ml".into(),
            conc.map(MetadataValue::Float).unwrap_or(MetadataValue::Null),
        );
        metadata.insert("dest_well".into(), MetadataValue::String("stale".into()));
        NormalizedRow {
            sample: SampleRow {
                library_id: id.map(str::to_string),
                source_well: well.parse().unwrap(),
                concentrations: Concentrations::Single(conc),
                metadata,
            },
            dest_well: dest.parse().unwrap(),
            transfer,
            flag,
            bc_read: id.map(|_| "ACGTACGT".to_string()),
        }
    }

    #[test]
    fn annotated_table_appends_computed_columns() {
        let input: Vec<String> = ["library_id", "source_well", "conc_ug_ml", "dest_well"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cols = annotated_columns(&input, Layout::SinglePlate, false);
        let names: Vec<&str> = cols.iter().map(OutputColumn::name).collect();
        assert_eq!(
            names,
            ["library_id", "source_well", "conc_ug_ml", "transfer_vol_ul", "norm_flag", "dest_well"]
        );

        let rows = vec![row("A1", "C7", Some("L1"), Some(30.0)), row("A2", "B1", None, None)];
        let tsv = tsv_string(&rows, &cols).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines[0], "library_id\tsource_well\tconc_ug_ml\ttransfer_vol_ul\tnorm_flag\tdest_well");
        assert_eq!(lines[1], "L1\tA1\t30.000\t66.667\tvalid\tC7");
        assert_eq!(lines[2], "\tA2\t\t\tempty\tB1");
    }

    #[test]
    fn protocol_columns_for_two_plates() {
        let names: Vec<String> = protocol_columns(Layout::TwoPlate)
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names[0], "flag");
        assert!(names.contains(&"transfer_vol_plate_2_ul".to_string()));
    }

    #[test]
    fn protocol_columns_lead_with_the_layout_flag() {
        for layout in [Layout::SinglePlate, Layout::TwoPlate] {
            let cols = protocol_columns(layout);
            assert_eq!(cols[0].name(), layout.flag_column());
            assert!(annotated_columns(&[], layout, false)
                .iter()
                .any(|c| c.name() == layout.flag_column()));
        }
    }

    #[test]
    fn sample_sheet_lists_libraries_only() {
        let rows = vec![row("A1", "A1", Some("L1"), Some(30.0)), row("A2", "A2", None, None)];
        let sheet = sample_sheet(&rows, "run-42", "2024-01-02", &SampleSheetConfig::default()).unwrap();
        assert!(sheet.starts_with("[Header]\nIEM4FileVersion,4\nInvestigator Name,Laserson Lab\n"));
        assert!(sheet.contains("Experiment Name,run-42\n"));
        assert!(sheet.contains("Date,2024-01-02\n"));
        assert!(sheet.contains("[Reads]\n75\n"));
        assert!(sheet.ends_with("[Data]\nSample_ID,index\nL1,ACGTACGT\n"));
    }
}
