use std::fs::{self, DirBuilder, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::barcodes::BarcodeMap;
use crate::config::{NormalizationParams, SampleSheetConfig};
use crate::data::loader::load_file;
use crate::data::model::{Layout, NormalizedRow};
use crate::error::PlateError;
use crate::export::{annotated_columns, sample_sheet, write_tsv};
use crate::normalize::normalize;
use crate::report::Summary;
use crate::shuffle::assign_destinations;
use crate::validate::validate;
use crate::{protocol, viz};

// ---------------------------------------------------------------------------
// Run options and artifact names
// ---------------------------------------------------------------------------

/// Everything a run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub layout: Layout,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub barcodes: Option<PathBuf>,
    pub params: NormalizationParams,
    pub shuffle_wells: bool,
    pub sample_sheet: SampleSheetConfig,
    /// Command line echoed into the summary.
    pub invocation: String,
}

pub const SUMMARY_FILE: &str = "summary.yaml";

/// File names written for a layout, apart from the summary and the
/// sample sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactNames {
    pub table: &'static str,
    pub protocol: &'static str,
    pub viz: &'static str,
}

impl ArtifactNames {
    pub fn for_layout(layout: Layout) -> Self {
        match layout {
            Layout::SinglePlate => ArtifactNames {
                table: "plate-normalization-shuffle.tsv",
                protocol: "execute-normalization-shuffle.py",
                viz: "plate-viz.html",
            },
            Layout::TwoPlate => ArtifactNames {
                table: "plate-normalization.tsv",
                protocol: "execute-normalization.py",
                viz: "source-plate-viz.html",
            },
        }
    }
}

/// Sample sheets are named after the output directory.
pub fn experiment_name(output_dir: &Path) -> String {
    output_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "experiment".to_string())
}

pub fn sample_sheet_file(experiment: &str) -> String {
    format!("{experiment}-sample-sheet.csv")
}

// ---------------------------------------------------------------------------
// Planning (no filesystem writes)
// ---------------------------------------------------------------------------

/// A fully computed run, ready to be written out.
#[derive(Debug, Clone)]
pub struct Plan {
    pub input_columns: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    pub summary: Summary,
    pub with_barcodes: bool,
}

/// Load, validate, classify, place and barcode every row.  Nothing touches
/// the output directory.
pub fn plan(opts: &RunOptions) -> Result<Plan> {
    opts.params.validate()?;

    let raw = load_file(&opts.input)?;
    log::info!(
        "loaded {} rows and {} columns from {}",
        raw.len(),
        raw.column_names.len(),
        opts.input.display()
    );
    let samples = validate(&raw, opts.layout)?;
    let dest_wells = assign_destinations(&samples, &raw.column_names, opts.shuffle_wells)?;

    let mut rows: Vec<NormalizedRow> = samples
        .into_iter()
        .zip(dest_wells)
        .map(|(sample, dest_well)| {
            let (transfer, flag) = normalize(sample.concentrations, &opts.params);
            NormalizedRow {
                sample,
                dest_well,
                transfer,
                flag,
                bc_read: None,
            }
        })
        .collect();

    if let Some(path) = &opts.barcodes {
        let barcodes = BarcodeMap::load(path)
            .with_context(|| format!("reading barcodes from {}", path.display()))?;
        if barcodes.is_empty() {
            log::warn!("{} lists no barcode wells", path.display());
        } else {
            log::info!("loaded {} barcode wells", barcodes.len());
        }
        barcodes.attach(&mut rows)?;
    }

    let summary = match opts.layout {
        Layout::SinglePlate => Summary::single_plate(&rows, &opts.params, &opts.invocation),
        Layout::TwoPlate => Summary::two_plate(&rows, &opts.params, &opts.invocation),
    };

    Ok(Plan {
        input_columns: raw.column_names,
        rows,
        summary,
        with_barcodes: opts.barcodes.is_some(),
    })
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn create_output_dir(dir: &Path) -> Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))
}

fn write_file(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Write every artifact of `plan` into a fresh `opts.output_dir`.
pub fn write_outputs(opts: &RunOptions, plan: &Plan, date: &str) -> Result<()> {
    let dir = &opts.output_dir;
    let names = ArtifactNames::for_layout(opts.layout);
    create_output_dir(dir)?;

    let yaml = plan.summary.to_yaml().context("serializing summary")?;
    write_file(dir, SUMMARY_FILE, &yaml)?;

    let table_path = dir.join(names.table);
    let table = File::create(&table_path)
        .with_context(|| format!("creating {}", table_path.display()))?;
    let columns = annotated_columns(&plan.input_columns, opts.layout, plan.with_barcodes);
    write_tsv(BufWriter::new(table), &plan.rows, &columns)
        .with_context(|| format!("writing {}", table_path.display()))?;

    write_file(dir, names.protocol, &protocol::render(opts.layout, &plan.rows)?)?;

    let experiment = experiment_name(dir);
    let sheet = sample_sheet(&plan.rows, &experiment, date, &opts.sample_sheet)?;
    write_file(dir, &sample_sheet_file(&experiment), &sheet)?;

    let html = match opts.layout {
        Layout::SinglePlate => viz::plate_viz_html(&plan.rows),
        Layout::TwoPlate => viz::source_plate_viz_html(&plan.rows),
    };
    write_file(dir, names.viz, &html)?;

    log::info!("wrote results to {}", dir.display());
    Ok(())
}

/// Full run.  The output directory is refused up front if it exists, and
/// created only once every row has been computed.
pub fn run(opts: &RunOptions) -> Result<()> {
    if opts.output_dir.exists() {
        return Err(PlateError::OutputExists(opts.output_dir.clone()).into());
    }
    let plan = plan(opts)?;
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    write_outputs(opts, &plan, &date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{MetadataValue, RawTable};
    use crate::plate::all_wells;
    use crate::validate::tests::{single_plate_sheet, two_plate_sheet};

    fn write_csv(path: &Path, table: &RawTable) {
        let mut out = csv::Writer::from_path(path).unwrap();
        out.write_record(&table.column_names).unwrap();
        for row in &table.rows {
            out.write_record(
                table
                    .column_names
                    .iter()
                    .map(|c| row.get(c).map(MetadataValue::to_cell).unwrap_or_default()),
            )
            .unwrap();
        }
        out.flush().unwrap();
    }

    fn write_barcodes(path: &Path, wells: usize) {
        let mut out = csv::Writer::from_path(path).unwrap();
        out.write_record(["plate_well", "bc_read"]).unwrap();
        for (i, well) in all_wells().iter().take(wells).enumerate() {
            out.write_record([well.to_string(), format!("ACGTAC{i:02}")]).unwrap();
        }
        out.flush().unwrap();
    }

    fn options(layout: Layout, input: &Path, output_dir: &Path) -> RunOptions {
        RunOptions {
            layout,
            input: input.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            barcodes: None,
            params: NormalizationParams::defaults_for(layout),
            shuffle_wells: false,
            sample_sheet: SampleSheetConfig::default(),
            invocation: "platenorm test".into(),
        }
    }

    #[test]
    fn single_plate_run_writes_every_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plate.csv");
        write_csv(&input, &single_plate_sheet(96));
        let out = tmp.path().join("run-7");

        run(&options(Layout::SinglePlate, &input, &out)).unwrap();

        for name in [
            "summary.yaml",
            "plate-normalization-shuffle.tsv",
            "execute-normalization-shuffle.py",
            "run-7-sample-sheet.csv",
            "plate-viz.html",
        ] {
            assert!(out.join(name).is_file(), "missing {name}");
        }
        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("num_valid: 96"));
        assert!(summary.contains("median_valid_transfer_vol_ul: 100.0"));

        let tsv = fs::read_to_string(out.join("plate-normalization-shuffle.tsv")).unwrap();
        let mut lines = tsv.lines();
        assert_eq!(
            lines.next(),
            Some("library_id\tsample_id\tsource_well\tconc_ug_ml\ttransfer_vol_ul\tnorm_flag\tdest_well")
        );
        assert_eq!(lines.next(), Some("L00\tS00\tA1\t20.000\t100.000\tvalid\tA1"));

        let sheet = fs::read_to_string(out.join("run-7-sample-sheet.csv")).unwrap();
        assert!(sheet.contains("Experiment Name,run-7\n"));
        assert!(sheet.contains("\nL95,\n"));
    }

    #[test]
    fn nan_reading_and_zero_padded_ids_survive_a_run() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plate.csv");
        let mut sheet = single_plate_sheet(96);
        sheet.rows[0].insert("library_id".into(), MetadataValue::String("007".into()));
        sheet.rows[0].insert("conc_ug_ml".into(), MetadataValue::String("NAN".into()));
        sheet.rows[1].insert("library_id".into(), MetadataValue::String("7".into()));
        write_csv(&input, &sheet);
        let out = tmp.path().join("padded");

        run(&options(Layout::SinglePlate, &input, &out)).unwrap();

        let summary = fs::read_to_string(out.join(SUMMARY_FILE)).unwrap();
        assert!(summary.contains("num_valid: 95"));
        assert!(summary.contains("num_empty: 1"));

        let tsv = fs::read_to_string(out.join("plate-normalization-shuffle.tsv")).unwrap();
        assert_eq!(tsv.lines().nth(1), Some("007\tS00\tA1\t\t\tempty\tA1"));
        assert_eq!(tsv.lines().nth(2), Some("7\tS01\tA2\t20.000\t100.000\tvalid\tA2"));

        let protocol = fs::read_to_string(out.join("execute-normalization-shuffle.py")).unwrap();
        assert!(protocol.contains("empty\tA1\tA1\t\n"));

        let sheet = fs::read_to_string(out.join("padded-sample-sheet.csv")).unwrap();
        assert!(sheet.contains("\n007,\n"));
        assert!(sheet.contains("\n7,\n"));
    }

    #[test]
    fn two_plate_run_joins_barcodes() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plates.csv");
        let barcodes = tmp.path().join("barcodes.csv");
        write_csv(&input, &two_plate_sheet(24));
        write_barcodes(&barcodes, 96);
        let out = tmp.path().join("two");
        let mut opts = options(Layout::TwoPlate, &input, &out);
        opts.barcodes = Some(barcodes);

        run(&opts).unwrap();

        let tsv = fs::read_to_string(out.join("plate-normalization.tsv")).unwrap();
        let header = tsv.lines().next().unwrap();
        assert!(header.ends_with(
            "dest_well\ttransfer_vol_plate_1_ul\ttransfer_vol_plate_2_ul\tsource_plate\tflag\tplate_well\tbc_read"
        ));
        assert!(tsv.contains("\tA1\t4.000\t40.000\tplate_1\tvalid\tA1\tACGTAC00\n"));

        let sheet = fs::read_to_string(out.join("two-sample-sheet.csv")).unwrap();
        assert!(sheet.contains("\nL03,ACGTAC03\n"));
        assert!(out.join("source-plate-viz.html").is_file());
        let script = fs::read_to_string(out.join("execute-normalization.py")).unwrap();
        assert!(script.contains("valid\tplate_1\tA1\tA1\t4.000\t40.000"));
    }

    #[test]
    fn failed_validation_leaves_no_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("short.csv");
        write_csv(&input, &single_plate_sheet(95));
        let out = tmp.path().join("never");

        let err = run(&options(Layout::SinglePlate, &input, &out)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlateError>(),
            Some(&PlateError::WrongRowCount { expected: 96, found: 95 })
        );
        assert!(!out.exists());
    }

    #[test]
    fn missing_barcode_leaves_no_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plates.csv");
        let barcodes = tmp.path().join("barcodes.csv");
        write_csv(&input, &two_plate_sheet(24));
        write_barcodes(&barcodes, 12);
        let out = tmp.path().join("never");
        let mut opts = options(Layout::TwoPlate, &input, &out);
        opts.barcodes = Some(barcodes);

        let err = run(&opts).unwrap_err();
        assert_eq!(
            err.downcast_ref::<PlateError>(),
            Some(&PlateError::MissingBarcode("B1".into()))
        );
        assert!(!out.exists());
    }

    #[test]
    fn existing_output_directory_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("plate.csv");
        write_csv(&input, &single_plate_sheet(96));

        let err = run(&options(Layout::SinglePlate, &input, tmp.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlateError>(),
            Some(PlateError::OutputExists(_))
        ));
    }

    #[test]
    fn shuffle_ignores_input_row_order() {
        let tmp = tempfile::tempdir().unwrap();
        let sheet = single_plate_sheet(96);
        let mut reversed = sheet.clone();
        reversed.rows.reverse();

        let forward_in = tmp.path().join("forward.csv");
        let reversed_in = tmp.path().join("reversed.csv");
        write_csv(&forward_in, &sheet);
        write_csv(&reversed_in, &reversed);

        let mut tables = Vec::new();
        for (input, out) in [(&forward_in, "a"), (&reversed_in, "b")] {
            let mut opts = options(Layout::SinglePlate, input, &tmp.path().join(out));
            opts.shuffle_wells = true;
            run(&opts).unwrap();
            let tsv = fs::read_to_string(tmp.path().join(out).join("plate-normalization-shuffle.tsv"))
                .unwrap();
            let mut lines: Vec<String> = tsv.lines().map(str::to_string).collect();
            lines.sort();
            tables.push(lines);
        }
        assert_eq!(tables[0], tables[1]);
        let moved = tables[0]
            .iter()
            .filter(|l| l.starts_with('L'))
            .map(|l| l.split('\t').collect::<Vec<_>>())
            .filter(|f| f[2] != f[6])
            .count();
        assert!(moved > 0);
    }
}
