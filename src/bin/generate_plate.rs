use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::{Parser, ValueEnum};
use parquet::arrow::ArrowWriter;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    /// library_id, sample_id, source_well, conc_ug_ml
    PhipNorm,
    /// library_id, source_well, conc_plate_1_ug_ml, conc_plate_2_ug_ml
    TwoPlate,
}

/// Write a synthetic 96-well input sheet for trying out platenorm
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
struct Args {
    #[arg(value_enum)]
    kind: Kind,
    /// .csv, .tsv or .parquet
    #[arg(short, long, default_value = "sample_plate.csv")]
    out: PathBuf,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Wells left without a sample
    #[arg(long, default_value_t = 6)]
    empty: usize,
}

const PROJECTS: [&str; 3] = ["serum", "csf", "phage-display"];

/// Column-oriented sheet; `None` cells are written as blanks.
struct Sheet {
    text: Vec<(&'static str, Vec<Option<String>>)>,
    numbers: Vec<(&'static str, Vec<Option<f64>>)>,
}

fn wells() -> Vec<String> {
    "ABCDEFGH"
        .chars()
        .flat_map(|r| (1..=12).map(move |c| format!("{r}{c}")))
        .collect()
}

/// Log-uniform concentration, so a plate spans several orders of magnitude.
fn concentration(rng: &mut ChaCha8Rng, lo: f64, hi: f64) -> f64 {
    let x: f64 = rng.random_range(lo.ln()..hi.ln());
    (x.exp() * 1000.0).round() / 1000.0
}

fn build(kind: Kind, rng: &mut ChaCha8Rng, empty: usize) -> Sheet {
    let wells = wells();
    let filled = wells.len().saturating_sub(empty);

    let mut library_id = Vec::new();
    let mut sample_id = Vec::new();
    let mut project = Vec::new();
    let mut conc_1 = Vec::new();
    let mut conc_2 = Vec::new();
    for i in 0..wells.len() {
        if i >= filled {
            // two-plate sheets simply list fewer wells
            if matches!(kind, Kind::TwoPlate) {
                break;
            }
            library_id.push(None);
            sample_id.push(None);
            project.push(None);
            conc_1.push(None);
            conc_2.push(None);
            continue;
        }
        library_id.push(Some(format!("LIB{:04}", 1000 + i)));
        sample_id.push(Some(format!("donor-{:02}", rng.random_range(1..=40))));
        project.push(Some(PROJECTS[rng.random_range(0..PROJECTS.len())].to_string()));
        match kind {
            Kind::PhipNorm => conc_1.push(Some(concentration(rng, 5.0, 2000.0))),
            Kind::TwoPlate => {
                let c1 = concentration(rng, 20.0, 5000.0);
                let dilution: f64 = rng.random_range(8.0..12.0);
                conc_1.push(Some(c1));
                // a plate-2 reading occasionally goes missing
                let c2 = (c1 / dilution * 1000.0).round() / 1000.0;
                conc_2.push(if rng.random_bool(0.05) { None } else { Some(c2) });
            }
        }
    }

    let source_well = wells.into_iter().take(library_id.len()).map(Some).collect();
    match kind {
        Kind::PhipNorm => Sheet {
            text: vec![
                ("library_id", library_id),
                ("sample_id", sample_id),
                ("source_well", source_well),
                ("project", project),
            ],
            numbers: vec![("conc_ug_ml", conc_1)],
        },
        Kind::TwoPlate => Sheet {
            text: vec![
                ("library_id", library_id),
                ("sample_id", sample_id),
                ("source_well", source_well),
                ("project", project),
            ],
            numbers: vec![("conc_plate_1_ug_ml", conc_1), ("conc_plate_2_ug_ml", conc_2)],
        },
    }
}

fn write_delimited(sheet: &Sheet, path: &Path, delimiter: u8) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let header = sheet
        .text
        .iter()
        .map(|(name, _)| *name)
        .chain(sheet.numbers.iter().map(|(name, _)| *name));
    out.write_record(header)?;

    let rows = sheet.text.first().map_or(0, |(_, col)| col.len());
    for i in 0..rows {
        let record = sheet
            .text
            .iter()
            .map(|(_, col)| col[i].clone().unwrap_or_default())
            .chain(
                sheet
                    .numbers
                    .iter()
                    .map(|(_, col)| col[i].map(|v| v.to_string()).unwrap_or_default()),
            );
        out.write_record(record)?;
    }
    out.flush()?;
    Ok(())
}

fn write_parquet(sheet: &Sheet, path: &Path) -> Result<()> {
    let mut fields = Vec::new();
    let mut columns: Vec<ArrayRef> = Vec::new();
    for (name, values) in &sheet.text {
        fields.push(Field::new(*name, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(values.clone())));
    }
    for (name, values) in &sheet.numbers {
        fields.push(Field::new(*name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values.clone())));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let sheet = build(args.kind, &mut rng, args.empty);

    let ext = args
        .out
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext.as_deref() {
        Some("csv") => write_delimited(&sheet, &args.out, b',')?,
        Some("tsv") => write_delimited(&sheet, &args.out, b'\t')?,
        Some("parquet") => write_parquet(&sheet, &args.out)?,
        _ => bail!("output must end in .csv, .tsv or .parquet"),
    }

    let rows = sheet.text.first().map_or(0, |(_, col)| col.len());
    println!("Wrote {rows} wells to {}", args.out.display());
    Ok(())
}
