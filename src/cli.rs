use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{NormalizationParams, SampleSheetConfig};
use crate::data::model::Layout;
use crate::pipeline::RunOptions;

#[derive(Parser, Debug)]
#[command(author, version, about = "Normalize library concentrations across a 96-well plate", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Single source plate of exactly 96 libraries
    PhipNorm(RunArgs),
    /// Two dilutions of the same libraries, up to 96 wells
    TwoPlate(RunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// input sheet (.csv, .tsv, .txt, .xlsx, .xls, .ods, .json, .parquet)
    #[arg(short, long)]
    pub input: PathBuf,
    /// output directory; must not exist yet
    #[arg(short, long = "output-dir")]
    pub output_dir: PathBuf,
    /// barcode table with plate_well and bc_read columns
    #[arg(short, long)]
    pub barcodes: Option<PathBuf>,
    /// mass to transfer into each well (µg)
    #[arg(short = 't', long = "transfer-mass")]
    pub transfer_mass: Option<f64>,
    /// smallest volume to pipette (µL)
    #[arg(short = 'm', long = "min-volume")]
    pub min_volume: Option<f64>,
    /// largest volume to pipette (µL)
    #[arg(short = 'M', long = "max-volume")]
    pub max_volume: Option<f64>,
    /// deterministically shuffle destination wells
    #[arg(long)]
    pub shuffle_wells: bool,
    #[arg(long, default_value = "Laserson Lab")]
    pub investigator: String,
    #[arg(long, default_value_t = 75)]
    pub read_length: u32,
}

impl RunArgs {
    /// Flags left unset fall back to the layout's defaults.
    pub fn params(&self, layout: Layout) -> NormalizationParams {
        let defaults = NormalizationParams::defaults_for(layout);
        NormalizationParams {
            transfer_mass_ug: self.transfer_mass.unwrap_or(defaults.transfer_mass_ug),
            min_volume_ul: self.min_volume.unwrap_or(defaults.min_volume_ul),
            max_volume_ul: self.max_volume.unwrap_or(defaults.max_volume_ul),
        }
    }

    pub fn into_options(self, layout: Layout, invocation: String) -> RunOptions {
        RunOptions {
            params: self.params(layout),
            layout,
            input: self.input,
            output_dir: self.output_dir,
            barcodes: self.barcodes,
            shuffle_wells: self.shuffle_wells,
            sample_sheet: SampleSheetConfig {
                investigator: self.investigator,
                read_length: self.read_length,
            },
            invocation,
        }
    }
}

impl Commands {
    pub fn into_options(self, invocation: String) -> RunOptions {
        match self {
            Commands::PhipNorm(args) => args.into_options(Layout::SinglePlate, invocation),
            Commands::TwoPlate(args) => args.into_options(Layout::TwoPlate, invocation),
        }
    }
}
