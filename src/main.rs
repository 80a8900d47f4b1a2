mod barcodes;
mod cli;
mod color;
mod config;
mod data;
mod error;
mod export;
mod normalize;
mod pipeline;
mod plate;
mod protocol;
mod report;
mod shuffle;
mod validate;
mod viz;

use clap::Parser;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let invocation = std::env::args().collect::<Vec<_>>().join(" ");
    let cli = Cli::parse();

    log::warn!("Concentrations MUST be in µg/mL!");

    let opts = cli.command.into_options(invocation);
    log::debug!("{opts:?}");
    pipeline::run(&opts)
}
