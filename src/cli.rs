//! Command-line interface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::config::ConvertConfig;
use crate::convert::convert_with_config;

#[derive(Parser, Debug)]
#[command(name = "qsm-bids")]
#[command(about = "Convert BIDS multi-echo GRE data into SEPIA QSM inputs", version)]
pub struct Cli {
    /// Directory holding *part-mag* / *part-phase* NIfTI files and *part-mag* JSON sidecars
    pub input_dir: PathBuf,

    /// Output path plus filename stem, e.g. out/sub-01_
    pub output_prefix: PathBuf,

    /// Path to YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match &cli.config {
        Some(path) => {
            let cfg = ConvertConfig::from_yaml(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            info!("Loaded config from: {}", path.display());
            cfg
        }
        None => ConvertConfig::default(),
    };

    let manifest = convert_with_config(&cli.input_dir, &cli.output_prefix, &config)
        .with_context(|| format!("converting {}", cli.input_dir.display()))?;

    for (v, entry) in manifest.entries().iter().enumerate() {
        println!(
            "volume {}: phase={} magnitude={} header={}",
            v + 1,
            entry.phase.display(),
            entry.magnitude.display(),
            entry.header.display()
        );
    }
    Ok(())
}
