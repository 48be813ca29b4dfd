//! `bbbp` command-line interface.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use bbbp::data_io::{read_smiles_column, read_smiles_file, read_smiles_lines};
use bbbp::descriptors::{self, fingerprint, DESCRIPTOR_NAMES};
use bbbp::{standardize, ModelContext, PipelineConfig, ResultTable, ScalerState, Standardized};
use clap::{Parser, Subcommand, ValueEnum};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bbbp")]
#[command(version)]
#[command(about = "Blood-brain barrier permeability prediction from SMILES")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict BBB permeability for SMILES read from a file or stdin
    Predict {
        /// TOML configuration naming the model and scaler files
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Newline-separated SMILES; `-` or absent reads stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write CSV here instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for stdout
        #[arg(long, value_enum, default_value = "table")]
        format: Format,
    },

    /// Print the canonical form of each input SMILES
    Canonicalize {
        /// Newline-separated SMILES; `-` or absent reads stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Fit the descriptor scaler on a CSV training set
    FitScaler {
        /// CSV file with a SMILES column
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the SMILES column
        #[arg(long, default_value = "smiles")]
        smiles_col: String,

        /// Where to write the scaler JSON
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show raw descriptors and fingerprint bits for one SMILES
    Features {
        /// The molecule
        #[arg(short, long)]
        smiles: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Table,
    Csv,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bbbp=info")),
        )
        .init();

    match Args::parse().command {
        Command::Predict {
            config,
            input,
            output,
            format,
        } => predict(config, input, output, format),
        Command::Canonicalize { input } => canonicalize(input),
        Command::FitScaler {
            input,
            smiles_col,
            output,
        } => fit_scaler(&input, &smiles_col, &output),
        Command::Features { smiles } => features(&smiles),
    }
}

fn read_inputs(input: Option<PathBuf>) -> Result<Vec<String>> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            read_smiles_file(&path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(read_smiles_lines(&buf))
        }
    }
}

fn predict(
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Format,
) -> Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    }
    .apply_env_overrides();

    let ctx = ModelContext::load(&config);
    let smiles = read_inputs(input)?;
    info!(inputs = smiles.len(), "predicting");
    let table = ResultTable::new(&ctx.predict_batch(&smiles));

    match (output, format) {
        (Some(path), _) => {
            table.save_csv(&path)?;
            info!(path = %path.display(), "wrote results");
        }
        (None, Format::Csv) => table.write_csv(io::stdout().lock())?,
        (None, Format::Table) => print!("{table}"),
    }
    if !ctx.is_available() {
        warn!("no predictions were made; check the model and scaler paths");
    }
    Ok(())
}

fn canonicalize(input: Option<PathBuf>) -> Result<()> {
    for smiles in read_inputs(input)? {
        match standardize(&smiles) {
            Standardized::Canonical(canonical, _) => println!("{canonical}"),
            Standardized::Rejected(reason) => {
                warn!(%smiles, %reason, "rejected");
                println!("-");
            }
        }
    }
    Ok(())
}

fn fit_scaler(input: &Path, smiles_col: &str, output: &Path) -> Result<()> {
    let smiles = read_smiles_column(input, smiles_col)
        .with_context(|| format!("reading {}", input.display()))?;
    let rows: Vec<[f64; descriptors::DESCRIPTOR_COUNT]> = smiles
        .par_iter()
        .filter_map(|s| match standardize(s) {
            Standardized::Canonical(_, mol) => Some(descriptors::extract(Some(&mol)).0),
            Standardized::Rejected(_) => None,
        })
        .collect();
    let skipped = smiles.len() - rows.len();
    if rows.is_empty() {
        bail!("no valid SMILES in {}", input.display());
    }
    if skipped > 0 {
        warn!(skipped, "invalid SMILES left out of the fit");
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    let x = Array2::from_shape_vec((rows.len(), descriptors::DESCRIPTOR_COUNT), flat)?;
    let state = ScalerState::fit(&x)?;
    state.save(output)?;
    info!(rows = rows.len(), path = %output.display(), "scaler written");
    Ok(())
}

fn features(smiles: &str) -> Result<()> {
    let mol = match standardize(smiles) {
        Standardized::Canonical(canonical, mol) => {
            println!("canonical\t{canonical}");
            mol
        }
        Standardized::Rejected(reason) => bail!("invalid SMILES: {reason}"),
    };
    let values = descriptors::extract(Some(&mol));
    for (name, v) in DESCRIPTOR_NAMES.iter().zip(values.as_slice()) {
        println!("{name}\t{v:.4}");
    }
    let fp = fingerprint::encode(Some(&mol));
    let bits: Vec<String> = fp.active_bits().iter().map(usize::to_string).collect();
    println!("bits\t{}\t{}", fp.count_ones(), bits.join(","));
    Ok(())
}
