use anyhow::{Context, Result};
use clap::Parser;
use meal_pipeline::config::{OutputFormat, PipelineConfig};
use meal_pipeline::generator::PlateCountGenerator;
use meal_pipeline::processor::SchemaNormalizer;
use meal_pipeline::storage::{TableStore, read_table};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Synthesize plate counts for every scheduled meal on the menu.
#[derive(Parser)]
#[command(name = "generate_plate_counts")]
struct Args {
    /// Pipeline config file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Directory holding the menu and residents CSV files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// RNG seed; the same seed and inputs give the same counts
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (defaults to the configured plate counts input)
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    dotenv::dotenv().ok();

    let args = Args::parse();

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.paths.data_dir = data_dir;
    }
    if let Some(seed) = args.seed {
        config.generator.seed = seed;
    }
    config.generator.validate()?;

    let normalizer = SchemaNormalizer;
    let menu_path = config.input_path(&config.inputs.menu);
    let menu = normalizer.normalize_table(
        read_table(&menu_path).with_context(|| format!("Failed to load menu {}", menu_path.display()))?,
        "menu",
    )?;
    let census = read_table(&config.input_path(&config.inputs.residents))
        .context("Failed to load residents")?
        .height();

    info!(
        "🎲 Generating plate counts for {} menu rows (seed {}, census {})",
        menu.height(),
        config.generator.seed,
        census
    );

    let mut plates = PlateCountGenerator::new(config.generator.clone()).generate(&menu, census)?;

    let output = args
        .output
        .unwrap_or_else(|| config.input_path(&config.inputs.plate_counts));
    let format = OutputFormat::from_path(&output).unwrap_or(OutputFormat::Csv);
    let written = TableStore::write_table(&mut plates, &output, format)?;

    info!("✅ Wrote {} plate counts to {}", plates.height(), written.display());
    Ok(())
}
