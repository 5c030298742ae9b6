use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use meal_pipeline::config::{OutputFormat, PipelineConfig};
use meal_pipeline::dashboard::{ComplianceChecks, DailyView, render_report};
use meal_pipeline::processor::parse_date;
use meal_pipeline::run_pipeline;
use meal_pipeline::storage::read_table;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "meal-pipeline",
    about = "Daily nutrition, cost and waste summaries for a residential meal program"
)]
struct Cli {
    /// Pipeline config file (TOML)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding the input CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the daily summary from the input tables
    Run {
        /// Where to write artifacts (defaults to the data directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// csv, parquet or json
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Also write the per-meal detail table
        #[arg(long)]
        write_detail: bool,
    },
    /// Print KPIs and tables from the daily summary
    Report {
        /// First day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        to: Option<NaiveDate>,
    },
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("not a date: {}", raw))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.paths.data_dir = data_dir;
    }

    match cli.command {
        Command::Run {
            output_dir,
            format,
            write_detail,
        } => {
            if let Some(output_dir) = output_dir {
                config.paths.output_dir = Some(output_dir);
            }
            if let Some(format) = format {
                config.output.format = format;
            }
            config.output.write_detail |= write_detail;
            run(&config)
        }
        Command::Report { from, to } => report(&config, from, to),
    }
}

fn run(config: &PipelineConfig) -> Result<()> {
    info!(
        "🚀 Starting meal program pipeline (data: {})",
        config.paths.data_dir.display()
    );

    match run_pipeline(config) {
        Ok(summary) => {
            info!("=== Pipeline Summary ===");
            info!("👥 Residents: {}", summary.resident_count);
            info!(
                "🍽️ Menu rows: {}, plate counts: {}, detail rows: {}",
                summary.menu_rows, summary.plate_count_rows, summary.detail_rows
            );
            if summary.unmatched_menu_rows > 0 {
                warn!(
                    "⚠️ {} menu row(s) had no plate count",
                    summary.unmatched_menu_rows
                );
            }
            if let Some(rows) = summary.standards_rows {
                info!("📏 Nutrition standards rows: {}", rows);
            }
            info!("📅 Days summarized: {}", summary.days);
            if let Some(path) = &summary.detail_path {
                info!("Wrote meal detail to {}", path.display());
            }
            info!("✅ Wrote {}", summary.output_path.display());
            debug!("Run summary: {}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(e) => {
            error!("❌ Pipeline failed: {:#}", e);
            Err(e)
        }
    }
}

fn report(config: &PipelineConfig, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<()> {
    let residents = read_table(&config.input_path(&config.inputs.residents))
        .context("Failed to load residents")?
        .height();

    let daily = DailyView::load(&config.summary_path())?;
    let view = daily.filter_range(from, to)?;
    let kpis = view.kpis(residents)?;

    let checks = ComplianceChecks::load(&config.input_path(&config.inputs.compliance_checks))?;
    let checks = match (checks, view.date_bounds()?) {
        (Some(checks), Some((start, end))) => Some(checks.filter_range(start, end)?),
        (checks, _) => checks,
    };

    println!("{}", render_report(&view, &kpis, checks.as_ref())?);
    Ok(())
}
