//! Salescast CLI — build a forecast chart from a saved analytics payload.
//!
//! Commands:
//! - `chart`: run the pipeline over a JSON payload and print the chart
//! - `toggle`: flip a metric's visibility in the session file
//! - `catalog`: list the configured metrics

mod logging;
mod render;
mod session;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;

use salescast_core::{DateKey, EngineConfig, Pipeline};

#[derive(Parser)]
#[command(
    name = "salescast",
    about = "Salescast CLI — marketplace metric timelines with a short-horizon forecast"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the chart for a payload and print it.
    Chart {
        /// Path to the raw JSON payload.
        #[arg(long)]
        payload: PathBuf,

        /// Reference day (YYYY-MM-DD). Defaults to the local date.
        #[arg(long)]
        today: Option<String>,

        /// Path to a TOML engine config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Session preferences file. Defaults to the user data directory.
        #[arg(long)]
        session: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Flip a metric's visibility for the session.
    Toggle {
        /// Metric id (see `salescast catalog`).
        metric: String,

        #[arg(long)]
        session: Option<PathBuf>,

        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the configured metrics.
    Catalog {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let logging_config = logging::LoggingConfig::from_env()?;
    logging::init_logging(&logging_config)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Chart {
            payload,
            today,
            config,
            session,
            format,
        } => run_chart(&payload, today.as_deref(), config.as_deref(), session, format),
        Commands::Toggle {
            metric,
            session,
            config,
        } => run_toggle(&metric, session, config.as_deref()),
        Commands::Catalog { config } => run_catalog(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn run_chart(
    payload_path: &Path,
    today: Option<&str>,
    config_path: Option<&Path>,
    session_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;

    let content = std::fs::read_to_string(payload_path)
        .with_context(|| format!("read payload {}", payload_path.display()))?;
    let payload: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("parse payload {}", payload_path.display()))?;

    // Captured once so the whole run sees one "today".
    let today = match today {
        Some(raw) => raw.parse::<DateKey>()?,
        None => DateKey::from_date(chrono::Local::now().date_naive()),
    };

    let session_path = session_path.unwrap_or_else(session::default_path);
    let mut prefs = session::load(&session_path);

    let chart = Pipeline::new(config).run(&payload, today, &mut prefs);
    session::save(&session_path, &prefs)?;
    info!(fingerprint = %chart.fingerprint(), "chart ready");

    let output = match format {
        OutputFormat::Json => render::json(&chart)?,
        OutputFormat::Csv => render::csv(&chart)?,
        OutputFormat::Table => render::table(&chart),
    };
    print!("{output}");
    Ok(())
}

fn run_toggle(metric: &str, session_path: Option<PathBuf>, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let catalog = config.catalog();
    let Some(spec) = catalog.iter().find(|spec| spec.id == metric) else {
        let known: Vec<&str> = catalog.iter().map(|spec| spec.id.as_str()).collect();
        bail!("unknown metric '{metric}', expected one of: {}", known.join(", "));
    };

    let session_path = session_path.unwrap_or_else(session::default_path);
    let mut prefs = session::load(&session_path);
    let visible = prefs.toggle(&spec.id, spec.default_visible);
    session::save(&session_path, &prefs)?;

    println!("{metric}: {}", if visible { "shown" } else { "hidden" });
    Ok(())
}

fn run_catalog(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("{:<18} {:<6} {:<8} {:<6} Label", "ID", "Unit", "Default", "Carry");
    println!("{}", "-".repeat(64));
    for spec in config.catalog() {
        println!(
            "{:<18} {:<6} {:<8} {:<6} {}",
            spec.id,
            spec.unit.as_str(),
            if spec.default_visible { "shown" } else { "hidden" },
            if spec.carry_forward { "yes" } else { "no" },
            spec.label,
        );
    }
    Ok(())
}
