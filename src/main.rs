mod console;
mod render;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use datasage_charts::{ChartAdapter, DisplayPolicy, ReportGenerator};
use datasage_core::auth::TokenChain;
use datasage_core::config::AppConfig;
use datasage_core::types::DatasetFile;
use datasage_core::{HttpTransport, ReportFlow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::console::ConsoleNotifier;

#[derive(Parser)]
#[command(
    name = "datasage",
    about = "Terminal client for the datasage CSV analysis service",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/datasage/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the analysis service base URL
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Bearer token for the analysis service
    #[arg(long, global = true)]
    token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with an uploaded dataset (default)
    Chat {
        /// CSV file to upload before the first prompt
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Generate a full analysis report for a CSV file
    Report {
        /// CSV file to analyze
        csv: PathBuf,
        /// Write the report as markdown to this path
        #[arg(long, value_name = "PATH")]
        export: Option<PathBuf>,
        /// Print the decoded report as JSON instead of the summary view
        #[arg(long)]
        json: bool,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "datasage=info,warn".into()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load()?,
    };

    // Apply CLI overrides.
    if let Some(api_base) = &cli.api_base {
        config.api.base_url = api_base.clone();
    }
    if let Some(token) = &cli.token {
        config.auth.token = Some(token.clone());
    }

    match cli.command {
        Some(Commands::Config { action }) => {
            handle_config_command(action, &config, cli.config.as_deref())?;
        }
        Some(Commands::Report { csv, export, json }) => {
            run_report(&config, &csv, export.as_deref(), json).await?;
        }
        Some(Commands::Chat { file }) => {
            repl::run(config, file).await?;
        }
        None => {
            repl::run(config, None).await?;
        }
    }

    Ok(())
}

async fn run_report(config: &AppConfig, csv: &Path, export: Option<&Path>, json: bool) -> Result<()> {
    tracing::info!("Analysis service: {}", config.api.base_url);

    let transport = Arc::new(HttpTransport::new(&config.api)?);
    let tokens = Arc::new(TokenChain::from_config(&config.auth));
    let flow = ReportFlow::new(config, transport, tokens, Arc::new(ConsoleNotifier));

    let file = DatasetFile::read(csv).await?;
    let report = flow.request_report(file).await?;

    let adapter = ChartAdapter::new(config.charts.histogram_bins);
    let charts = DisplayPolicy::from_config(&config.charts).displayed_charts(&adapter, &report.chart_specs);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report, &charts);
    }

    if let Some(path) = export {
        let markdown = ReportGenerator::markdown(&report, &charts);
        std::fs::write(path, markdown)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported markdown report to: {}", path.display());
    }

    Ok(())
}

fn handle_config_command(
    action: Option<ConfigAction>,
    config: &AppConfig,
    explicit_path: Option<&Path>,
) -> Result<()> {
    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_path);
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                AppConfig::default().save_to(&path)?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
