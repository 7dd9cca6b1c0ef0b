use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use ace_webhook::config::{LogFormat, Settings};
use ace_webhook::daemon;
use ace_webhook::solver::{AceSolver, ChallengePayload, Solver};

#[derive(Parser)]
#[command(name = "ace-webhook")]
#[command(about = "ACME DNS-01 webhook solver backed by Kubernetes secrets")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the webhook API
    Serve,

    /// Process a single ChallengePayload file and print the response
    Solve {
        /// Path to a JSON-encoded ChallengePayload
        payload: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

fn init_logging(log_level: &str, format: LogFormat, writer: BoxMakeWriter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}

/// The API group the host routes challenges to.
fn group_name() -> Result<String> {
    std::env::var("GROUP_NAME")
        .ok()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("GROUP_NAME must be specified"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref())?;

    // Keep stdout clean for the response document when solving a single payload
    let writer = match cli.command {
        Commands::Solve { .. } => BoxMakeWriter::new(std::io::stderr),
        _ => BoxMakeWriter::new(std::io::stdout),
    };
    init_logging(&settings.server.log_level, settings.server.log_format, writer);

    match cli.command {
        Commands::Serve => {
            let group = group_name()?;
            let host = settings.host_config()?;
            let solver = AceSolver::initialize(&host).context("Failed to initialize solver")?;

            info!("Starting ace-webhook");
            daemon::run(&settings.server.listen, &group, Arc::new(solver)).await?;
        }

        Commands::Solve { payload } => {
            group_name()?;
            let content = std::fs::read_to_string(&payload)
                .with_context(|| format!("Failed to read payload: {}", payload.display()))?;
            let request: ChallengePayload = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse payload: {}", payload.display()))?;

            let host = settings.host_config()?;
            let solver = AceSolver::initialize(&host).context("Failed to initialize solver")?;

            let response = daemon::process_payload(&solver, request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Commands::Config => {
            show_config(&settings, cli.config)?;
        }
    }

    Ok(())
}

fn show_config(settings: &Settings, path: Option<PathBuf>) -> Result<()> {
    let config_path = path.unwrap_or_else(Settings::config_path);

    println!("Configuration file location: {}\n", config_path.display());
    if !config_path.exists() {
        println!("Configuration file not found, using defaults.\n");
    }

    println!("Effective configuration:\n");
    println!("{}", toml::to_string_pretty(settings)?);

    Ok(())
}
