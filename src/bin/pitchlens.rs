//! Command-line entry point: run the HTTP server, or analyze one deck.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pitchlens::{
    run_server, AnalysisConfig, Analyzer, EnrichmentClient, HarmonicClient, OpenAiClient,
    Pdftoppm,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pitchlens",
    version,
    about = "Pitch-deck analysis: rasterize, score with a vision LLM, report"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Listen address.
        #[arg(long, default_value = "127.0.0.1:8787", env = "PITCHLENS_BIND")]
        bind: String,

        /// Root directory for cache and staging state.
        #[arg(long, default_value = "./data", env = "PITCHLENS_DATA_DIR")]
        data_dir: PathBuf,

        /// Slides per vision request.
        #[arg(long, default_value_t = 4, env = "PITCHLENS_BATCH_SIZE")]
        batch_size: usize,

        /// Concurrent in-flight batch requests.
        #[arg(long, default_value_t = 1, env = "PITCHLENS_BATCH_CONCURRENCY")]
        batch_concurrency: usize,

        /// Rasterization DPI (72-400).
        #[arg(long, default_value_t = 150, env = "PITCHLENS_DPI")]
        dpi: u32,
    },

    /// Analyze a single deck and print the report.
    Analyze {
        /// Path to the PDF.
        file: PathBuf,

        /// Company website domain for enrichment (e.g. acme.dev).
        #[arg(long)]
        website: Option<String>,

        /// Print the full result as JSON instead of the report text.
        #[arg(long)]
        json: bool,

        /// Root directory for cache and staging state.
        #[arg(long, default_value = "./data", env = "PITCHLENS_DATA_DIR")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            bind,
            data_dir,
            batch_size,
            batch_concurrency,
            dpi,
        } => {
            let config = AnalysisConfig::builder()
                .data_dir(data_dir)
                .batch_size(batch_size)
                .batch_concurrency(batch_concurrency)
                .dpi(dpi)
                .build()?;
            let analyzer = build_analyzer(config)?;
            run_server(Arc::new(analyzer), &bind).await?;
        }

        Command::Analyze {
            file,
            website,
            json,
            data_dir,
        } => {
            let config = AnalysisConfig::builder().data_dir(data_dir).build()?;
            let analyzer = build_analyzer(config)?;

            let bytes = std::fs::read(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let output = analyzer.analyze(&bytes, website.as_deref()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", output.analysis);
            }
        }
    }

    Ok(())
}

fn build_analyzer(config: AnalysisConfig) -> Result<Analyzer> {
    let chat = OpenAiClient::from_env()
        .context("configuring the chat API (set OPENAI_API_KEY)")?;

    let enrichment = match std::env::var("HARMONIC_API_KEY") {
        Ok(key) if !key.is_empty() => {
            info!("Company enrichment enabled");
            let client = HarmonicClient::new(key, config.api_timeout_secs)?;
            Some(Arc::new(client) as Arc<dyn EnrichmentClient>)
        }
        _ => {
            info!("HARMONIC_API_KEY not set; company enrichment disabled");
            None
        }
    };

    Ok(Analyzer::new(
        config,
        Arc::new(Pdftoppm::default()),
        Arc::new(chat),
        enrichment,
    )?)
}
