//! ISE CLI - Command-line interface
//!
//! Usage:
//!   ise <GOOGLE_API_KEY> <GOOGLE_ENGINE_ID> <r> <t> <q> <k>
//!       [--config FILE] [--extractor rules|llm] [--json]
//!
//! `r` selects the relation: 1 Schools_Attended, 2 Work_For, 3 Live_In,
//! 4 Top_Member_Employees.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ise_bootstrap::{BootstrapController, RunParams, RunReport};
use ise_core::{AppConfig, ExtractorBackend, LoggingConfig};
use ise_extractor::ExtractionModel;
use ise_search::{GoogleSearchClient, HttpTextFetcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ise")]
#[command(about = "Iterative set expansion: bootstrap relation tuples from web search")]
#[command(version)]
struct Cli {
    /// Google Custom Search API key
    google_api_key: String,

    /// Google Custom Search engine ID
    google_engine_id: String,

    /// Relation to extract (1-4)
    r: u8,

    /// Extraction confidence threshold (0-1)
    #[arg(allow_negative_numbers = true)]
    t: f32,

    /// Seed query, quoted if it has several words
    q: String,

    /// Number of tuples requested
    k: usize,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extraction backend (rules or llm)
    #[arg(long)]
    extractor: Option<ExtractorBackend>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    // Reject bad parameters before touching the network
    let params = RunParams::from_selector(cli.q.clone(), cli.r, cli.t, cli.k)?;

    if !cli.json {
        print_banner(&cli, &params);
    }

    let search = GoogleSearchClient::from_config(&config.search)?;
    let fetcher = HttpTextFetcher::from_config(&config.fetch)?;
    let model = ExtractionModel::load(&config.extraction).context("loading extraction model")?;
    tracing::info!(backend = ?model.backend(), "Extraction model loaded");

    let controller = BootstrapController::from_config(
        Arc::new(search),
        Arc::new(fetcher),
        Arc::new(model),
        &config,
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current page");
            ctrl_c.cancel();
        }
    });

    let report = controller.run_with_cancel(&params, &cancel).await?;
    drop(controller);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Defaults, then the optional TOML file, then env; positional credentials win
fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };

    config.search.api_key = Some(cli.google_api_key.clone());
    config.search.engine_id = Some(cli.google_engine_id.clone());
    if let Some(backend) = cli.extractor {
        config.extraction.backend = backend;
    }

    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let tail: String = key.chars().skip(len - 4).collect();
    format!("****{tail}")
}

fn print_banner(cli: &Cli, params: &RunParams) {
    println!("----------------------------------------------------------");
    println!("Parameters:");
    println!("API key          = {}", mask_key(&cli.google_api_key));
    println!("Search engine ID = {}", cli.google_engine_id);
    println!("Relation         = {} ({})", params.relation, params.relation.selector());
    println!("Threshold        = {}", params.threshold);
    println!("Query            = {}", params.seed_query);
    println!("# of tuples      = {}", params.k);
    println!("----------------------------------------------------------");
}

fn print_report(report: &RunReport) {
    println!("================== ALL RELATIONS ({}) ==================", report.relation);
    println!("Confidence | Subject | Object");
    for tuple in &report.tuples {
        println!(
            "{:.4} | {} | {}",
            tuple.confidence, tuple.subject, tuple.object
        );
    }
    println!();
    println!("Number of relations: {}", report.extracted);
    println!("Total number of iterations: {}", report.iterations);
    println!("Outcome: {}", report.outcome);
}
