use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use idea_refinery::{
    config::{Config, LogFormat},
    langbase::LangbaseClient,
    oracle::LangbaseOracle,
    prompts::{
        ANALYTICAL_PIPE_DESCRIPTION, ANALYTICAL_SYSTEM_PROMPT, CREATIVE_PIPE_DESCRIPTION,
        CREATIVE_SYSTEM_PROMPT,
    },
    DebateConfig, DebateContext, EvaluatorProfile, ExploreConfig, Idea, RankConfig, Refinery,
};

/// Scored refinement of ideas through an LLM oracle.
#[derive(Parser, Debug)]
#[command(name = "idea-refinery", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Read the JSON request from this file instead of stdin
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Skip creating the Langbase pipes at startup
    #[arg(long, global = true)]
    skip_pipe_setup: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Commands {
    /// Explore narrative directions for an idea
    Explore,
    /// Generate and rank candidate scripts for a direction
    Rank,
    /// Run the panel consensus loop on a piece of content
    Debate,
}

#[derive(Debug, Deserialize)]
struct ExploreRequest {
    idea: Idea,
    niche: String,
    #[serde(default)]
    config: ExploreConfig,
}

#[derive(Debug, Deserialize)]
struct RankRequest {
    idea: Idea,
    direction: String,
    niche: String,
    #[serde(default)]
    config: RankConfig,
}

#[derive(Debug, Deserialize)]
struct DebateRequest {
    content: String,
    context: DebateContext,
    /// Defaults to the stock panel
    #[serde(default)]
    panel: Option<Vec<EvaluatorProfile>>,
    #[serde(default)]
    config: DebateConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        command = ?cli.command,
        "Idea refinery starting..."
    );

    let input = read_input(cli.input.as_ref())?;

    // Initialize Langbase client
    let langbase = match LangbaseClient::new(&config.langbase, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.langbase.base_url, "Langbase client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Langbase client");
            return Err(e.into());
        }
    };

    // Ensure required pipes exist (create if needed)
    if !cli.skip_pipe_setup {
        info!("Ensuring required Langbase pipes exist...");
        for (name, description, prompt) in [
            (&config.pipes.creative, CREATIVE_PIPE_DESCRIPTION, CREATIVE_SYSTEM_PROMPT),
            (&config.pipes.analytical, ANALYTICAL_PIPE_DESCRIPTION, ANALYTICAL_SYSTEM_PROMPT),
        ] {
            if let Err(e) = langbase.ensure_pipe(name, description, prompt).await {
                error!(pipe = %name, error = %e, "Failed to ensure pipe exists");
                return Err(e.into());
            }
        }
    }

    let oracle = LangbaseOracle::new(langbase, config.pipes.clone(), config.pricing.clone());
    let refinery = Refinery::new(Arc::new(oracle), &config.engine);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, returning partial results");
            on_interrupt.cancel();
        }
    });

    let output = match run(cli.command, &refinery, &input, &cancel).await {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "Request failed");
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    info!("Done");
    Ok(())
}

async fn run(
    command: Commands,
    refinery: &Refinery,
    input: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<serde_json::Value> {
    let output = match command {
        Commands::Explore => {
            let request: ExploreRequest = serde_json::from_str(input)?;
            let result = refinery
                .explore(&request.idea, &request.niche, &request.config, cancel)
                .await?;
            serde_json::json!({
                "selected": result.selected,
                "reasoning_path": result.reasoning_path(),
                "tree": result.tree.to_json(),
                "total_explored": result.total_explored,
                "total_pruned": result.total_pruned,
                "cancelled": result.cancelled,
            })
        }
        Commands::Rank => {
            let request: RankRequest = serde_json::from_str(input)?;
            let result = refinery
                .rank(
                    &request.idea,
                    &request.direction,
                    &request.niche,
                    &request.config,
                    cancel,
                )
                .await?;
            serde_json::to_value(result)?
        }
        Commands::Debate => {
            let request: DebateRequest = serde_json::from_str(input)?;
            let panel = request
                .panel
                .unwrap_or_else(EvaluatorProfile::default_panel);
            let result = refinery
                .debate(
                    &request.content,
                    &request.context,
                    &panel,
                    &request.config,
                    cancel,
                )
                .await?;
            serde_json::to_value(result)?
        }
    };
    Ok(output)
}

fn read_input(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
