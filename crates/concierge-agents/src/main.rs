use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rig::client::CompletionClient;
use tracing::info;

use concierge_agents::model::RigModel;
use concierge_agents::{Orchestrator, OrchestratorConfig, RunContext, Transcript};

/// Run one conversational turn through the supervisor/worker graph.
#[derive(Parser, Debug)]
#[command(name = "concierge", version, about)]
struct Cli {
    /// TOML config file. Defaults plus CONCIERGE_* environment variables when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Caller identity tools act on behalf of.
    #[arg(long)]
    user: Option<String>,

    /// JSON transcript file: loaded as prior conversation, overwritten with the result.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Override the transition cap.
    #[arg(long)]
    max_transitions: Option<usize>,

    /// The user's message.
    message: String,
}

fn load_history(path: &Path) -> Result<Transcript> {
    if !path.exists() {
        return Ok(Transcript::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid history {}", path.display()))
}

fn save_history(path: &Path, transcript: &Transcript) -> Result<()> {
    let json = serde_json::to_string_pretty(transcript).context("Failed to encode history")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write history {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = OrchestratorConfig::load(cli.config.as_deref())?;
    if let Some(max) = cli.max_transitions {
        config.max_transitions = max;
    }

    info!(
        model_url = %config.model.url,
        model = %config.model.model,
        max_transitions = config.max_transitions,
        "Concierge starting"
    );

    let client = config.model_client()?;
    let mut model = RigModel::new(
        client.completion_model(&config.model.model),
        config.model_timeout(),
    );
    if let Some(t) = config.model.temperature {
        model = model.with_temperature(t);
    }

    let providers = config.providers()?;
    let orchestrator = Orchestrator::from_config(Arc::new(model), &providers, &config)?;

    let prior = match &cli.history {
        Some(path) => load_history(path)?,
        None => Transcript::new(),
    };

    let ctx = RunContext::new(cli.user);
    let output = orchestrator.run_turn(&cli.message, prior, &ctx).await?;

    if output.exhausted {
        tracing::warn!("Transition cap reached; the answer may be partial");
    }
    println!("{}", output.answer);

    if let Some(path) = &cli.history {
        save_history(path, &output.transcript)?;
        info!(path = %path.display(), messages = output.transcript.len(), "History saved");
    }

    Ok(())
}
