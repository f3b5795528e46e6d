//! datacrew - ask a database a question through a team of LLM agents
//!
//! Main entry point for the CLI application.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use datacrew::agent::{orchestration_config, seed_prompt, Orchestrator};
use datacrew::cli::{Console, Interrupts};
use datacrew::core::config::{LogFormat, LoggingConfig};
use datacrew::db::{PostgresManager, SchemaProvider};
use datacrew::llm::OpenAiClient;
use datacrew::{Config, RunOutcome};

/// datacrew - a data team of LLM agents
#[derive(Parser, Debug)]
#[command(name = "datacrew")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The question to answer from the database
    #[arg(long)]
    prompt: String,
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Everything after the pool is open, so the caller can always close it
async fn run_team(args: &Args, config: &Config, db: Arc<PostgresManager>) -> anyhow::Result<RunOutcome> {
    let llm = Arc::new(OpenAiClient::from_config(config)?);

    let table_definitions = db
        .table_definitions()
        .await
        .context("Failed to read table definitions")?;
    let prompt = seed_prompt(&args.prompt, &table_definitions);

    let orchestrator = Orchestrator::new(orchestration_config(config, llm, db)?)?;

    // Ctrl-C stops the run at the next turn boundary; a second one exits.
    let cancel = CancellationToken::new();
    tokio::spawn(Interrupts::new(cancel.clone()).watch());

    let (events, handle) = orchestrator.run_stream(prompt, cancel);
    let mut console = Console::stdout();
    let drained = console.drain(events).await;

    let outcome = handle.await.context("Orchestration task panicked")?;
    drained.context("Failed to write the transcript")?;
    Ok(outcome)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Load config and initialize logging before any other operations
    let config = Config::load()?;
    init_logging(&config.logging);
    config.validate()?;

    let db = Arc::new(
        PostgresManager::connect(&config.database)
            .await
            .context("Failed to connect to the database")?,
    );

    let result = run_team(&args, &config, db.clone()).await;
    db.close().await;
    let outcome = result?;

    info!(turns = outcome.turns, reason = %outcome.reason, "done");

    Ok(if outcome.is_approved() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
