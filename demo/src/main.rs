//! maestro: Multi-agent Runtime Demo CLI
//!
//! Runs one or all of the scripted scenarios, or a configured team against
//! the Anthropic API. Scripted scenarios use real maestro components
//! (validator, journal, executor, tools) with scripted models and fictional
//! data, so they need no network access.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- delegation
//!   cargo run -p demo -- budget-exhaustion
//!   cargo run -p demo -- document-query
//!   cargo run -p demo -- code-agent
//!   cargo run -p demo -- team --api-key sk-... "How many users signed up in May 2024?"

mod mock_data;
mod scenarios;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use maestro_contracts::error::MaestroResult;

use scenarios::{budget_exhaustion, code_agent, delegation, document_query, team};

// ── CLI definition ────────────────────────────────────────────────────────────

/// maestro: step-bounded multi-agent runtime demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "maestro multi-agent runtime demo",
    long_about = "Runs maestro demo scenarios showing delegation between agents,\n\
                  step budgets, tool failures as observations, and journal integrity."
)]
struct Cli {
    /// Directory the code agent writes Python files into.
    #[arg(long, global = true, default_value_os_t = default_output_dir())]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every scripted scenario in sequence.
    RunAll,
    /// Orchestrator delegating to a query analyzer and a report generator.
    Delegation,
    /// A model stuck on an unknown tool exhausts its step budget.
    BudgetExhaustion,
    /// Document queries including an unsupported operation.
    DocumentQuery,
    /// A code agent writing a Python file, with a rejected path first.
    CodeAgent,
    /// Build a team from TOML and run one task against the Anthropic API.
    Team {
        /// Team TOML file (defaults to the bundled team.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Anthropic API key.
        #[arg(long)]
        api_key: String,
        /// Database URL for sql_query (defaults to a seeded in-memory SQLite).
        #[arg(long)]
        database_url: Option<String>,
        /// Serper API key; enables google_search and serper_scrape.
        #[arg(long)]
        serper_key: Option<String>,
        /// Jina API key; enables jina_rerank.
        #[arg(long)]
        jina_key: Option<String>,
        /// The task for the entry agent.
        task: String,
    },
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("maestro-demo")
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for every state transition.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(&cli.output_dir).await,
        Command::Delegation => delegation::run_scenario().await,
        Command::BudgetExhaustion => budget_exhaustion::run_scenario().await,
        Command::DocumentQuery => document_query::run_scenario().await,
        Command::CodeAgent => code_agent::run_scenario(&cli.output_dir).await,
        Command::Team {
            config,
            api_key,
            database_url,
            serper_key,
            jina_key,
            task,
        } => {
            team::run_scenario(team::TeamOptions {
                config,
                api_key,
                database_url,
                serper_key,
                jina_key,
                output_dir: cli.output_dir,
                task,
            })
            .await
        }
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_all(output_dir: &std::path::Path) -> MaestroResult<()> {
    delegation::run_scenario().await?;
    budget_exhaustion::run_scenario().await?;
    document_query::run_scenario().await?;
    code_agent::run_scenario(output_dir).await?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("maestro: Step-bounded Multi-agent Runtime");
    println!("==========================================");
    println!();
    println!("Agent loop per run:");
    println!("  [1] Planning: the model sees the task, the tools, and every previous step");
    println!("  [2] Acting:   the proposed tool call is validated, then executed under a timeout");
    println!("  [3] Observing: the result (success or failure) is appended and journaled");
    println!("  [4] Repeat until a final answer or the step budget runs out");
    println!("  Managed agents are tools: a whole sub-run is one step for the manager.");
    println!();
}
