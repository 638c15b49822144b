//! forge CLI - sandboxed code-generation server
//!
//! Usage:
//!   forge serve                 Run the HTTP/WebSocket server
//!   forge generate <prompt>     Run one job locally, printing stage events
//!   forge delete <id>           Remove a job's workspace
//!   forge init-config           Write a default forge.toml

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use forge_agent::{Agent, ProcessAgent, ScaffoldAgent};
use forge_core::{ForgeConfig, JobRequest, CONFIG_FILE};
use forge_sandbox::{delete_workspace, DeleteOutcome, WorkspaceRegistry};
use forge_server::{run_job, AppState, JobState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about = "Sandboxed code-generation server")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to ./forge.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory that holds job workspaces
    #[arg(long, global = true, value_name = "DIR")]
    workspace_dir: Option<PathBuf>,

    /// External agent command, e.g. "python3 agent.py"
    #[arg(long, global = true, value_delimiter = ' ')]
    agent_command: Option<Vec<String>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one job locally and print its stage events as JSON lines
    Generate {
        /// What to build
        prompt: String,

        /// Maximum agent tool calls
        #[arg(long)]
        recursion_limit: Option<u32>,
    },

    /// Delete a job's workspace
    Delete {
        /// Job id
        id: String,
    },

    /// Write a default configuration file in the current directory
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(config, host, port).await,
        Commands::Generate {
            prompt,
            recursion_limit,
        } => cmd_generate(config, prompt, recursion_limit).await,
        Commands::Delete { id } => cmd_delete(config, id).await,
        Commands::InitConfig => cmd_init_config(),
    }
}

fn load_config(cli: &Cli) -> Result<ForgeConfig> {
    let mut config = match &cli.config {
        Some(path) => ForgeConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ForgeConfig::load_or_default(&std::env::current_dir()?)?,
    };

    if let Some(dir) = &cli.workspace_dir {
        config.workspace.base_dir = dir.clone();
    }
    if let Some(argv) = &cli.agent_command {
        config.agent.command = argv.iter().filter(|a| !a.is_empty()).cloned().collect();
    }

    Ok(config)
}

fn build_agent(config: &ForgeConfig) -> Result<Arc<dyn Agent>> {
    if config.agent.command.is_empty() {
        return Ok(Arc::new(ScaffoldAgent::new()));
    }
    let agent = ProcessAgent::new(&config.agent.command)?;
    Ok(Arc::new(agent))
}

async fn cmd_serve(mut config: ForgeConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let agent = build_agent(&config)?;
    info!(
        "Serving with agent {} and workspaces under {}",
        agent.name(),
        config.workspace.base_dir.display()
    );

    let state = AppState::new(&config, agent).shared();
    forge_server::serve(state, &config.bind_addr()).await
}

async fn cmd_generate(
    config: ForgeConfig,
    prompt: String,
    recursion_limit: Option<u32>,
) -> Result<()> {
    let agent = build_agent(&config)?;
    let state = AppState::new(&config, agent).shared();

    let limit = recursion_limit.unwrap_or(config.jobs.default_recursion_limit);
    let request = JobRequest::new(prompt).with_recursion_limit(limit);

    let (tx, mut rx) = mpsc::channel(16);
    let job = tokio::spawn(run_job(state, request, tx));

    while let Some(event) = rx.recv().await {
        println!("{}", serde_json::to_string(&event)?);
    }

    let outcome = job.await.context("Job task failed")?;
    if outcome.state != JobState::Complete {
        bail!("Job {} did not complete", outcome.project_id);
    }
    Ok(())
}

async fn cmd_delete(config: ForgeConfig, id: String) -> Result<()> {
    let registry = WorkspaceRegistry::from_settings(&config.workspace);
    info!("Deleting {} under {}", id, registry.base_dir().display());
    match delete_workspace(&registry, &id)? {
        DeleteOutcome::Removed => println!("Project {} deleted successfully", id),
        DeleteOutcome::AlreadyAbsent => {
            println!("Project {} not found, but deletion completed", id)
        }
    }
    Ok(())
}

fn cmd_init_config() -> Result<()> {
    let dir = std::env::current_dir()?;
    if dir.join(CONFIG_FILE).exists() {
        bail!("{} already exists in {}", CONFIG_FILE, dir.display());
    }
    let path = ForgeConfig::write_default(&dir)?;
    println!("Wrote {}", path.display());
    Ok(())
}
