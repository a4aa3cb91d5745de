//! # swarmd
//!
//! Swarm orchestration server binary — wires the sanitizer, event hub,
//! message bus, agent manager, and HTTP server together and runs until
//! interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use swarm_bus::MessageBus;
use swarm_events::FanoutHub;
use swarm_guardrails::GuardrailsRegistry;
use swarm_runtime::depcache::DepCache;
use swarm_runtime::manager::{AgentManager, AgentManagerConfig};
use swarm_runtime::memory::MemoryProbe;
use swarm_sanitizer::Sanitizer;
use swarm_server::config::ServerConfig;
use swarm_server::server::SwarmServer;
use swarm_server::shutdown::ShutdownCoordinator;
use swarm_server::state::AppState;

/// Swarm orchestration server.
#[derive(Parser, Debug)]
#[command(name = "swarmd", about = "Multi-agent orchestration server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "8787")]
    port: u16,

    /// Base path for durable state (messages dump, dependency cache).
    #[arg(long, default_value = "/persistent")]
    persistent_root: PathBuf,

    /// Root directory for per-agent workspaces.
    #[arg(long)]
    workspace_root: Option<PathBuf>,

    /// Executable for the agent child CLI.
    #[arg(long, default_value = "agent-cli")]
    agent_command: String,

    /// Extra argument for the child CLI (repeatable).
    #[arg(long = "agent-arg")]
    agent_args: Vec<String>,
}

impl Cli {
    fn default_workspace_root() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_owned());
        PathBuf::from(home).join(".swarm").join("workspaces")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let workspace_root = cli
        .workspace_root
        .clone()
        .unwrap_or_else(Cli::default_workspace_root);
    std::fs::create_dir_all(&workspace_root)
        .with_context(|| format!("failed to create {}", workspace_root.display()))?;

    let config = ServerConfig {
        host: cli.host.clone(),
        port: cli.port,
        persistent_root: cli.persistent_root.clone(),
        workspace_root: workspace_root.clone(),
        ..ServerConfig::default()
    };

    let sanitizer = Arc::new(Sanitizer::new());
    let hub = Arc::new(FanoutHub::new(sanitizer));
    let guardrails = Arc::new(GuardrailsRegistry::new());
    let bus = MessageBus::with_persistence(config.messages_path());
    let depcache = Arc::new(DepCache::init(&cli.persistent_root));

    let mut manager_config = AgentManagerConfig::new(workspace_root);
    manager_config.child_program = cli.agent_command.clone();
    manager_config.child_args = cli.agent_args.clone();
    let manager = AgentManager::new(
        manager_config,
        Arc::clone(&guardrails),
        hub,
        Arc::clone(&bus),
    );
    manager.start_ttl_sweeper();

    let state = AppState {
        manager: Arc::clone(&manager),
        bus: Arc::clone(&bus),
        guardrails,
        memory: Arc::new(MemoryProbe::new()),
        depcache,
        shutdown: Arc::new(ShutdownCoordinator::new()),
        start_time: Instant::now(),
    };

    let server = SwarmServer::new(config, state.clone());
    let (addr, handle) = server.listen().await.context("failed to bind")?;
    info!(%addr, agent_command = %cli.agent_command, "swarmd ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("interrupt received, shutting down");

    state.shutdown.drain(&state.manager, &state.bus).await;
    handle.await.context("server task failed")?;
    Ok(())
}
