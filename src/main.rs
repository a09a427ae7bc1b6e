use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guild_ledger::api::{build_router, state::AppState};
use guild_ledger::calculate::compute_guild_stats;
use guild_ledger::config::AppConfig;
use guild_ledger::models::{Member, Role};
use guild_ledger::storage::{GuildStore, JsonlGuildStore, StorageConfig};

#[derive(Parser)]
#[command(name = "guild-ledger")]
#[command(about = "Guild roster, gear progress and attendance tracker")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./guild.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Print current guild statistics as JSON
    Stats,

    /// Register a member (sign-in is handled upstream)
    AddMember {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: Option<String>,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { force } = cli.command {
        if cli.config.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                cli.config.display()
            );
        }
        AppConfig::default().write_to(&cli.config)?;
        println!("Wrote default configuration to {}", cli.config.display());
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_tracing(&config.log_level, cli.json_logs);
    tracing::info!("Starting guild-ledger v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(JsonlGuildStore::open(StorageConfig::new(
        config.data_dir.clone(),
    ))?);

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let state = AppState {
                store: store.clone(),
                config: Arc::new(config),
            };
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Stats => {
            let stats = compute_guild_stats(store.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::AddMember { email, name, admin } => {
            if let Some(existing) = store.find_member_by_email(&email).await? {
                bail!("{} is already registered as {}", email, existing.id);
            }
            let mut member = Member::new(&email);
            if let Some(name) = name.as_deref() {
                member = member.with_name(name);
            }
            if admin {
                member = member.with_role(Role::Admin);
            }
            let member = store.insert_member(member).await?;
            println!("Registered {} with id {}", member.email, member.id);
        }
        Commands::InitConfig { .. } => {}
    }

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await,
        Err(_) => tracing::warn!("Store still referenced at shutdown"),
    }

    Ok(())
}
