use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use consent_core::{ConsentLogic, ConsentStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;
mod http;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "consentd", version, about = "Consent registry service")]
struct Cli {
    /// Config file (default: ~/.consentd/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store and serve the HTTP API
    Serve {
        /// Listen address, overrides [server].listen
        #[arg(long)]
        addr: Option<String>,
    },

    /// Seed a fresh store and print one validity verdict as JSON
    Check {
        #[arg(long)]
        user: String,
        #[arg(long)]
        consent: String,
    },

    /// Print the effective configuration
    Config,
}

fn init_logging(cfg: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Build the logic layer over a store populated from the configured seed set.
fn seeded_logic(cfg: &Config) -> Result<ConsentLogic> {
    let store = Arc::new(ConsentStore::new());
    cfg.seed_data()
        .apply(&store, chrono::Utc::now())
        .context("applying seed data")?;
    Ok(ConsentLogic::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    init_logging(&cfg);

    match cli.command {
        Commands::Serve { addr } => {
            let listen = addr.unwrap_or_else(|| cfg.server.listen.clone());
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("invalid listen address {listen}"))?;
            let logic = seeded_logic(&cfg)?;
            http::serve(addr, logic).await?;
        }
        Commands::Check { user, consent } => {
            let logic = seeded_logic(&cfg)?;
            let verdict = logic.check_consent_validity(&user, &consent)?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&cfg)?);
        }
    }
    Ok(())
}
