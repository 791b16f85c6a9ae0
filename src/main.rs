//! # Media Harness CLI (`mh`)
//!
//! ## Usage
//!
//! ```bash
//! mh --config ./config/mh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mh init` | Create the SQLite database and run schema migrations |
//! | `mh ingest --tenant <id> <paths...>` | Ingest files and directories |
//! | `mh ask --tenant <id> "<question>"` | Answer a question from a tenant's documents |
//! | `mh search --tenant <id> "<query>"` | Show ranked keyword matches |
//! | `mh tenants list` | List tenants with document counts |
//! | `mh tenants create` | Mint a new tenant id |
//! | `mh contents` | Dump stored documents |
//! | `mh cleanup --tenant <id>` | Delete documents from a tenant |
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use media_harness::config::{self, Config};
use media_harness::media_harness_core::MediaType;
use media_harness::tenants::CleanupFilter;
use media_harness::{chat, ingest, migrate, search, tenants};

/// Media Harness: multimodal ingestion and grounded question answering.
#[derive(Parser)]
#[command(
    name = "mh",
    about = "Media Harness: multimodal ingestion and grounded question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When the file does not exist, built-in defaults are used with every
    /// provider disabled.
    #[arg(long, global = true, default_value = "./config/mh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Ingest files (directories are walked recursively) into a tenant.
    Ingest {
        #[arg(long)]
        tenant: String,

        /// Re-submit under an existing document id (single file only).
        #[arg(long)]
        id: Option<String>,

        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Answer a question grounded in a tenant's documents.
    Ask {
        #[arg(long)]
        tenant: String,

        question: String,
    },

    /// Rank a tenant's documents against a query.
    Search {
        #[arg(long)]
        tenant: String,

        query: String,

        /// Show at most this many results.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Tenant administration.
    Tenants {
        #[command(subcommand)]
        action: TenantAction,
    },

    /// Print stored documents.
    Contents {
        /// Restrict to one tenant.
        #[arg(long)]
        tenant: Option<String>,
    },

    /// Delete documents from a tenant.
    Cleanup {
        #[arg(long)]
        tenant: String,

        /// Only documents of this media type (text, image, audio, video).
        #[arg(long)]
        media_type: Option<MediaType>,

        /// Only documents whose extraction was degraded.
        #[arg(long)]
        degraded: bool,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// List tenants with their document counts.
    List,
    /// Mint a new tenant id.
    Create {
        /// Human-readable prefix for the id.
        #[arg(long)]
        name: Option<String>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(path: &std::path::Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        tracing::debug!(config = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Tenants {
        action: TenantAction::Create { name },
    } = &cli.command
    {
        return tenants::run_create(name.as_deref());
    }

    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Ingest { tenant, id, paths } => {
            ingest::run_ingest(&cfg, &tenant, &paths, id).await?;
        }
        Commands::Ask { tenant, question } => {
            chat::run_ask(&cfg, &tenant, &question).await?;
        }
        Commands::Search {
            tenant,
            query,
            limit,
        } => {
            search::run_search(&cfg, &tenant, &query, limit).await?;
        }
        Commands::Tenants { action } => match action {
            TenantAction::List => tenants::run_list(&cfg).await?,
            TenantAction::Create { .. } => {
                // Handled above (before config loading)
                unreachable!()
            }
        },
        Commands::Contents { tenant } => {
            tenants::run_contents(&cfg, tenant.as_deref()).await?;
        }
        Commands::Cleanup {
            tenant,
            media_type,
            degraded,
        } => {
            let filter = CleanupFilter {
                media_type,
                degraded_only: degraded,
            };
            tenants::run_cleanup(&cfg, &tenant, filter).await?;
        }
    }

    Ok(())
}
