//! srt-rollup - school assessment roll-up service
//!
//! Serves indicator, outcome, substrand and dimension scores over HTTP and
//! coordinates flushing staged edits to the score database.

use anyhow::{Context, Result};
use clap::Parser;
use srt_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use srt_common::EventBus;
use srt_rollup::{build_router, AppState, Assessment, Hierarchy, MemoryScoreStore, ScoreStore, SqliteScoreStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

const EVENT_BUS_CAPACITY: usize = 256;

/// Command-line arguments for srt-rollup
#[derive(Parser, Debug)]
#[command(name = "srt-rollup")]
#[command(about = "Assessment roll-up service for the School Review Toolkit")]
#[command(version)]
struct Args {
    /// TOML bootstrap config file
    #[arg(short, long, env = "SRT_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder for the database and pending-edit snapshot
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "SRT_ROLLUP_PORT")]
    port: Option<u16>,

    /// Bind address (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Indicator hierarchy JSON file (overrides config)
    #[arg(long)]
    hierarchy: Option<PathBuf>,

    /// School whose scores are served (overrides config)
    #[arg(long, env = "SRT_SCHOOL_ID")]
    school_id: Option<String>,

    /// Keep confirmed scores in memory instead of SQLite
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref())
        .with_context(|| "Failed to load bootstrap config")?;

    init_tracing(&config)?;

    info!(
        "Starting SRT roll-up service (srt-rollup) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let resolver = RootFolderResolver::new(args.root_folder.as_deref(), config.root_folder.as_deref());
    let initializer = RootFolderInitializer::new(resolver.resolve());
    initializer.ensure_directory_exists()?;
    info!("Root folder: {}", initializer.root().display());

    let school_id = args.school_id.unwrap_or_else(|| config.school_id.clone());

    let store: Arc<dyn ScoreStore> = if args.memory {
        info!("Using in-memory score store");
        Arc::new(MemoryScoreStore::new())
    } else {
        let db_path = config
            .database_path
            .clone()
            .unwrap_or_else(|| initializer.database_path());
        info!("Database path: {}", db_path.display());
        let pool = match srt_common::db::init_database(&db_path).await {
            Ok(pool) => {
                info!("✓ Connected to database");
                pool
            }
            Err(e) => {
                error!("Failed to open database: {}", e);
                return Err(e.into());
            }
        };
        Arc::new(SqliteScoreStore::new(pool))
    };

    let hierarchy = match args.hierarchy.or_else(|| config.hierarchy_path.clone()) {
        Some(path) => {
            let hierarchy = Hierarchy::load_json(&path)
                .with_context(|| format!("Failed to load hierarchy from {}", path.display()))?;
            info!(
                "✓ Loaded hierarchy: {} dimensions, {} indicators",
                hierarchy.dimensions().len(),
                hierarchy.indicator_count()
            );
            hierarchy
        }
        None => {
            warn!("No hierarchy file configured; dimension and outcome views will be empty");
            Hierarchy::default()
        }
    };

    let pending_path = config
        .pending_path
        .clone()
        .unwrap_or_else(|| initializer.pending_path());

    let events = Arc::new(EventBus::new(EVENT_BUS_CAPACITY));
    let assessment = Arc::new(
        Assessment::new(hierarchy, store, school_id.clone(), events).with_pending_snapshot(pending_path),
    );

    match assessment.refresh().await {
        Ok(records) => info!("✓ Loaded {} confirmed scores for school {}", records, school_id),
        Err(e) => warn!("Initial score refresh failed, starting with empty cache: {}", e),
    }

    let app = build_router(AppState::new(assessment));

    let bind = args.bind.unwrap_or_else(|| config.bind.clone());
    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("srt-rollup listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Config level is the default directive; RUST_LOG overrides it
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
