//! # Earmark Song Recognizer (earmark-sr)
//!
//! Acoustic fingerprint search engine service: catalog ingestion, one-shot
//! file recognition, and live streaming recognition over WebSocket.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use earmark_common::params::{AnalysisParams, MatcherParams, SessionParams};
use earmark_sr::api::{self, AppContext};
use earmark_sr::config::{Config, Overrides};
use earmark_sr::db::CatalogStore;
use earmark_sr::ingest::IngestService;
use earmark_sr::recognize::RecognitionEngine;

#[derive(Parser, Debug)]
#[command(name = "earmark-sr")]
#[command(about = "Earmark Song Recognizer - acoustic fingerprint search engine")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "earmark.toml", env = "EARMARK_CONFIG")]
    config: PathBuf,

    /// Catalog database path (overrides config file)
    #[arg(short, long, env = "EARMARK_DATABASE")]
    database: Option<PathBuf>,

    /// Songs directory (overrides config file)
    #[arg(short, long, env = "EARMARK_SONGS_DIR")]
    songs_dir: Option<PathBuf>,

    /// HTTP bind host (overrides config file)
    #[arg(long, env = "EARMARK_HOST")]
    host: Option<String>,

    /// HTTP bind port (overrides config file)
    #[arg(short, long, env = "EARMARK_PORT")]
    port: Option<u16>,

    /// Allowed CORS origins, comma separated (overrides config file)
    #[arg(long, env = "EARMARK_ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "earmark_sr=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    info!("Starting Earmark Song Recognizer (earmark-sr)");

    let args = Args::parse();
    let config = Config::load(
        &args.config,
        Overrides {
            database_path: args.database,
            songs_dir: args.songs_dir,
            host: args.host,
            port: args.port,
            allowed_origins: args.allowed_origins,
        },
    )
    .await?;
    info!(
        "Loaded configuration: database={}, songs_dir={}, bind={}:{}",
        config.database_path.display(),
        config.songs_dir.display(),
        config.host,
        config.port
    );

    let catalog = Arc::new(CatalogStore::open(&config.database_path).await?);
    let stats = catalog.stats().await?;
    info!(songs = stats.songs, fingerprints = stats.fingerprints, "catalog ready");

    let analysis_params = AnalysisParams::default();
    let engine = Arc::new(RecognitionEngine::new(
        Arc::clone(&catalog),
        analysis_params,
        MatcherParams::default(),
    ));
    let ingest = Arc::new(IngestService::new(Arc::clone(&catalog), analysis_params));

    let ctx = AppContext {
        catalog,
        engine,
        ingest,
        session_params: SessionParams::default(),
        config,
    };

    api::run(ctx).await?;

    info!("Earmark Song Recognizer shutting down");
    Ok(())
}
