//! arta-collector - Music artist analytics
//!
//! Pulls artists for a genre tag from MusicBrainz, cleans them, enriches
//! them with Spotify popularity, exports a CSV and builds a report.
//!
//! Subcommands:
//! - `analyze`: one pipeline run, summary printed to stdout
//! - `serve`: conversational front-end over HTTP + SSE

use anyhow::{Context, Result};
use arta_common::config::{config_file_path, load_toml_config, DataDirInitializer, TomlConfig};
use arta_common::events::{ArtaEvent, EventBus};
use arta_common::time::{system_clock, SharedClock};
use arta_collector::config::{resolve_spotify_credentials, CollectorSettings, MODULE_NAME};
use arta_collector::frontend::{phase_label, SessionStore, SWEEP_INTERVAL_SECS};
use arta_collector::models::AnalysisRequest;
use arta_collector::report::ChartChoice;
use arta_collector::services::{
    AnalysisPipeline, MusicBrainzClient, PipelineOutcome, PopularityEnricher, SpotifyClient,
};
use arta_collector::{build_router, AppState};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Command-line arguments for arta-collector
#[derive(Parser, Debug)]
#[command(name = "arta-collector")]
#[command(about = "Music artist analytics: catalog, streaming popularity, reports")]
#[command(version)]
struct Args {
    /// Data folder (CSV exports land in <data-dir>/exports)
    #[arg(short, long, env = "ARTA_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Alternate TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run one analysis and print the summary
    Analyze {
        /// Genre tag to query
        #[arg(short, long)]
        genre: String,

        /// Number of artists to request (10-1000)
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Folder for the CSV export (defaults to <data-dir>/exports)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write every chart as SVG into this folder
        #[arg(long)]
        charts: Option<PathBuf>,
    },
    /// Serve the conversational front-end
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "ARTA_PORT")]
        port: Option<u16>,
    },
}

fn init_tracing(toml_config: &TomlConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_pipeline(
    toml_config: &TomlConfig,
    exports_dir: PathBuf,
    clock: SharedClock,
) -> Result<AnalysisPipeline> {
    let credentials = resolve_spotify_credentials(toml_config)?;
    let spotify = SpotifyClient::new(credentials, clock.clone())
        .context("Failed to build Spotify client")?;
    let musicbrainz = MusicBrainzClient::new().context("Failed to build MusicBrainz client")?;
    let enricher = PopularityEnricher::new(Arc::new(spotify));
    Ok(AnalysisPipeline::new(musicbrainz, enricher, exports_dir, clock))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .or_else(|| config_file_path(MODULE_NAME));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };

    init_tracing(&toml_config);

    info!(
        "Starting ARTA collector (arta-collector) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let port = match &args.command {
        Mode::Serve { port } => *port,
        Mode::Analyze { .. } => None,
    };
    let settings = CollectorSettings::resolve(args.data_dir.clone(), port, &toml_config);
    DataDirInitializer::new(settings.data_dir.clone())
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize data folder: {}", e))?;
    info!("Data folder: {}", settings.data_dir.display());

    let clock = system_clock();

    match args.command {
        Mode::Analyze {
            genre,
            count,
            out,
            charts,
        } => {
            let exports_dir = out.unwrap_or_else(|| settings.exports_dir.clone());
            let pipeline = build_pipeline(&toml_config, exports_dir, clock)?;
            let request = AnalysisRequest::new(genre, count.unwrap_or(settings.default_count))?;
            run_once(&pipeline, &request, charts).await
        }
        Mode::Serve { .. } => serve(&toml_config, &settings, clock).await,
    }
}

async fn run_once(
    pipeline: &AnalysisPipeline,
    request: &AnalysisRequest,
    charts_dir: Option<PathBuf>,
) -> Result<()> {
    let listener = |event: &ArtaEvent| match event {
        ArtaEvent::PhaseChanged { phase, .. } => info!("Phase: {}", phase_label(*phase)),
        ArtaEvent::ProgressDetail { message, .. } => info!("{}", message),
        _ => {}
    };

    let outcome = pipeline
        .run(Uuid::new_v4(), request, &listener)
        .await
        .context("Analysis failed")?;

    let result = match outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::NothingFound { reason } => {
            warn!("Nothing to analyse: {}", reason);
            println!("No {} artists found.", request.genre);
            return Ok(());
        }
    };

    let report = result.report();
    let summary = report.summary();
    println!("{}", summary.render_text());
    println!();
    println!("{}", summary.render_top_artists());
    println!();
    println!("CSV export: {}", result.export_path.display());

    if let Some(dir) = charts_dir {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        for chart in report.charts(ChartChoice::All) {
            let path = dir.join(format!("{}.svg", chart.kind.slug()));
            std::fs::write(&path, &chart.bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Chart: {}", path.display());
        }
    }

    Ok(())
}

async fn serve(toml_config: &TomlConfig, settings: &CollectorSettings, clock: SharedClock) -> Result<()> {
    let pipeline = build_pipeline(toml_config, settings.exports_dir.clone(), clock.clone())?;

    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    let state = AppState::new(Arc::new(pipeline), SessionStore::new(clock), event_bus)
        .with_defaults(settings.default_genre.clone(), settings.default_count);
    let _sweeper = state
        .conversation
        .store()
        .spawn_sweeper(Duration::from_secs(SWEEP_INTERVAL_SECS));
    let _error_tracker = state.spawn_error_tracker();

    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
