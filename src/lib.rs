pub mod api;
pub mod calibration;
pub mod clock;
pub mod db;
pub mod error;
pub mod gaze;
pub mod hazard;
pub mod models;
pub mod outbox;
pub mod replay;
pub mod settings;
pub mod survey;
mod utils;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use api::{HttpSurveyApi, OfflineSink, ResultSink, VideoSource};
use db::Database;
use outbox::{flush_outbox, OutboxWorker};
use replay::{ReplayDriver, ReplayScript};
use settings::{CaptureSettings, SettingsStore};

#[derive(Debug, Parser)]
#[command(name = "hazardlens", version, about = "Gaze and hazard capture for driving-hazard surveys")]
pub struct Cli {
    /// Directory holding settings.json and the result outbox.
    #[arg(long, default_value = "hazardlens-data")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replays a recorded participant session through the capture pipeline.
    Replay {
        script: PathBuf,
        /// Queue every result locally instead of posting it.
        #[arg(long)]
        offline: bool,
    },
    /// Retries delivery of queued results once.
    Flush,
    /// Prints the number of queued results.
    Pending,
}

struct AppContext {
    db: Database,
    settings: CaptureSettings,
    api: HttpSurveyApi,
}

impl AppContext {
    fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
        let settings = settings_store.current().with_env_overrides();
        let db = Database::new(data_dir.join("outbox.sqlite3"))?;
        let api = HttpSurveyApi::new(settings.api_base_url.clone(), settings.request_timeout());

        Ok(Self { db, settings, api })
    }
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(execute(cli))
}

async fn execute(cli: Cli) -> Result<()> {
    let context = AppContext::open(&cli.data_dir)?;

    match cli.command {
        Command::Replay { script, offline } => run_replay(context, &script, offline).await,
        Command::Flush => {
            let report = flush_outbox(
                &context.db,
                &context.api,
                context.settings.outbox_max_attempts,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Pending => {
            let count = context.db.count_pending_results().await?;
            println!("{count}");
            Ok(())
        }
    }
}

async fn run_replay(context: AppContext, script_path: &Path, offline: bool) -> Result<()> {
    let script = ReplayScript::from_path(script_path)?;
    let AppContext { db, settings, api } = context;
    let api = api.with_bearer_token(script.participant.token.clone());

    let videos: Arc<dyn VideoSource> = match script.fixed_video_source() {
        Some(source) => source,
        None => Arc::new(api.clone()),
    };
    let results: Arc<dyn ResultSink> = if offline {
        Arc::new(OfflineSink)
    } else {
        Arc::new(api.clone())
    };

    let mut worker = OutboxWorker::new();
    if !offline {
        worker.start(
            db.clone(),
            Arc::new(api),
            settings.outbox_flush_interval(),
            settings.outbox_max_attempts,
        )?;
    }

    info!(
        "Replaying {} events for participant {}",
        script.events.len(),
        script.participant.user_id
    );
    let driver = ReplayDriver::new(&settings, script.viewport, videos, results, Some(db.clone()));
    let report = driver.run(&script).await;

    if let Err(err) = worker.stop().await {
        warn!("Outbox worker did not stop cleanly: {err:#}");
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
