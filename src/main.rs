use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use video_localizer::config::Config;
use video_localizer::pipeline::{RunOptions, Stage};
use video_localizer::service::LocalizationService;
use video_localizer::services::Services;
use video_localizer::state::{FileJobStore, InMemoryJobStore, JobStatus, JobStore};

/// Force flags and the stage each one re-runs
const FORCE_FLAGS: [(&str, Stage); 5] = [
    ("force-transcribe", Stage::Transcribe),
    ("force-translate", Stage::Translate),
    ("force-analysis", Stage::Analyze),
    ("force-synthesize", Stage::Synthesize),
    ("force-merge", Stage::Merge),
];

fn cli() -> Command {
    let mut localize = Command::new("localize")
        .about("Localize one video in the foreground, resuming from saved artifacts")
        .arg(
            Arg::new("video")
                .value_name("VIDEO")
                .help("Path to the video file")
                .required(true),
        )
        .arg(
            Arg::new("lang")
                .short('l')
                .long("lang")
                .value_name("CODE")
                .help("Target language code, e.g. es, zh-HK")
                .required(true),
        )
        .arg(
            Arg::new("job-id")
                .long("job-id")
                .value_name("ID")
                .help("Job id (defaults to the video file name)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for per-job artifacts (overrides config)"),
        );

    for (flag, stage) in FORCE_FLAGS {
        localize = localize.arg(
            Arg::new(flag)
                .long(flag)
                .help(format!("Re-run the {} stage even if its output exists", stage))
                .action(ArgAction::SetTrue),
        );
    }

    Command::new("Video Localizer")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Transcribe, translate, dub and publish videos")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("serve").about("Run the HTTP API").arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_name("PORT")
                    .help("Port to listen on (overrides config)")
                    .value_parser(clap::value_parser!(u16)),
            ),
        )
        .subcommand(localize)
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(std::path::Path::new(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::from_env()
        }),
    };
    config.validate()?;
    Ok(config)
}

async fn build_service(config: &Config) -> Result<LocalizationService> {
    let store: Arc<dyn JobStore> = match &config.service.state_dir {
        Some(dir) => Arc::new(FileJobStore::new(dir.clone()).await?),
        None => Arc::new(InMemoryJobStore::new()),
    };
    let services = Services::from_config(config)?;
    Ok(LocalizationService::from_config(config, services, store))
}

#[cfg(feature = "api")]
async fn serve(config: Config, matches: &ArgMatches) -> Result<()> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(config.service.port);
    let service = Arc::new(build_service(&config).await?);

    let model = service.language_model_status().await;
    if model.available {
        info!("✅ {:?} language model is reachable", model.provider);
    } else {
        warn!("⚠️  {:?} language model is not reachable, jobs will fail at translation", model.provider);
    }

    video_localizer::api::ApiServer::new(service, port).start().await
}

#[cfg(not(feature = "api"))]
async fn serve(_config: Config, _matches: &ArgMatches) -> Result<()> {
    Err(anyhow!("Built without the `api` feature"))
}

async fn localize(mut config: Config, matches: &ArgMatches) -> Result<()> {
    let video = PathBuf::from(
        matches
            .get_one::<String>("video")
            .ok_or_else(|| anyhow!("VIDEO is required"))?,
    );
    let lang = matches
        .get_one::<String>("lang")
        .ok_or_else(|| anyhow!("--lang is required"))?;
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.pipeline.artifacts_dir = PathBuf::from(dir);
    }

    let mut options = RunOptions::resumable(config.pipeline.artifacts_dir.clone());
    for (flag, stage) in FORCE_FLAGS {
        if matches.get_flag(flag) {
            options = options.with_force(stage);
        }
    }

    info!("🎬 Localizing {} to {}", video.display(), lang);
    info!("📂 Artifacts: {}", config.pipeline.artifacts_dir.display());

    let service = build_service(&config).await?;
    let record = service
        .localize_file(&video, lang, matches.get_one::<String>("job-id").cloned(), options)
        .await?;

    match record.status {
        JobStatus::Completed => {
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        _ => {
            let message = record.error.unwrap_or_else(|| "unknown error".to_string());
            error!("Localization failed: {}", message);
            Err(anyhow!(message))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    // Initialize logging
    let default_filter = if matches.get_flag("verbose") {
        "video_localizer=debug,info"
    } else {
        "video_localizer=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = load_config(&matches)?;
    info!("{}", config.summary());

    match matches.subcommand() {
        Some(("serve", sub)) => serve(config, sub).await,
        Some(("localize", sub)) => localize(config, sub).await,
        _ => Err(anyhow!("Unknown command")),
    }
}
