mod cli;

use reelforge::{app, telemetry};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use rf_pipeline::{RunOutcome, Scheduler};
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio_util::sync::CancellationToken;

async fn start_scheduler(config_path: Option<PathBuf>, now: bool) -> Result<()> {
    let config = app::load_config(config_path.as_deref())?;
    for warning in config.validate() {
        tracing::warn!("Config: {}", warning);
    }

    telemetry::install_metrics(&config.metrics)?;
    let app = app::build(&config)?;

    let loader = app::user_loader(config_path, config.users.clone());
    let scheduler = Scheduler::new(&config.schedule.cron, app.pipeline.clone(), loader)?
        .with_run_on_start(now || config.schedule.run_on_start);

    tracing::info!("Starting Reelforge scheduler");
    tracing::info!(
        cron = %config.schedule.cron,
        users = config.users.len(),
        output_dir = %config.paths.output_dir.display(),
        "Scheduler configured"
    );

    let cancel = CancellationToken::new();
    let scheduler_handle = tokio::spawn(scheduler.run(cancel.clone()));

    shutdown_signal().await;

    tracing::info!("Shutting down...");
    cancel.cancel();
    scheduler_handle.await?;

    tracing::info!(
        videos_generated = app.pipeline.counter().get(),
        "Scheduler stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing(cli.verbose, cli.log_json)?;

    match cli.command {
        Commands::Start { now } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_scheduler(cli.config, now))
        }
        Commands::RunOnce { user } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_once(cli.config.as_deref(), user.as_deref()))
        }
        Commands::Fetch { topic, sources } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(fetch(cli.config.as_deref(), &topic, &sources))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Videos {
            id,
            user,
            limit,
            json,
        } => match id {
            Some(id) => show_video(cli.config.as_deref(), &id, json),
            None => list_videos(cli.config.as_deref(), user.as_deref(), limit, json),
        },
        Commands::Version => {
            println!("reelforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_once(config_path: Option<&Path>, user: Option<&str>) -> Result<()> {
    let config = app::load_config(config_path)?;
    let users = app::select_users(config.users.clone(), user)?;
    let app = app::build(&config)?;

    tracing::info!(users = users.len(), "Running one tick");
    let reports = app.pipeline.run_tick(users).await;

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, RunOutcome::Failed { .. }))
        .count();
    if failed > 0 {
        anyhow::bail!("{} of {} run(s) failed", failed, reports.len());
    }
    Ok(())
}

async fn fetch(config_path: Option<&Path>, topic: &str, sources: &[String]) -> Result<()> {
    let config = app::load_config(config_path)?;
    let http = rf_sources::build_client(
        std::time::Duration::from_secs(config.http.timeout_secs),
        &config.http.user_agent,
    )?;
    let registry = rf_sources::SourceRegistry::with_defaults(http);

    let items = rf_sources::fetch_content(&registry, topic, sources).await;
    println!("{}", serde_json::to_string_pretty(&items)?);
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = app::load_config(config_path)?;
    let tools = rf_av::ToolRegistry::discover(&config.tools).check_all();

    for tool in &tools {
        let status = if tool.available { "✓" } else { "✗" };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    let has = |name: &str| tools.iter().any(|t| t.name == name && t.available);

    println!();
    if !has("ffmpeg") {
        println!("ffmpeg is missing: narration fallback and composition will fail.");
    } else if !has("gtts-cli") && !has("espeak") {
        println!("No text-to-speech backend found: install gtts-cli or espeak.");
    } else {
        println!("All required tools are available!");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = rf_core::config::Config::load(p)?;
            println!("✓ Configuration is valid");
            println!("  Schedule: {}", config.schedule.cron);
            println!("  Output dir: {}", config.paths.output_dir.display());
            println!("  Stock provider: {}", config.stock.provider);
            println!("  Metrics enabled: {}", config.metrics.enabled);
            println!("  Users: {}", config.users.len());
            for user in &config.users {
                let platforms: Vec<&str> = user.platforms.iter().map(|p| p.name.as_str()).collect();
                println!(
                    "    {} topic={:?} sources=[{}] platforms=[{}]",
                    user.email,
                    user.topic,
                    user.sources.join(", "),
                    platforms.join(", ")
                );
            }

            let warnings = config.validate();
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = rf_core::config::Config::default();
            println!("Default config:");
            println!("  Schedule: {}", config.schedule.cron);
            println!("  Output dir: {}", config.paths.output_dir.display());
        }
    }

    Ok(())
}

fn open_video_db(config_path: Option<&Path>) -> Result<rf_db::DbPool> {
    let config = app::load_config(config_path)?;
    let Some(db_path) = config.database.path else {
        anyhow::bail!("database.path is not configured; videos are not being recorded");
    };
    Ok(rf_db::init_pool(&db_path)?)
}

fn print_video(video: &rf_db::models::Video) {
    println!("{} {} [{}] {}", video.created_at, video.user_email, video.status, video.title);
    println!("    file: {}", video.file_path);
    if !video.platforms_ok.is_empty() {
        println!("    published: {}", video.platforms_ok.join(", "));
    }
    if !video.platforms_failed.is_empty() {
        println!("    failed: {}", video.platforms_failed.join(", "));
    }
}

fn show_video(config_path: Option<&Path>, id: &str, json: bool) -> Result<()> {
    let video_id: rf_core::VideoId = id
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid video id {id:?}: {e}"))?;

    let pool = open_video_db(config_path)?;
    let conn = rf_db::get_conn(&pool)?;
    let Some(video) = rf_db::queries::videos::get_video(&conn, video_id)? else {
        return Err(rf_core::Error::not_found("video", id).into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&video)?);
    } else {
        println!("id: {}", video.id);
        println!("run: {}", video.run_id);
        print_video(&video);
        println!("    source: {}", video.source_url);
    }
    Ok(())
}

fn list_videos(config_path: Option<&Path>, user: Option<&str>, limit: u32, json: bool) -> Result<()> {
    let pool = open_video_db(config_path)?;
    let conn = rf_db::get_conn(&pool)?;
    let videos = rf_db::queries::videos::list_videos(&conn, user, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos recorded.");
        return Ok(());
    }

    for video in &videos {
        print_video(video);
    }
    let total = rf_db::queries::videos::count_videos(&conn)?;
    println!("\nShowing {} of {} video(s)", videos.len(), total);

    Ok(())
}
