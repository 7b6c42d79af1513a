//! Host binary for the salat prayer-time core.

use clap::{Parser, Subcommand};
use chrono::Local;
use salat::notifications::TracingNotificationSink;
use salat::prayer::{Prayer, PrayerSnapshot};
use salat::scheduler::{BackgroundScheduler, JobExecutor, JobFuture, JobInput, JobRunner, jobs};
use salat::store::{JsonFileStore, KeyValueStore};
use salat::{HttpUpstream, PrayerService, SalatConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Prayer times with cached calendars, fallbacks and notifications.
#[derive(Parser)]
#[command(name = "salat-host", version, about)]
struct Cli {
    /// Path to TOML configuration file. Background jobs always read the
    /// default config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ministry city id, overriding the config file.
    #[arg(long)]
    city: Option<u32>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load today's times, schedule notifications and print them.
    Today,

    /// Force a monthly calendar refresh, then load today.
    Refresh,

    /// Register background jobs once and run them until Ctrl+C.
    Run,

    /// Cancel and re-register background jobs.
    ResetJobs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_dir = salat::salat_dirs::logs_dir();
    let _log_guard = salat::logging::init(Some(log_dir.as_path()))?;

    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(SalatConfig::default_config_path);
    let mut config = SalatConfig::from_file(&path)?;
    if let Some(city) = cli.city {
        config.location.city_id = city;
    }
    config.validate()?;

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open_default());

    match cli.command.unwrap_or(Command::Today) {
        Command::Today => {
            let service = build_service(config, store).await?;
            let snapshot = service.load_today(Local::now().naive_local()).await?;
            print_snapshot(&snapshot);
        }
        Command::Refresh => {
            let service = build_service(config, store).await?;
            let snapshot = service.manual_refresh(Local::now().naive_local()).await?;
            print_snapshot(&snapshot);
        }
        Command::Run => run_jobs(config, store).await?,
        Command::ResetJobs => {
            let scheduler = BackgroundScheduler::new(
                store.clone(),
                config.scheduler.daily_hour,
                config.scheduler.daily_minute,
            )?;
            let mut runner = JobRunner::load(store, executor()).await?;
            scheduler
                .reset(&mut runner, config.location.city_id, Local::now().naive_local())
                .await?;
            println!("Registered {} jobs", runner.jobs().len());
        }
    }

    Ok(())
}

async fn build_service(
    config: SalatConfig,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<PrayerService> {
    let upstream = Arc::new(HttpUpstream::new(config.sources.upstream.clone())?);
    let service =
        PrayerService::build(config, store, upstream, Arc::new(TracingNotificationSink)).await?;
    Ok(service)
}

fn executor() -> JobExecutor {
    Arc::new(|input: JobInput| Box::pin(jobs::execute(input)) as JobFuture)
}

async fn run_jobs(config: SalatConfig, store: Arc<dyn KeyValueStore>) -> anyhow::Result<()> {
    let scheduler = BackgroundScheduler::new(
        store.clone(),
        config.scheduler.daily_hour,
        config.scheduler.daily_minute,
    )?;
    let mut runner = JobRunner::load(store, executor())
        .await?
        .with_history_limit(config.scheduler.history_limit);
    scheduler
        .register_once(&mut runner, config.location.city_id, Local::now().naive_local())
        .await?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, stopping after the current tick");
            cancel_clone.cancel();
        }
    });

    println!("Running {} jobs. Press Ctrl+C to stop.", runner.jobs().len());
    let handle = runner.run(
        Duration::from_secs(config.scheduler.tick_interval_secs),
        cancel,
    );
    handle.await?;
    Ok(())
}

fn print_snapshot(snapshot: &PrayerSnapshot) {
    let location = snapshot.display_location.as_deref().unwrap_or("-");
    println!("{} ({location}, source: {})", snapshot.date, snapshot.source_used);
    if snapshot.stale {
        println!("Showing last known times; refresh failed.");
    }
    for prayer in Prayer::ALL {
        println!("  {:<8} {}", prayer.to_string(), snapshot.time_of(prayer));
    }
}
