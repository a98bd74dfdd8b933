//! Health Tracker command line
//!
//! Drives the core against a SQLite store and a simulated wearable.
//!
//! ## Commands
//!
//! - `goals`: show the stored goals
//! - `set-goal`: change one goal target
//! - `chart`: refresh one metric card and print its chart
//! - `snapshot`: dump the cached health data
//! - `events`: list recorded heart-rate events
//! - `monitor`: run one heart-rate session

use anyhow::Result;
use clap::{Parser, Subcommand};
use health_tracker_core::clock::SystemClock;
use health_tracker_core::config::TrackerConfig;
use health_tracker_core::device::SimulatedDevice;
use health_tracker_core::repositories::SqliteStore;
use health_tracker_core::scheduler::TokioScheduler;
use health_tracker_core::services::{
    spawn_event_recorder, spawn_heart_rate_cacher, DashboardService, ExportService, GoalsService,
    HealthCacheService, HeartRateEventService, MonitorPhase,
};
use health_tracker_core::{db, TrackerContext};
use health_tracker_shared::{GoalTarget, Granularity, Metric};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "health-tracker")]
#[command(about = "Goals, cached health data and heart-rate sessions")]
#[command(version)]
struct Cli {
    /// Use a throwaway in-memory store instead of the configured database
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the stored goals (defaults fill anything missing)
    Goals,

    /// Set one goal target
    SetGoal {
        /// steps, sleep, cycling or heartRate
        metric: String,

        /// A number, or `min-max` for heart rate (e.g. 55-150)
        value: String,
    },

    /// Refresh a metric and print its chart
    Chart {
        /// steps, sleep, cycling or heartRate
        metric: String,

        #[arg(
            default_value = "Daily",
            value_parser = ["Daily", "Weekly", "Monthly", "daily", "weekly", "monthly"]
        )]
        granularity: String,
    },

    /// Print the cached health snapshot
    Snapshot,

    /// List recorded heart-rate events, newest first
    Events {
        /// Print CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Run one heart-rate monitoring session against the simulated device
    Monitor {
        /// Run an automatic (shorter) session instead of a manual one
        #[arg(long)]
        auto: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = TrackerConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if TrackerConfig::is_production() { "production" } else { "development" },
        "Starting Health Tracker"
    );

    let pool = if cli.memory {
        db::create_memory_pool().await?
    } else {
        db::create_pool(&config.storage.url, config.storage.max_connections).await?
    };
    db::run_migrations(&pool).await?;
    db::health_check(&pool).await?;

    let ctx = TrackerContext::new(
        Arc::new(SqliteStore::new(pool)),
        Arc::new(SimulatedDevice::default()),
        Arc::new(SystemClock),
        config,
    );

    match cli.command {
        Commands::Goals => show_goals(&ctx).await,
        Commands::SetGoal { metric, value } => set_goal(&ctx, &metric, &value).await,
        Commands::Chart { metric, granularity } => chart(&ctx, &metric, &granularity).await,
        Commands::Snapshot => snapshot(&ctx).await,
        Commands::Events { csv } => events(&ctx, csv).await,
        Commands::Monitor { auto } => monitor(&ctx, auto).await,
    }
}

async fn show_goals(ctx: &TrackerContext) -> Result<()> {
    let goals = GoalsService::load_goals(ctx.store()).await;
    for metric in Metric::ALL {
        println!("{:<10} {} {}", metric, goals.target(metric), metric.unit());
    }
    Ok(())
}

async fn set_goal(ctx: &TrackerContext, metric: &str, value: &str) -> Result<()> {
    let metric: Metric = metric.parse()?;
    let target: GoalTarget = value.parse()?;
    let goals = ctx.update_goal(metric, target).await?;
    println!("{} goal set to {}", metric, goals.target(metric));
    Ok(())
}

async fn chart(ctx: &TrackerContext, metric: &str, granularity: &str) -> Result<()> {
    let metric: Metric = metric.parse()?;
    let granularity: Granularity = granularity.parse()?;
    let view = DashboardService::refresh(ctx, metric, granularity).await;

    println!(
        "{} ({}): {} {} [{:?}], {:.0}% of goal",
        view.metric,
        view.granularity,
        view.current,
        metric.unit(),
        view.origin,
        view.progress.percent
    );
    let peak = view.series.values().iter().cloned().fold(0.0_f64, f64::max);
    for (label, value) in view.series.labels().iter().zip(view.series.values()) {
        let width = if peak > 0.0 { (value / peak * 40.0).round() as usize } else { 0 };
        println!("{:>5} {:<40} {}", label, "#".repeat(width), value);
    }
    println!("Last updated {}", view.last_updated);
    Ok(())
}

async fn snapshot(ctx: &TrackerContext) -> Result<()> {
    let snapshot = HealthCacheService::load_snapshot(ctx.store()).await;
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());

    println!("Last updated:  {}", show(snapshot.last_updated.clone()));
    println!("Active tab:    {}", show(snapshot.active_tab.map(|t| t.to_string())));
    println!("Steps:         {}", show(snapshot.current_steps.map(|v| v.to_string())));
    println!("Heart rate:    {}", show(snapshot.current_heart_rate.map(|v| v.to_string())));
    for metric in Metric::ALL {
        let points = snapshot
            .series(metric)
            .history
            .as_ref()
            .map(|h| format!("{} points", h.len()));
        println!("{:<14} {}", format!("{} history:", metric), show(points));
    }
    Ok(())
}

async fn events(ctx: &TrackerContext, csv: bool) -> Result<()> {
    let events = HeartRateEventService::load_events(ctx.store()).await;
    if csv {
        print!("{}", ExportService::events_csv(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No heart-rate events recorded");
    }
    for event in &events {
        println!("{}  {:>3} bpm  {}", event.timestamp.to_rfc3339(), event.value, event.source);
    }
    Ok(())
}

async fn monitor(ctx: &TrackerContext, auto: bool) -> Result<()> {
    let scheduler = Arc::new(TokioScheduler::new());
    let (monitor, mut status_rx, events_rx) = ctx.monitor(scheduler);
    let max_events = ctx.config().events.max_events;
    let recorder = spawn_event_recorder(ctx.store_handle(), max_events, events_rx);
    let cacher = spawn_heart_rate_cacher(ctx.store_handle(), ctx.clock_handle(), status_rx.clone());

    if auto {
        monitor.start_auto()?;
    } else {
        monitor.start_manual()?;
    }
    println!("Monitoring heart rate (Ctrl+C to stop)...");

    while status_rx.borrow_and_update().phase == MonitorPhase::Monitoring {
        tokio::select! {
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow().clone();
                if let (MonitorPhase::Monitoring, Some(bpm)) = (status.phase, status.bpm) {
                    println!("  {} bpm", bpm);
                }
            }
            _ = signal::ctrl_c() => {
                warn!("Interrupted, stopping session");
                break;
            }
        }
    }

    monitor.shutdown();
    drop(monitor);

    let recorded = recorder.await?;
    let cached = cacher.await?;
    info!(recorded, cached, "Monitoring finished");
    match HeartRateEventService::load_events(ctx.store()).await.first() {
        Some(event) if recorded > 0 => println!("Recorded {} bpm ({})", event.value, event.source),
        _ => println!("No reading recorded"),
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if TrackerConfig::is_production() {
            "health_tracker_core=info".into()
        } else {
            "health_tracker_core=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if TrackerConfig::is_production() {
        // JSON logging for production
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}
