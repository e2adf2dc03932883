//! gazettewatch -- official-gazette watcher.
//!
//! Checks the gazette page on a daily schedule, downloads the day's
//! document, searches it for a configured phrase, and reports the outcome
//! to a Telegram chat.

pub mod api;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod locator;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod search;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use crate::scheduler::{ScheduledJob, Trigger, TriggerScheduler};

/// Start the daemon: scheduler task plus API server.
pub async fn serve(config: AppConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;

    // 1. Pipeline (shared by the scheduler and the API)
    let pipeline = Arc::new(Pipeline::from_config(&config)?);

    // 2. Scheduler
    let (scheduler, schedule) = TriggerScheduler::new(
        config.trigger_slots()?,
        Arc::clone(pipeline.clock()),
        config.poll_interval(),
    )?;

    // 3. Scheduler engine (background task), after the optional startup run
    let job: Arc<dyn ScheduledJob> = pipeline.clone();
    let run_on_startup = config.schedule.run_on_startup;
    let startup_pipeline = Arc::clone(&pipeline);
    tokio::spawn(async move {
        if run_on_startup {
            tracing::info!("running report at startup");
            startup_pipeline.run_pipeline(Trigger::Startup).await;
        }
        scheduler.run(job).await;
    });

    // 4. API server
    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", config.server.bind))?;
    let app = api::router(api::state::AppState { pipeline, schedule });

    tracing::info!(%addr, "gazettewatch listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
