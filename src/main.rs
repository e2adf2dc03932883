use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazettewatch::clock::{Clock, SystemClock};
use gazettewatch::config::AppConfig;
use gazettewatch::pipeline::Pipeline;
use gazettewatch::scheduler::{Trigger, TriggerScheduler};

#[derive(Parser)]
#[command(
    name = "gazettewatch",
    about = "Watches the official gazette for a phrase and reports to Telegram",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true, env = "GAZETTEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (scheduler + HTTP API)
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run the pipeline once now
    Run {
        /// Build the report without sending anything
        #[arg(long)]
        no_notify: bool,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Preview the upcoming trigger times
    Schedule {
        /// Hours to preview (at most one year)
        #[arg(long, default_value = "48", value_parser = clap::value_parser!(u64).range(1..=8784))]
        hours: u64,
    },

    /// Validate and print the effective configuration
    CheckConfig,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let mut config = AppConfig::load_or_default(path)?;
    config
        .apply_process_env()
        .context("invalid environment override")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!(bind = %config.server.bind, "Starting gazettewatch daemon");
            gazettewatch::serve(config).await?;
        }
        Commands::Run { no_notify, json } => {
            config.validate().context("invalid configuration")?;
            let pipeline = Pipeline::from_config(&config)?;

            let (report, delivery) = if no_notify {
                (pipeline.build_report().await, None)
            } else {
                let (report, delivery) = pipeline.execute(Trigger::Manual).await;
                (report, Some(delivery))
            };

            if json {
                let search = report.search_result();
                let out = serde_json::json!({
                    "status": report.status(),
                    "page_title": report.page_title(),
                    "executed_at": report.execution_timestamp().to_rfc3339(),
                    "summary": report.summary_text(),
                    "total_pages": search.map(|r| r.total_pages),
                    "found_pages": search.map(|r| r.found_pages.clone()),
                    "filename": search.map(|r| r.filename.clone()),
                    "delivery": delivery,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", report.summary_text());
                if let Some(delivery) = delivery {
                    println!(
                        "summary sent: {} | document: {:?}",
                        delivery.summary_sent, delivery.document
                    );
                }
            }
        }
        Commands::Schedule { hours } => {
            config.validate().context("invalid configuration")?;
            let clock = SystemClock::new(config.timezone()?);
            let (scheduler, _) = TriggerScheduler::new(
                config.trigger_slots()?,
                std::sync::Arc::new(clock),
                config.poll_interval(),
            )?;

            let now = clock.now();
            let end = now + chrono::Duration::hours(hours as i64);
            let mut upcoming = Vec::new();
            for slot in scheduler.slots() {
                let mut from = now;
                while let Some(at) = slot.next_fire_after(&from) {
                    if at > end {
                        break;
                    }
                    upcoming.push((at, slot.label()));
                    from = at + chrono::Duration::minutes(1);
                }
            }
            upcoming.sort();

            if upcoming.is_empty() {
                println!("No runs scheduled in next {} hours.", hours);
            } else {
                println!("Upcoming runs (next {} hours, {}):", hours, config.schedule.timezone);
                for (at, label) in upcoming {
                    println!("{} : slot {}", at.to_rfc3339(), label);
                }
            }
        }
        Commands::CheckConfig => {
            let valid = config.validate();

            println!("\ngazettewatch configuration");
            println!("{:<26} | Value", "Setting");
            println!("{:-<26}-|-{:-<40}", "", "");
            let page_url = config
                .page_url()
                .map(|u| u.to_string())
                .unwrap_or_else(|e| format!("INVALID ({e})"));
            let slots: Vec<String> = config
                .schedule
                .slots
                .iter()
                .map(|s| format!("{:02}:{:02}", s.hour, s.minute))
                .collect();
            let rows = [
                ("page url", page_url),
                ("search text", config.search.text.clone()),
                ("timezone", config.schedule.timezone.clone()),
                ("trigger slots", slots.join(", ")),
                ("run on startup", config.schedule.run_on_startup.to_string()),
                ("send document when found", config.notify.send_document_when_found.to_string()),
                ("telegram bot token", config.notify.masked_token()),
                (
                    "telegram chat id",
                    if config.notify.chat_id.is_empty() {
                        "(not set)".to_string()
                    } else {
                        config.notify.chat_id.clone()
                    },
                ),
                ("bind", config.server.bind.clone()),
            ];
            for (name, value) in rows {
                println!("{:<26} | {}", name, value);
            }

            if let Ok(tz) = config.timezone() {
                let now = SystemClock::new(tz).now();
                println!("{:<26} | {}", "current time", now.format("%Y-%m-%d %H:%M:%S %Z"));
            }
            println!();

            match valid {
                Ok(()) if config.notify.is_configured() => {
                    println!("✅ Configuration complete");
                }
                Ok(()) => {
                    println!("⚠️  Configuration valid, but TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID are missing");
                }
                Err(e) => {
                    println!("❌ {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
