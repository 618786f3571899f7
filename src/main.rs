use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carousel::config::{Config, LedgerBackend, SourceMode};
use carousel::filter::ContentFilter;
use carousel::ledger::{FileLedger, PublishLedger, SqliteLedger};
use carousel::models::{SkipReason, TickReport};
use carousel::scheduler::{FeedRoute, PacingConfig, RotationScheduler, TickLoop};
use carousel::source::{CandidateSource, HistoricalWindowSource, IncrementalPollSource};
use carousel::transport::{FeedRef, HttpTransport, HttpTransportConfig, Transport};

#[derive(Parser)]
#[command(
    name = "carousel",
    version,
    about = "Scheduled content rotation relay with durable dedup and content filtering",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "carousel.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduled relay loop until interrupted
    Run,

    /// Execute exactly one tick and print the report
    Tick {
        /// Bypass the publishing-window gate (ledger and quota still apply)
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Show ledger statistics and the current gate state
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = Config::from_file(&cli.config)?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::Tick { force } => tick(config, force).await?,
        Commands::Status => status(config)?,
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("carousel=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("carousel=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn build_ledger(config: &Config) -> Result<Arc<dyn PublishLedger>> {
    Ok(match config.storage.backend {
        LedgerBackend::File => Arc::new(FileLedger::open(&config.storage.path)?),
        LedgerBackend::Sqlite => Arc::new(SqliteLedger::open(&config.storage.path)?),
    })
}

fn build_scheduler(config: &Config) -> Result<Arc<RotationScheduler>> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
        HttpTransportConfig::new(&config.transport.api_url, &config.transport.token)
            .with_timeout(config.transport.timeout_secs),
    )?);

    let route = FeedRoute {
        source: FeedRef::new(&config.feeds.source),
        target: FeedRef::new(&config.feeds.target),
    };

    let source: Arc<dyn CandidateSource> = match config.schedule.source_mode {
        SourceMode::Historical => Arc::new(HistoricalWindowSource::new(
            transport.clone(),
            vec![route.source.clone()],
            chrono::Duration::hours(config.schedule.lookback_hours as i64),
        )),
        SourceMode::Poll => Arc::new(IncrementalPollSource::new(
            transport.clone(),
            route.source.clone(),
            config.schedule.max_batch,
        )),
    };

    let pacing = PacingConfig {
        inter_send_delay: Duration::from_millis(config.schedule.inter_send_delay_ms),
        max_send_attempts: config.schedule.max_send_attempts,
        ..Default::default()
    };

    let scheduler = RotationScheduler::new(
        source,
        transport,
        build_ledger(config)?,
        ContentFilter::new(&config.filter.banned_terms),
        route,
        config.publishing_window(),
        config.schedule.selection,
        pacing,
    )?;

    Ok(Arc::new(scheduler))
}

async fn run(config: Config) -> Result<()> {
    let interval = Duration::from_secs(config.schedule.interval_secs);
    let scheduler = build_scheduler(&config)?;

    tracing::info!(
        source = %config.feeds.source,
        target = %config.feeds.target,
        interval_secs = config.schedule.interval_secs,
        "Carousel relay starting"
    );

    let tick_loop = TickLoop::new(scheduler, interval);
    let shutdown = tick_loop.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            shutdown.shutdown();
        }
    });

    tick_loop.run().await?;
    tracing::info!("Carousel relay stopped");
    Ok(())
}

async fn tick(config: Config, force: bool) -> Result<()> {
    let scheduler = build_scheduler(&config)?;

    let report = scheduler.run_tick(force).await?;
    match report {
        TickReport::Completed(summary) => {
            for (item_id, message_id) in &summary.published {
                println!("published: item {item_id} -> message {message_id}");
            }
            if summary.filtered > 0 {
                println!("filtered: {} item(s) rejected", summary.filtered);
            }
            if summary.failed > 0 {
                println!("failed: {} item(s) permanently failed", summary.failed);
            }
            println!("{}", summary.display_line());
        }
        TickReport::Skipped(SkipReason::NothingEligible) => {
            println!("no unpublished content available");
        }
        TickReport::Skipped(reason) => {
            println!("tick skipped: {reason}");
        }
    }

    Ok(())
}

fn status(config: Config) -> Result<()> {
    let ledger = build_ledger(&config)?;
    let stats = ledger.stats()?;
    let window = config.publishing_window();
    let gate_open = window
        .allowed(chrono::Utc::now())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("Ledger ({:?} at {})", config.storage.backend, config.storage.path.display());
    println!("  total decided:    {}", stats.total);
    println!("  published:        {}", stats.published);
    println!("  skipped_filtered: {}", stats.skipped_filtered);
    println!("  skipped_empty:    {}", stats.skipped_empty);
    println!("  failed_permanent: {}", stats.failed_permanent);
    println!(
        "  cursor:           {}",
        ledger
            .cursor()?
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Window {:02}:00-{:02}:00 {} quota {} -> gate {}",
        window.start_hour,
        window.end_hour,
        window.timezone,
        window.quota_per_tick,
        if gate_open { "open" } else { "closed" }
    );

    Ok(())
}
