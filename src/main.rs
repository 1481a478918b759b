//! # Awful Game News
//!
//! Keeps a rewritten, categorized copy of a gaming news feed and republishes
//! it as `articles.json`, an RSS feed and a sitemap.
//!
//! ## Usage
//!
//! ```sh
//! awful_game_news --feed-url https://news.example.com/rss -o ./public
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Startup**: load configuration, force one refresh, write outputs
//! 2. **Schedule**: every `schedule_minutes`, force another refresh and
//!    rewrite the outputs
//! 3. **Shutdown**: Ctrl-C stops the loop between refreshes

use awful_game_news::cli::Cli;
use awful_game_news::config::AppConfig;
use awful_game_news::ingest::LiveFeedService;
use awful_game_news::outputs;
use awful_game_news::utils::ensure_writable_dir;
use clap::Parser;
use std::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

async fn refresh_and_write(service: &LiveFeedService, config: &AppConfig) {
    let t0 = Instant::now();
    let snapshot = service.fetch_feed(true).await;
    info!(
        articles = snapshot.articles.len(),
        categories = snapshot.categories.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Refresh finished"
    );

    if let Some(output_dir) = config.output_dir.as_deref() {
        if let Err(e) = outputs::write_all(&snapshot, &config.site, output_dir).await {
            error!(path = %output_dir, error = %e, "Failed to write outputs");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("awful_game_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, once = args.once, "Parsed CLI arguments");

    let config = args.apply_to(AppConfig::load(args.config.as_deref())?).validated();
    if config.feed.url.is_none() {
        warn!("No feed URL configured; the corpus will stay empty");
    }
    if config.rewrite.api_url.is_none() || config.rewrite.api_key.is_none() {
        warn!("Remote rewriting disabled; using the local rewriter only");
    }

    // Early check: fail before the first refresh rather than after it
    if let Some(output_dir) = config.output_dir.as_deref() {
        if let Err(e) = ensure_writable_dir(output_dir).await {
            error!(
                path = %output_dir,
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    let service = LiveFeedService::from_config(&config)?;

    refresh_and_write(&service, &config).await;
    if args.once {
        info!("Single refresh requested; exiting");
        return Ok(());
    }

    let period = Duration::from_secs(config.schedule_minutes * 60);
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(every_minutes = config.schedule_minutes, "Scheduled refreshes");

    loop {
        tokio::select! {
            _ = ticker.tick() => refresh_and_write(&service, &config).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
