//! Irisbot CLI
//!
//! Local execution entry point for catalog scraping.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Parser, Subcommand};
use irisbot::{
    browser::ChromePage,
    error::{AppError, Result},
    models::Config,
    pipeline,
    storage::ProjectStore,
    utils::Downloader,
};

/// Irisbot - Iris catalog scraper
#[derive(Parser, Debug)]
#[command(name = "irisbot", version, about = "Iris real-estate catalog scraper")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "irisbot.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the project catalog into the database
    Crawl {
        /// Run the browser with a visible window
        #[arg(long)]
        headed: bool,

        /// Override the maximum number of pagination iterations
        #[arg(long)]
        max_iterations: Option<u64>,
    },

    /// Download card images for stored projects
    Assets {
        /// Destination directory
        #[arg(long, default_value = "assets")]
        dir: PathBuf,
    },

    /// Validate the configuration files
    Validate,

    /// Show database statistics
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    config.apply_env();

    match cli.command {
        Command::Crawl {
            headed,
            max_iterations,
        } => {
            if headed {
                config.browser.headless = false;
            }
            if let Some(cap) = max_iterations {
                config.pagination.max_iterations = cap;
            }
            run_crawl(config).await?;
        }

        Command::Assets { dir } => {
            download_assets(&config, &dir).await?;
        }

        Command::Validate => {
            config.validate()?;
            log::info!("Configuration OK (catalog: {})", config.urls.catalog);
        }

        Command::Info => {
            let store = ProjectStore::open(&config.storage.db_path)?;
            let stats = store.stats()?;
            log::info!("Database: {}", config.storage.db_path);
            log::info!("  Projects stored: {}", stats.total);
            log::info!("  With Ley VP: {}", stats.with_ley_vp);
            log::info!(
                "  Last update: {}",
                stats.last_updated.as_deref().unwrap_or("never")
            );
        }
    }

    Ok(())
}

/// Launch the browser and run the crawl on a blocking thread, with ctrl-c
/// requesting a clean stop between iterations.
async fn run_crawl(config: Config) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));

    let cancel_signal = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; stopping after the current iteration");
            cancel_signal.store(true, Ordering::SeqCst);
        }
    });

    let db_path = config.storage.db_path.clone();
    let artifacts_dir = config.storage.artifacts_dir.clone();

    // The browser driver is blocking; keep it off the async runtime
    let summary = tokio::task::spawn_blocking(move || -> Result<_> {
        let page = ChromePage::launch(&config.browser)?;
        let store = ProjectStore::open(&config.storage.db_path)?;
        pipeline::run_catalog_crawl(&page, &store, &config, &cancel)
    })
    .await
    .map_err(|e| AppError::crawl("crawl task", e))??;

    log::info!(
        "Done: {} new, {} updated, {} unchanged",
        summary.new_ids.len(),
        summary.updated_ids.len(),
        summary.unchanged_ids.len()
    );
    log::info!("Database: {}", db_path);
    log::info!("Artifacts: {}/", artifacts_dir);

    Ok(())
}

/// Download every stored project's card image into `dir`.
async fn download_assets(config: &Config, dir: &std::path::Path) -> Result<()> {
    let store = ProjectStore::open(&config.storage.db_path)?;
    let assets = store.image_assets()?;
    if assets.is_empty() {
        log::info!("No project images recorded yet; run a crawl first");
        return Ok(());
    }

    let jobs: Vec<(String, PathBuf)> = assets
        .into_iter()
        .map(|(project_id, url)| {
            let extension = url
                .rsplit('.')
                .next()
                .filter(|ext| ext.len() <= 4 && !ext.contains('/'))
                .unwrap_or("jpg")
                .to_string();
            let dest = dir.join(format!("{project_id}.{extension}"));
            (url, dest)
        })
        .collect();

    let total = jobs.len();
    let downloader = Downloader::new(&config.download)?;
    let saved = downloader.download_many(jobs).await;
    log::info!("Downloaded {}/{} project images to {:?}", saved, total, dir);

    Ok(())
}
