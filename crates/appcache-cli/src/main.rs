//! appcache - keeps a local copy of the Steam application catalog and icons.
//!
//! Catalog failures are fatal: the user is notified and the process exits
//! non-zero. Icon failures are logged and the command carries on, printing
//! a placeholder instead of a path.

mod config;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use appcache_core::collab::{LogNotifier, Notifier, OwnedSet};
use appcache_core::{
    AppId, AssetFetcher, CatalogSync, PathResolver, RetrievalStrategy, SyncError,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;

/// Printed instead of a path when an icon could not be cached
const ICON_PLACEHOLDER: &str = "(no icon)";

#[derive(Debug, Parser)]
#[command(name = "appcache", version, about = "Local cache of the Steam app catalog and icons")]
struct Cli {
    /// Where the app id list comes from: full_list, filtered_list or raw_list
    #[arg(long, global = true)]
    strategy: Option<RetrievalStrategy>,

    /// Seconds before a catalog file is downloaded again
    #[arg(long, global = true)]
    ttl_secs: Option<u64>,

    /// Cache root directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download stale catalog files and report the catalog size
    Sync {
        /// Download every catalog file regardless of age
        #[arg(long)]
        force: bool,
    },
    /// Print the display name of each app id
    Name {
        #[arg(required = true)]
        ids: Vec<AppId>,
    },
    /// List catalog entries whose name contains a term
    Search { term: String },
    /// Cache the header icon of each app id
    Icon {
        #[arg(required = true)]
        ids: Vec<AppId>,
    },
    /// Cache one achievement icon
    AchievementIcon {
        id: AppId,
        achievement_id: String,
        remote_name: String,
    },
    /// List owned apps from a file of app ids, one per line
    Owned { ids_file: PathBuf },
    /// Show cache location and catalog file ages
    Status,
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    match run(cli, &LogNotifier) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Merge command-line overrides into the stored configuration.
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(strategy) = cli.strategy {
        config.retrieval_strategy = strategy;
    }
    if let Some(ttl) = cli.ttl_secs {
        config.catalog_ttl_secs = ttl;
    }
    config.cache_dir_override = cli.cache_dir.clone();
    Ok(config)
}

fn build_sync(config: &Config) -> Result<CatalogSync> {
    let cache_dir = config.cache_dir()?;
    let fetcher = AssetFetcher::with_connect_timeout(config.connect_timeout())
        .context("Failed to create HTTP client")?;
    Ok(CatalogSync::new(PathResolver::new(cache_dir), fetcher)
        .with_strategy(config.retrieval_strategy)
        .with_catalog_ttl(config.catalog_ttl()))
}

fn run(cli: Cli, notifier: &dyn Notifier) -> Result<ExitCode> {
    let config = effective_config(&cli)?;

    if let Command::Config { save } = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        if save {
            let path = config.save()?;
            eprintln!("Saved to {}", path.display());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut sync = build_sync(&config)?;
    info!(
        cache_dir = %sync.resolver().cache_root().display(),
        strategy = %sync.strategy(),
        "appcache starting"
    );

    match cli.command {
        Command::Sync { force } => {
            if force {
                sync.force_refresh();
            }
            if !ensure_catalog(&mut sync, notifier) {
                return Ok(ExitCode::FAILURE);
            }
            println!("{} apps in catalog", sync.store().len());
        }
        Command::Name { ids } => {
            if !ensure_catalog(&mut sync, notifier) {
                return Ok(ExitCode::FAILURE);
            }
            for id in ids {
                println!("{}\t{}", id, sync.get_display_name(id));
            }
        }
        Command::Search { term } => {
            if !ensure_catalog(&mut sync, notifier) {
                return Ok(ExitCode::FAILURE);
            }
            for (id, name) in sync.store().search(&term) {
                println!("{}\t{}", id, name);
            }
        }
        Command::Icon { ids } => {
            for id in ids {
                let result = sync.ensure_icon_cached(id).map(|_| sync.icon_path(id));
                if !print_asset(id, result, notifier) {
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Command::AchievementIcon {
            id,
            achievement_id,
            remote_name,
        } => {
            let result = sync
                .ensure_achievement_icon_cached(id, &achievement_id, &remote_name)
                .map(|_| sync.achievement_icon_path(id, &achievement_id));
            if !print_asset(id, result, notifier) {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Owned { ids_file } => {
            let text = std::fs::read_to_string(&ids_file)
                .with_context(|| format!("Failed to read {}", ids_file.display()))?;
            let owned = OwnedSet::parse(&text)
                .with_context(|| format!("Invalid app id in {}", ids_file.display()))?;
            if !ensure_catalog(&mut sync, notifier) {
                return Ok(ExitCode::FAILURE);
            }
            for (id, name) in sync.owned_apps(&owned) {
                println!("{}\t{}", id, name);
            }
        }
        Command::Status => print_status(&sync)?,
        // Handled before the cache is opened
        Command::Config { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}

/// Bring the catalog up to date. Returns false after notifying on a fatal error.
///
/// A network failure falls back to the files already on disk; only when
/// nothing usable is cached does it become fatal.
fn ensure_catalog(sync: &mut CatalogSync, notifier: &dyn Notifier) -> bool {
    let err = match sync.ensure_catalog_current() {
        Ok(report) => {
            info!(
                refreshed = report.refreshed.len(),
                reloaded = report.reloaded,
                entries = report.entries,
                "Catalog ready"
            );
            return true;
        }
        Err(e) => e,
    };

    if !err.is_fatal() {
        warn!(error = %err, "Catalog refresh failed, using cached copy");
        match sync.load_cached() {
            Ok(entries) => {
                info!(entries, "Loaded cached catalog");
                return true;
            }
            Err(cached_err) => {
                warn!(error = %cached_err, "No usable cached catalog");
            }
        }
    }

    notifier.notify_fatal(&err.user_message());
    false
}

/// Print the local path of a cached asset, or a placeholder when the
/// download failed for a recoverable reason. Returns false on a fatal error.
fn print_asset(
    id: AppId,
    result: Result<Option<PathBuf>, SyncError>,
    notifier: &dyn Notifier,
) -> bool {
    match result {
        Ok(Some(path)) => {
            println!("{}\t{}", id, path.display());
            true
        }
        Ok(None) => {
            println!("{}\t{}", id, ICON_PLACEHOLDER);
            true
        }
        Err(e) if e.is_fatal() => {
            notifier.notify_fatal(&e.user_message());
            false
        }
        Err(e) => {
            warn!(app_id = id, error = %e, "Icon unavailable");
            println!("{}\t{}", id, ICON_PLACEHOLDER);
            true
        }
    }
}

fn print_status(sync: &CatalogSync) -> Result<()> {
    println!("cache dir: {}", sync.resolver().cache_root().display());
    println!("strategy:  {}", sync.strategy());
    println!("ttl:       {}s", sync.catalog_ttl().as_secs());
    for (source, age) in sync.catalog_ages()? {
        match age {
            Some(age) => {
                let state = if age.is_stale(sync.catalog_ttl()) {
                    "stale"
                } else {
                    "fresh"
                };
                println!("{:<16} {} ({})", source.file_name(), age.age_display(), state);
            }
            None => println!("{:<16} never", source.file_name()),
        }
    }
    Ok(())
}
