//! Relay CLI
//!
//! Local execution entry point.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use relay::{
    error::Result,
    harvest::SpoolHarvester,
    models::{Config, ItemStatus},
    pipeline::{self, DeliveryDriver, RelayOptions},
    publisher::{DryRunPublisher, HttpPublisher, Publisher},
    segment::Segmenter,
    storage::{ItemStore, LocalStorage, MemoryStore},
};

/// Relay - community content to social feed
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Relays harvested community content as length-limited posts"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log posts instead of publishing; the item store is not modified
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest, register and deliver in a loop
    Run {
        /// Run a single round and exit
        #[arg(long)]
        once: bool,

        /// Maximum accepted posts per pass (implies --once)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Harvest and register new items without delivering
    Ingest,

    /// Deliver the current backlog once
    Deliver {
        /// Maximum accepted posts per pass
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show how a message would be split into posts
    Preview {
        /// Header repeated on every post
        #[arg(long, default_value = "")]
        header: String,

        /// Mark placed after the header of every post but the first
        #[arg(long)]
        continued: Option<String>,

        /// Mark placed at the end of every post but the last
        #[arg(long = "continue")]
        continue_mark: Option<String>,

        /// Message body
        body: String,
    },

    /// Show item counts per destination and status
    Status,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Copy the `UNPROCESSED` backlog into memory so a dry run never touches
/// the local store.
async fn dry_run_store(config: &Config, local: &LocalStorage) -> Result<MemoryStore> {
    let store = MemoryStore::new();
    for destination in &config.destinations {
        for item in local
            .find_by_status(&destination.id, ItemStatus::Unprocessed)
            .await?
        {
            store.upsert(&item).await?;
        }
    }
    Ok(store)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    log::info!("Relay starting...");
    log::info!("Loaded configuration from {}", cli.config.display());

    let local = LocalStorage::new(&config.storage.root);
    let dry_store;
    let store: &dyn ItemStore = if cli.dry_run {
        log::info!("Dry run: posts are logged, the item store is left untouched");
        dry_store = dry_run_store(&config, &local).await?;
        &dry_store
    } else {
        &local
    };

    let harvester = if cli.dry_run {
        SpoolHarvester::read_only(&config.harvest.spool_dir)
    } else {
        SpoolHarvester::new(&config.harvest.spool_dir)
    };

    let publisher: Box<dyn Publisher> = if cli.dry_run {
        Box::new(DryRunPublisher::new())
    } else {
        Box::new(HttpPublisher::new(&config.delivery)?)
    };

    match cli.command {
        Command::Run { once, limit } => {
            config.validate()?;
            let options = RelayOptions { once, limit };
            pipeline::run_relay(&config, store, &harvester, publisher.as_ref(), options).await?;
        }

        Command::Ingest => {
            config.validate()?;
            for destination in &config.destinations {
                match pipeline::collect(destination, store, &harvester).await {
                    Ok(report) => log::info!(
                        "{}: {} registered, {} skipped",
                        destination.id,
                        report.registered,
                        report.skipped
                    ),
                    Err(e) => log::error!("Failed to ingest {}: {e}", destination.id),
                }
            }
        }

        Command::Deliver { limit } => {
            config.validate()?;
            let driver = DeliveryDriver::new(&config, store, publisher.as_ref())?;
            let limit = limit.or(config.delivery.limit);
            for destination in &config.destinations {
                match driver.run_pass(destination, limit).await {
                    Ok(report) => report.log_summary(),
                    Err(e) => log::error!("Delivery failed for {}: {e}", destination.id),
                }
            }
        }

        Command::Preview {
            header,
            continued,
            continue_mark,
            body,
        } => {
            let segmenter = Segmenter::from_config(&config.segment)?;
            let continued = continued.unwrap_or_else(|| config.segment.continued_mark.clone());
            let continue_mark =
                continue_mark.unwrap_or_else(|| config.segment.continue_mark.clone());

            let posts = segmenter.segment(&header, &continued, &body, &continue_mark)?;
            for (index, post) in posts.iter().enumerate() {
                println!(
                    "--- post {}/{} ({} of {}) ---",
                    index + 1,
                    posts.len(),
                    segmenter.counted_len(post),
                    segmenter.max_length()
                );
                println!("{post}");
            }
        }

        Command::Status => {
            if config.destinations.is_empty() {
                log::warn!("No destinations configured in {}", cli.config.display());
            }
            for destination in &config.destinations {
                let counts: BTreeMap<ItemStatus, usize> =
                    store.count_by_status(&destination.id).await?;
                let line = ItemStatus::ALL
                    .iter()
                    .map(|status| format!("{}={}", status, counts.get(status).unwrap_or(&0)))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{}: {}", destination.id, line);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            for destination in &config.destinations {
                if let Err(e) = destination.token() {
                    log::warn!("{e}");
                }
            }
            log::info!(
                "✓ Config OK ({} destinations)",
                config.destinations.len()
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
