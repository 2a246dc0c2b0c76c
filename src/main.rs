use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use conversation_sync::cache::SegmentCache;
use conversation_sync::config::AppConfig;
use conversation_sync::logging::init_logging;
use conversation_sync::repository::JsonFileRepository;
use conversation_sync::utils::group_by_day;
use conversation_sync::{scan, SyncEngine};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan text and print its segments as JSON
    Annotate {
        /// Text to scan
        text: String,
    },
    /// Follow a conversation stored as JSON files
    Watch {
        /// Directory holding <conversation>.json files
        #[arg(short, long)]
        dir: PathBuf,

        /// Conversation to open
        #[arg(short, long)]
        conversation: String,

        /// Override the configured polling period
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = AppConfig::load()?;

    let log_dir = config.logging.file_path.as_ref().map(PathBuf::from);
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        log_dir.as_deref(),
        config.logging.format == "json",
    )?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Annotate { text } => annotate(&text)?,
        Commands::Watch {
            dir,
            conversation,
            interval_ms,
        } => {
            if let Some(ms) = interval_ms {
                config.sync.poll_interval_ms = ms;
                config.validate()?;
            }
            watch(&config, dir, &conversation).await?;
        }
    }

    Ok(())
}

#[allow(clippy::print_stdout)]
fn annotate(text: &str) -> Result<()> {
    let segments = scan(text);
    let json = serde_json::to_string_pretty(&segments).context("Failed to encode segments")?;
    println!("{json}");
    Ok(())
}

async fn watch(config: &AppConfig, dir: PathBuf, conversation: &str) -> Result<()> {
    let repo = Arc::new(JsonFileRepository::new(dir));
    let mut engine = SyncEngine::new(repo.clone(), repo, config.sync.clone());
    let cache = SegmentCache::new(config.scanner.cache_capacity)
        .with_metrics(Arc::clone(engine.metrics()));

    if let Err(e) = engine.start(conversation).await {
        warn!("Initial load failed, polling continues: {e}");
    }
    let mut updates = engine
        .subscribe()
        .context("Conversation closed before it could be watched")?;

    loop {
        {
            let store = updates.borrow_and_update();
            let annotated = cache.annotate(store.messages());
            let links: usize = annotated
                .iter()
                .map(|segs| segs.iter().filter(|s| s.href().is_some()).count())
                .sum();
            info!(
                conversation,
                messages = store.len(),
                days = group_by_day(store.messages()).len(),
                links,
                revision = store.revision(),
                "Conversation updated"
            );
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    engine.stop();
    info!(metrics = ?engine.metrics().snapshot(), "Stopped watching");
    Ok(())
}
