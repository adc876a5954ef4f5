//! Folio - version history for long-form documents.
//!
//! This is the main entry point for the folio CLI.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::Config;
use folio_snapshot::{DocumentId, SnapshotId, SnapshotStore};
use folio_storage::JsonStorage;
use folio_util::log::{LogConfig, LogLevel};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about = "Version history for long-form documents", long_about = None)]
struct Cli {
    /// Directory holding document histories
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents with stored history
    Documents,
    /// Show a document's snapshots, newest first
    History {
        /// Document ID
        document: String,
    },
    /// Capture a snapshot from a file or stdin
    Capture {
        /// Document ID
        document: String,
        /// Title recorded with the snapshot
        #[arg(short, long)]
        title: String,
        /// Read content from this file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Capture as a milestone (never evicted)
        #[arg(short, long)]
        milestone: bool,
    },
    /// Print a snapshot's metadata and content
    Show {
        /// Document ID
        document: String,
        /// Snapshot ID
        snapshot: String,
    },
    /// Write a snapshot's content to a file or stdout
    Restore {
        /// Document ID
        document: String,
        /// Snapshot ID
        snapshot: String,
        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Mark a snapshot as a milestone
    Pin {
        /// Document ID
        document: String,
        /// Snapshot ID
        snapshot: String,
    },
    /// Remove automatic snapshots older than the cleanup horizon
    Cleanup {
        /// Document ID
        document: String,
    },
    /// Remove all automatic snapshots, keeping milestones
    Clear {
        /// Document ID
        document: String,
    },
    /// Compare a snapshot with a file
    Diff {
        /// Document ID
        document: String,
        /// Snapshot ID
        snapshot: String,
        /// Current version of the document
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Show history statistics
    Stats {
        /// Document ID
        document: String,
    },
    /// Delete a document's history
    Delete {
        /// Document ID
        document: String,
    },
    /// Watch a file and capture snapshots automatically until Ctrl-C
    Watch {
        /// Document ID
        document: String,
        /// File to watch
        #[arg(short, long)]
        file: PathBuf,
        /// Title recorded with snapshots (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let (config, sources) = Config::load(Some(&cwd)).await?;

    init_logging(cli.verbose, &config);
    debug!(sources = ?sources, "Loaded configuration");

    let data_dir = config.data_dir(cli.data_dir.as_deref())?;
    let policy = config.retention_policy()?;

    if let Commands::Config = cli.command {
        return commands::show_config(&config, &sources, &data_dir, &policy);
    }

    debug!(data_dir = %data_dir.display(), "Opening history store");
    let store = SnapshotStore::new(JsonStorage::new(&data_dir), policy)?;

    match cli.command {
        Commands::Documents => commands::handle_documents(&store).await,
        Commands::History { document } => {
            commands::handle_history(&store, &DocumentId::from(document)).await
        }
        Commands::Capture {
            document,
            title,
            file,
            milestone,
        } => {
            commands::handle_capture(
                &store,
                &DocumentId::from(document),
                &title,
                file.as_deref(),
                milestone,
            )
            .await
        }
        Commands::Show { document, snapshot } => {
            commands::handle_show(&store, &DocumentId::from(document), &snapshot_id(snapshot))
                .await
        }
        Commands::Restore {
            document,
            snapshot,
            output,
        } => {
            commands::handle_restore(
                &store,
                &DocumentId::from(document),
                &snapshot_id(snapshot),
                output.as_deref(),
            )
            .await
        }
        Commands::Pin { document, snapshot } => {
            commands::handle_pin(&store, &DocumentId::from(document), &snapshot_id(snapshot)).await
        }
        Commands::Cleanup { document } => {
            commands::handle_cleanup(&store, &DocumentId::from(document)).await
        }
        Commands::Clear { document } => {
            commands::handle_clear(&store, &DocumentId::from(document)).await
        }
        Commands::Diff {
            document,
            snapshot,
            file,
        } => {
            commands::handle_diff(
                &store,
                &DocumentId::from(document),
                &snapshot_id(snapshot),
                &file,
            )
            .await
        }
        Commands::Stats { document } => {
            commands::handle_stats(&store, &DocumentId::from(document)).await
        }
        Commands::Delete { document } => {
            commands::handle_delete(&store, &DocumentId::from(document)).await
        }
        Commands::Watch {
            document,
            file,
            title,
        } => commands::handle_watch(&store, &DocumentId::from(document), &file, title).await,
        Commands::Config => Ok(()),
    }
}

fn snapshot_id(id: String) -> SnapshotId {
    SnapshotId::from_string(id)
}

/// Initialize logging to stderr.
///
/// `--verbose` forces debug level; otherwise the configured `log_level` applies.
fn init_logging(verbose: bool, config: &Config) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        config
            .log_level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or_default()
    };

    folio_util::log::init(LogConfig {
        level,
        include_location: verbose,
        file: None,
    });
}
