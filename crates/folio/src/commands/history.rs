//! Read-only command handlers.
//!
//! Handles listing documents and snapshots, showing, restoring and comparing
//! snapshots, statistics and the effective configuration.

use super::{open_existing, Store};
use crate::config::Config;
use folio_snapshot::{DocumentId, RetentionPolicy, Snapshot, SnapshotId};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Handle `documents`.
pub async fn handle_documents(store: &Store) -> anyhow::Result<()> {
    let documents = store.stored_documents().await?;

    if documents.is_empty() {
        println!("No documents found.");
    } else {
        for document in documents {
            println!("{document}");
        }
    }
    Ok(())
}

/// Handle `history`.
pub async fn handle_history(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let history = store.list_history(document).await?;

    if history.is_empty() {
        println!("No snapshots for {document}.");
        return Ok(());
    }

    println!(
        "{:<30} {:<10} {:<20} {:>7}  {}",
        "ID", "KIND", "CAPTURED", "WORDS", "TITLE"
    );
    println!("{}", "-".repeat(80));
    for snapshot in &history {
        println!(
            "{:<30} {:<10} {:<20} {:>7}  {}",
            snapshot.id,
            snapshot.kind,
            snapshot.timestamp.format(TIMESTAMP_FORMAT),
            snapshot.word_count(),
            truncate(&snapshot.title, 40)
        );
    }
    Ok(())
}

/// Handle `show`.
pub async fn handle_show(
    store: &Store,
    document: &DocumentId,
    snapshot_id: &SnapshotId,
) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let snapshot = store.get(document, snapshot_id).await?;

    print_metadata(&snapshot);
    println!();
    print!("{}", snapshot.content);
    if !snapshot.content.is_empty() && !snapshot.content.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Handle `restore`.
pub async fn handle_restore(
    store: &Store,
    document: &DocumentId,
    snapshot_id: &SnapshotId,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let content = store.restore(document, snapshot_id).await?;

    match output {
        Some(path) => {
            tokio::fs::write(path, &content).await?;
            println!("Restored {snapshot_id} to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

/// Handle `diff`.
pub async fn handle_diff(
    store: &Store,
    document: &DocumentId,
    snapshot_id: &SnapshotId,
    file: &Path,
) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let current = tokio::fs::read_to_string(file).await?;
    let diff = store.diff(document, snapshot_id, &current).await?;

    if diff.is_empty() {
        println!("No differences.");
    } else {
        print!("{diff}");
    }
    Ok(())
}

/// Handle `stats`.
pub async fn handle_stats(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let stats = store.stats(document).await?;
    let policy = store.effective_policy(document).await?;

    println!("Document: {}", stats.document_id);
    println!(
        "Snapshots: {} ({} auto, {} milestone)",
        stats.auto_count + stats.milestone_count,
        stats.auto_count,
        stats.milestone_count
    );
    println!("Auto cap: {}", policy.max_auto_snapshots);
    println!("Stored text: {} bytes", stats.total_bytes);
    if let Some(newest) = stats.newest {
        println!("Newest: {}", newest.format(TIMESTAMP_FORMAT));
    }
    if let Some(oldest) = stats.oldest {
        println!("Oldest: {}", oldest.format(TIMESTAMP_FORMAT));
    }
    Ok(())
}

/// Handle `config`.
pub fn show_config(
    config: &Config,
    sources: &[PathBuf],
    data_dir: &Path,
    policy: &RetentionPolicy,
) -> anyhow::Result<()> {
    if sources.is_empty() {
        println!("Config files: (none)");
    } else {
        println!("Config files:");
        for source in sources {
            println!("  {}", source.display());
        }
    }
    println!("Data directory: {}", data_dir.display());
    println!(
        "Log level: {}",
        config.log_level.as_deref().unwrap_or("warn")
    );
    println!();
    println!("Retention policy:");
    println!("{}", serde_json::to_string_pretty(policy)?);
    Ok(())
}

fn print_metadata(snapshot: &Snapshot) {
    println!("Snapshot: {}", snapshot.id);
    println!("Document: {}", snapshot.document_id);
    println!("Title: {}", snapshot.title);
    println!("Kind: {}", snapshot.kind);
    println!(
        "Captured: {}",
        snapshot.timestamp.format(TIMESTAMP_FORMAT)
    );
    println!(
        "Size: {} words, {} bytes",
        snapshot.word_count(),
        snapshot.size_bytes()
    );
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Kapitel über Öl", 10), "Kapitel...");
    }
}
