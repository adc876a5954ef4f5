//! Command handlers that change a document's history.

use super::{open_existing, Store};
use folio_snapshot::{DocumentId, SnapshotId, SnapshotKind};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Handle `capture`. Content comes from `file`, or stdin when absent.
pub async fn handle_capture(
    store: &Store,
    document: &DocumentId,
    title: &str,
    file: Option<&Path>,
    milestone: bool,
) -> anyhow::Result<()> {
    let content = match file {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    let kind = if milestone {
        SnapshotKind::Milestone
    } else {
        SnapshotKind::Auto
    };

    store.open(document).await?;
    let snapshot = store.capture(document, content, title, kind).await?;

    println!("Captured {} snapshot {}", snapshot.kind, snapshot.id);
    Ok(())
}

/// Handle `pin`.
pub async fn handle_pin(
    store: &Store,
    document: &DocumentId,
    snapshot_id: &SnapshotId,
) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let snapshot = store.pin(document, snapshot_id).await?;
    println!("Pinned {} as milestone", snapshot.id);
    Ok(())
}

/// Handle `cleanup`.
pub async fn handle_cleanup(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let removed = store.run_cleanup(document, store.now()).await?;
    println!("Removed {removed} expired snapshot(s)");
    Ok(())
}

/// Handle `clear`.
pub async fn handle_clear(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    let removed = store.clear_auto(document).await?;
    println!("Removed {removed} automatic snapshot(s)");
    Ok(())
}

/// Handle `delete`.
pub async fn handle_delete(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    open_existing(store, document).await?;
    store.delete_document(document).await?;
    println!("Deleted history for {document}");
    Ok(())
}
