//! `watch`: act as the editor for a file on disk.
//!
//! File changes are reported to the store as edits; the store's timer decides
//! when they become AUTO snapshots.

use super::Store;
use anyhow::Context;
use folio_snapshot::DocumentId;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle `watch`. Runs until Ctrl-C.
pub async fn handle_watch(
    store: &Store,
    document: &DocumentId,
    file: &Path,
    title: Option<String>,
) -> anyhow::Result<()> {
    let path = tokio::fs::canonicalize(file)
        .await
        .with_context(|| format!("cannot watch {}", file.display()))?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .context("watched file has no parent directory")?;
    let title = title.unwrap_or_else(|| default_title(&path));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    // Editors often save by replacing the file, so watch the directory.
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    store.attach(document).await?;
    note_if_changed(store, document, &path, &title).await?;

    let policy = store.effective_policy(document).await?;
    println!(
        "Watching {} as {} ({:?} mode). Press Ctrl-C to stop.",
        path.display(),
        document,
        policy.trigger_mode
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            event = rx.recv() => match event {
                Some(Ok(event)) if touches(&event, &path) => {
                    debug!(kind = ?event.kind, "Watched file changed");
                    if let Err(e) = note_if_changed(store, document, &path, &title).await {
                        break Err(e);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => warn!(error = %e, "File watcher error"),
                None => break Ok(()),
            },
        }
    };

    store.detach(document);
    let stats = store.stats(document).await?;
    println!(
        "Stopped. {} auto, {} milestone snapshot(s) stored.",
        stats.auto_count, stats.milestone_count
    );
    result
}

/// Report the file's content as an edit. Content matching the newest snapshot
/// drops any pending edit instead.
async fn note_if_changed(
    store: &Store,
    document: &DocumentId,
    path: &Path,
    title: &str,
) -> anyhow::Result<()> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        // Mid-save the file can be briefly missing.
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Could not read watched file");
            return Ok(());
        }
    };

    let newest = store.list_history(document).await?.into_iter().next();
    if newest.is_some_and(|s| s.content == content) {
        if store.discard_edit(document).await? {
            debug!(document_id = %document, "File reverted, dropped pending edit");
        }
        return Ok(());
    }
    store.note_edit(document, content, title).await?;
    Ok(())
}

fn touches(event: &Event, path: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event.paths.iter().any(|p| p == path)
}

fn default_title(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_snapshot::{RetentionPolicy, SnapshotKind};
    use folio_storage::JsonStorage;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;
    use tempfile::TempDir;

    async fn watched_store() -> (TempDir, Store, DocumentId, PathBuf) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(
            JsonStorage::new(dir.path().join("data")),
            RetentionPolicy::default(),
        )
        .unwrap();
        let doc = DocumentId::from("chapter-1");
        store.open(&doc).await.unwrap();
        let file = dir.path().join("chapter-1.md");
        (dir, store, doc, file)
    }

    #[tokio::test]
    async fn edit_then_revert_captures_nothing() {
        let (_dir, store, doc, file) = watched_store().await;
        store
            .capture(&doc, "A", "Ch 1", SnapshotKind::Auto)
            .await
            .unwrap();

        tokio::fs::write(&file, "B").await.unwrap();
        note_if_changed(&store, &doc, &file, "Ch 1").await.unwrap();
        assert!(store.stats(&doc).await.unwrap().pending_edit);

        tokio::fs::write(&file, "A").await.unwrap();
        note_if_changed(&store, &doc, &file, "Ch 1").await.unwrap();
        assert!(!store.stats(&doc).await.unwrap().pending_edit);

        let outcome = store.on_tick(&doc).await.unwrap();
        assert!(outcome.captured.is_none());
        let history = store.list_history(&doc).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "A");
    }

    #[tokio::test]
    async fn changed_file_is_captured_on_tick() {
        let (_dir, store, doc, file) = watched_store().await;

        tokio::fs::write(&file, "fresh words").await.unwrap();
        note_if_changed(&store, &doc, &file, "Ch 1").await.unwrap();

        let captured = store.on_tick(&doc).await.unwrap().captured.unwrap();
        assert_eq!(captured.content, "fresh words");
        assert_eq!(captured.title, "Ch 1");
    }

    #[test]
    fn only_changes_to_the_watched_file_count() {
        let path = PathBuf::from("/books/novel/chapter-1.md");

        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path.clone());
        assert!(touches(&modify, &path));

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        assert!(touches(&create, &path));

        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/books/novel/chapter-2.md"));
        assert!(!touches(&other, &path));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(path.clone());
        assert!(!touches(&access, &path));
    }

    #[test]
    fn default_title_is_file_stem() {
        assert_eq!(default_title(Path::new("/a/chapter-3.md")), "chapter-3");
    }
}
