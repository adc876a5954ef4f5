//! Auto-capture timer for an attached document.

use crate::{DocumentId, SnapshotStore};
use folio_storage::Storage;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Spawn the timer loop for one document.
pub(crate) fn spawn<S: Storage + 'static>(
    store: SnapshotStore<S>,
    document_id: DocumentId,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run(store, document_id, cancel))
}

/// Tick the document until cancelled or the document goes away.
///
/// The delay is recomputed before every sleep so policy changes and fresh
/// edits take effect on the next tick.
pub(crate) async fn run<S: Storage + 'static>(
    store: SnapshotStore<S>,
    document_id: DocumentId,
    cancel: CancellationToken,
) {
    loop {
        let delay = match store.next_tick_delay(&document_id).await {
            Ok(delay) => delay,
            Err(e) => {
                debug!(document_id = %document_id, error = %e, "Stopping auto-capture timer");
                break;
            }
        };

        if !sleep_with_cancel(delay, &cancel).await || cancel.is_cancelled() {
            break;
        }

        match store.tick_unless_cancelled(&document_id, &cancel).await {
            Ok(outcome) => {
                if let Some(snapshot) = &outcome.captured {
                    debug!(
                        document_id = %document_id,
                        snapshot_id = %snapshot.id,
                        "Auto-captured snapshot"
                    );
                }
            }
            Err(e) if e.is_not_found() => {
                debug!(document_id = %document_id, "Document gone, stopping auto-capture timer");
                break;
            }
            // Persistence failures are retried on the next tick that mutates.
            Err(e) => warn!(document_id = %document_id, error = %e, "Auto-capture tick failed"),
        }
    }
}

/// Sleep for `duration`, returning false if cancelled first.
async fn sleep_with_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RetentionPolicy, SnapshotKind};
    use folio_storage::MemoryStorage;

    async fn attached_store() -> (SnapshotStore<MemoryStorage>, DocumentId) {
        let store = SnapshotStore::new(MemoryStorage::new(), RetentionPolicy::default()).unwrap();
        let doc = DocumentId::from("chapter-1");
        store.attach(&doc).await.unwrap();
        (store, doc)
    }

    #[tokio::test(start_paused = true)]
    async fn captures_pending_edit_each_interval() {
        let (store, doc) = attached_store().await;
        assert!(store.is_attached(&doc));

        store.note_edit(&doc, "first draft", "Ch 1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(301)).await;

        let history = store.list_history(&doc).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "first draft");
        assert_eq!(history[0].kind, SnapshotKind::Auto);

        // No edit since the last capture, nothing new.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.list_history(&doc).await.unwrap().len(), 1);

        store.note_edit(&doc, "second draft", "Ch 1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.list_history(&doc).await.unwrap().len(), 2);

        store.detach_all();
    }

    #[tokio::test(start_paused = true)]
    async fn detached_document_is_not_captured() {
        let (store, doc) = attached_store().await;

        assert!(store.detach(&doc));
        assert!(!store.detach(&doc));
        assert!(!store.is_attached(&doc));

        store.note_edit(&doc, "unsaved", "Ch 1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(601)).await;
        assert!(store.list_history(&doc).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn attach_twice_runs_one_timer() {
        let (store, doc) = attached_store().await;
        store.attach(&doc).await.unwrap();

        store.note_edit(&doc, "once", "Ch 1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(store.list_history(&doc).await.unwrap().len(), 1);

        store.detach_all();
        assert!(!store.is_attached(&doc));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_exits_when_document_is_deleted() {
        let store = SnapshotStore::new(MemoryStorage::new(), RetentionPolicy::default()).unwrap();
        let doc = DocumentId::from("chapter-1");
        store.open(&doc).await.unwrap();

        let handle = spawn(store.clone(), doc.clone(), CancellationToken::new());
        tokio::time::sleep(Duration::from_secs(1)).await;
        store.delete_document(&doc).await.unwrap();

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_loop() {
        let store = SnapshotStore::new(MemoryStorage::new(), RetentionPolicy::default()).unwrap();
        let doc = DocumentId::from("chapter-1");
        store.open(&doc).await.unwrap();

        let cancel = CancellationToken::new();
        let handle = spawn(store.clone(), doc.clone(), cancel.clone());
        cancel.cancel();

        handle.await.unwrap();
    }
}
