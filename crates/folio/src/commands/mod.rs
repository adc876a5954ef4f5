//! Command handlers for the folio CLI.
//!
//! Read-only commands live in `history`, commands that change a history in
//! `edit`, and the file watcher in `watch`.

pub mod edit;
pub mod history;
pub mod watch;

pub use edit::*;
pub use history::*;
pub use watch::*;

use folio_snapshot::{DocumentId, SnapshotStore};
use folio_storage::JsonStorage;

/// Store type used by every command.
pub type Store = SnapshotStore<JsonStorage>;

/// Open a document that must already have a stored history.
pub(crate) async fn open_existing(store: &Store, document: &DocumentId) -> anyhow::Result<()> {
    if !store.is_stored(document).await? {
        anyhow::bail!("Document not found: {document}");
    }
    store.open(document).await?;
    Ok(())
}
