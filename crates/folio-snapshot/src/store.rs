//! Per-document snapshot history with retention.
//!
//! Every loaded document owns one history behind its own async mutex. All
//! operations on that document, including the persistence write that follows
//! a mutation, run while holding it, so operations on one document apply in
//! the order they were issued while different documents proceed in parallel.

use crate::clock::{Clock, SystemClock};
use crate::diff::unified_diff;
use crate::policy::{RetentionPolicy, TriggerMode};
use crate::scheduler;
use crate::{DocumentId, Snapshot, SnapshotError, SnapshotId, SnapshotKind, SnapshotResult};
use chrono::{DateTime, Utc};
use folio_storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Storage key prefix for persisted histories.
const HISTORY_PREFIX: &str = "history";

/// Shortest wait between two scheduler ticks.
const MIN_TICK_DELAY: Duration = Duration::from_secs(1);

/// What the persistence collaborator stores per document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedHistory {
    pub document_id: DocumentId,
    /// Newest first.
    pub snapshots: Vec<Snapshot>,
    /// Per-document policy override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<RetentionPolicy>,
}

/// Counts and extents of a document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub document_id: DocumentId,
    pub auto_count: usize,
    pub milestone_count: usize,
    pub total_bytes: usize,
    pub newest: Option<DateTime<Utc>>,
    pub oldest: Option<DateTime<Utc>>,
    /// Whether an edit is waiting for the next automatic capture.
    pub pending_edit: bool,
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// Snapshot taken of the pending edit, if one was due.
    pub captured: Option<Snapshot>,
    /// AUTO snapshots removed by age cleanup.
    pub removed: usize,
}

/// Latest live content reported by the editor and not yet captured.
#[derive(Debug, Clone)]
struct Draft {
    content: String,
    title: String,
    edited_at: DateTime<Utc>,
}

#[derive(Debug)]
struct DocumentHistory {
    id: DocumentId,
    /// Newest first, see [`Snapshot::newest_first`].
    snapshots: Vec<Snapshot>,
    policy: Option<RetentionPolicy>,
    draft: Option<Draft>,
    deleted: bool,
}

impl DocumentHistory {
    fn empty(id: DocumentId) -> Self {
        Self {
            id,
            snapshots: Vec::new(),
            policy: None,
            draft: None,
            deleted: false,
        }
    }

    fn from_persisted(id: DocumentId, record: PersistedHistory) -> SnapshotResult<Self> {
        if let Some(policy) = &record.policy {
            policy.validate()?;
        }
        let mut snapshots = record.snapshots;
        snapshots.sort_by(Snapshot::newest_first);
        Ok(Self {
            id,
            snapshots,
            policy: record.policy,
            draft: None,
            deleted: false,
        })
    }

    fn to_persisted(&self) -> PersistedHistory {
        PersistedHistory {
            document_id: self.id.clone(),
            snapshots: self.snapshots.clone(),
            policy: self.policy.clone(),
        }
    }

    fn newest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.snapshots.first().map(|s| s.timestamp)
    }

    fn insert(&mut self, snapshot: Snapshot) {
        self.snapshots.insert(0, snapshot);
        // Ids minted by an earlier process can sort after ours if the wall
        // clock moved backwards between runs.
        if self
            .snapshots
            .get(1)
            .is_some_and(|next| Snapshot::newest_first(&self.snapshots[0], next).is_gt())
        {
            self.snapshots.sort_by(Snapshot::newest_first);
        }
    }

    fn find(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    fn find_mut(&mut self, id: &SnapshotId) -> Option<&mut Snapshot> {
        self.snapshots.iter_mut().find(|s| &s.id == id)
    }

    fn auto_count(&self) -> usize {
        self.snapshots.iter().filter(|s| s.is_auto()).count()
    }

    /// Keep the `cap` newest AUTO snapshots, evicting the rest oldest-first.
    fn enforce_cap(&mut self, cap: usize) -> Vec<SnapshotId> {
        let mut kept = 0;
        let mut evicted = Vec::new();
        // Newest-first order means every AUTO snapshot past the cap is older
        // than all kept ones.
        self.snapshots.retain(|s| {
            if s.is_milestone() {
                return true;
            }
            if kept < cap {
                kept += 1;
                true
            } else {
                evicted.push(s.id.clone());
                false
            }
        });
        evicted
    }

    /// Remove AUTO snapshots with `now - timestamp > horizon`.
    fn remove_expired(&mut self, now: DateTime<Utc>, horizon: chrono::Duration) -> usize {
        let before = self.snapshots.len();
        self.snapshots
            .retain(|s| s.is_milestone() || now.signed_duration_since(s.timestamp) <= horizon);
        before - self.snapshots.len()
    }

    fn clear_auto(&mut self) -> usize {
        let before = self.snapshots.len();
        self.snapshots.retain(Snapshot::is_milestone);
        before - self.snapshots.len()
    }
}

type DocumentHandle = Arc<Mutex<DocumentHistory>>;

struct StoreInner<S> {
    storage: S,
    clock: Arc<dyn Clock>,
    policy: StdRwLock<RetentionPolicy>,
    documents: RwLock<HashMap<DocumentId, DocumentHandle>>,
    timers: StdMutex<HashMap<DocumentId, CancellationToken>>,
}

/// Versioned history of documents.
///
/// The handle is cheap to clone; clones share the same histories, policy and
/// timers.
pub struct SnapshotStore<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for SnapshotStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Storage + 'static> SnapshotStore<S> {
    /// Create a store using the wall clock.
    ///
    /// Fails with `InvalidConfiguration` if the policy is out of range.
    pub fn new(storage: S, policy: RetentionPolicy) -> SnapshotResult<Self> {
        Self::with_clock(storage, policy, Arc::new(SystemClock))
    }

    /// Create a store with an explicit time source.
    pub fn with_clock(
        storage: S,
        policy: RetentionPolicy,
        clock: Arc<dyn Clock>,
    ) -> SnapshotResult<Self> {
        policy.validate()?;
        if !policy.enabled {
            debug!("Automatic snapshots are disabled");
        }
        Ok(Self {
            inner: Arc::new(StoreInner {
                storage,
                clock,
                policy: StdRwLock::new(policy),
                documents: RwLock::new(HashMap::new()),
                timers: StdMutex::new(HashMap::new()),
            }),
        })
    }

    /// The persistence collaborator.
    pub fn storage(&self) -> &S {
        &self.inner.storage
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------

    /// Store-wide retention policy.
    pub fn policy(&self) -> RetentionPolicy {
        self.inner
            .policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the store-wide policy. Takes effect on the next operation.
    pub fn set_policy(&self, policy: RetentionPolicy) -> SnapshotResult<()> {
        policy.validate()?;
        *self
            .inner
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
        info!("Retention policy updated");
        Ok(())
    }

    /// Override (or with `None`, stop overriding) the policy for one document.
    pub async fn set_document_policy(
        &self,
        document_id: &DocumentId,
        policy: Option<RetentionPolicy>,
    ) -> SnapshotResult<()> {
        if let Some(policy) = &policy {
            policy.validate()?;
        }
        let mut history = self.lock_document(document_id).await?;
        history.policy = policy;
        self.persist_locked(&history).await
    }

    /// Policy in force for a document.
    pub async fn effective_policy(
        &self,
        document_id: &DocumentId,
    ) -> SnapshotResult<RetentionPolicy> {
        let history = self.lock_document(document_id).await?;
        Ok(self.policy_for(&history))
    }

    fn policy_for(&self, history: &DocumentHistory) -> RetentionPolicy {
        history.policy.clone().unwrap_or_else(|| self.policy())
    }

    // ------------------------------------------------------------------
    // Document lifecycle
    // ------------------------------------------------------------------

    /// Load a document's history from storage, or start an empty one.
    ///
    /// Opening an already loaded document is a no-op.
    pub async fn open(&self, document_id: &DocumentId) -> SnapshotResult<()> {
        if self.inner.documents.read().await.contains_key(document_id) {
            return Ok(());
        }

        let record: Option<PersistedHistory> = self
            .inner
            .storage
            .read(&[HISTORY_PREFIX, document_id.as_str()])
            .await?;
        let history = match record {
            Some(record) => DocumentHistory::from_persisted(document_id.clone(), record)?,
            None => DocumentHistory::empty(document_id.clone()),
        };
        let count = history.snapshots.len();

        let mut documents = self.inner.documents.write().await;
        documents
            .entry(document_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(history)));
        debug!(document_id = %document_id, snapshots = count, "Opened document history");

        Ok(())
    }

    /// Ids of the loaded documents, sorted.
    pub async fn documents(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.inner.documents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids of every document with a persisted history.
    pub async fn stored_documents(&self) -> SnapshotResult<Vec<DocumentId>> {
        let keys = self.inner.storage.list(&[HISTORY_PREFIX]).await?;
        Ok(keys
            .into_iter()
            .filter_map(|mut key| key.pop())
            .map(DocumentId::from)
            .collect())
    }

    /// Whether the document has a persisted history.
    pub async fn is_stored(&self, document_id: &DocumentId) -> SnapshotResult<bool> {
        Ok(self
            .inner
            .storage
            .exists(&[HISTORY_PREFIX, document_id.as_str()])
            .await?)
    }

    /// Delete a document's history: stop its timer, discard any operation
    /// still queued on it and remove the persisted record.
    pub async fn delete_document(&self, document_id: &DocumentId) -> SnapshotResult<()> {
        self.detach(document_id);

        let handle = self
            .inner
            .documents
            .write()
            .await
            .remove(document_id)
            .ok_or_else(|| SnapshotError::document_not_found(document_id.as_str()))?;

        let mut history = handle.lock().await;
        history.deleted = true;
        history.snapshots.clear();
        history.draft = None;

        self.inner
            .storage
            .remove(&[HISTORY_PREFIX, document_id.as_str()])
            .await?;
        info!(document_id = %document_id, "Deleted document history");

        Ok(())
    }

    // ------------------------------------------------------------------
    // Capture / restore / pin
    // ------------------------------------------------------------------

    /// Capture the given content as a new snapshot.
    ///
    /// The snapshot is prepended to the history, then the AUTO cap is
    /// enforced. Empty content is allowed.
    pub async fn capture(
        &self,
        document_id: &DocumentId,
        content: impl Into<String>,
        title: impl Into<String>,
        kind: SnapshotKind,
    ) -> SnapshotResult<Snapshot> {
        let mut history = self.lock_document(document_id).await?;
        let snapshot = self.capture_locked(&mut history, content.into(), title.into(), kind);
        self.persist_locked(&history).await?;
        Ok(snapshot)
    }

    fn capture_locked(
        &self,
        history: &mut DocumentHistory,
        content: String,
        title: String,
        kind: SnapshotKind,
    ) -> Snapshot {
        let policy = self.policy_for(history);
        let now = self.inner.clock.now();
        // Timestamps never go backwards within a history.
        let timestamp = history.newest_timestamp().map_or(now, |newest| newest.max(now));

        if history
            .draft
            .as_ref()
            .is_some_and(|draft| draft.content == content)
        {
            history.draft = None;
        }

        let snapshot = Snapshot::new(history.id.clone(), timestamp, title, content, kind);
        history.insert(snapshot.clone());
        let evicted = history.enforce_cap(policy.max_auto_snapshots);

        info!(
            document_id = %history.id,
            snapshot_id = %snapshot.id,
            kind = %kind,
            "Captured snapshot"
        );
        if !evicted.is_empty() {
            debug!(
                document_id = %history.id,
                evicted = evicted.len(),
                cap = policy.max_auto_snapshots,
                "Evicted AUTO snapshots over cap"
            );
        }

        snapshot
    }

    /// Content of a snapshot, for the caller to apply to the live document.
    ///
    /// Restoring does not touch the history and can be repeated.
    pub async fn restore(
        &self,
        document_id: &DocumentId,
        snapshot_id: &SnapshotId,
    ) -> SnapshotResult<String> {
        let history = self.lock_document(document_id).await?;
        let snapshot = history
            .find(snapshot_id)
            .ok_or_else(|| SnapshotError::not_found(snapshot_id.as_str()))?;
        debug!(document_id = %document_id, snapshot_id = %snapshot_id, "Restoring snapshot");
        Ok(snapshot.content.clone())
    }

    /// Promote a snapshot to milestone, exempting it from all eviction.
    ///
    /// Pinning a milestone returns it unchanged and writes nothing.
    pub async fn pin(
        &self,
        document_id: &DocumentId,
        snapshot_id: &SnapshotId,
    ) -> SnapshotResult<Snapshot> {
        let mut history = self.lock_document(document_id).await?;
        let snapshot = history
            .find_mut(snapshot_id)
            .ok_or_else(|| SnapshotError::not_found(snapshot_id.as_str()))?;

        if snapshot.is_milestone() {
            return Ok(snapshot.clone());
        }

        snapshot.kind = SnapshotKind::Milestone;
        let pinned = snapshot.clone();
        info!(
            document_id = %document_id,
            snapshot_id = %snapshot_id,
            "Pinned snapshot as milestone"
        );

        self.persist_locked(&history).await?;
        Ok(pinned)
    }

    /// A single snapshot.
    pub async fn get(
        &self,
        document_id: &DocumentId,
        snapshot_id: &SnapshotId,
    ) -> SnapshotResult<Snapshot> {
        let history = self.lock_document(document_id).await?;
        history
            .find(snapshot_id)
            .cloned()
            .ok_or_else(|| SnapshotError::not_found(snapshot_id.as_str()))
    }

    /// Newest-first copy of the document's history.
    pub async fn list_history(&self, document_id: &DocumentId) -> SnapshotResult<Vec<Snapshot>> {
        let history = self.lock_document(document_id).await?;
        Ok(history.snapshots.clone())
    }

    /// Summary of the document's history.
    pub async fn stats(&self, document_id: &DocumentId) -> SnapshotResult<HistoryStats> {
        let history = self.lock_document(document_id).await?;
        let auto_count = history.auto_count();
        Ok(HistoryStats {
            document_id: history.id.clone(),
            auto_count,
            milestone_count: history.snapshots.len() - auto_count,
            total_bytes: history.snapshots.iter().map(Snapshot::size_bytes).sum(),
            newest: history.snapshots.first().map(|s| s.timestamp),
            oldest: history.snapshots.last().map(|s| s.timestamp),
            pending_edit: history.draft.is_some(),
        })
    }

    /// Unified diff from a snapshot to the given live content.
    pub async fn diff(
        &self,
        document_id: &DocumentId,
        snapshot_id: &SnapshotId,
        current: &str,
    ) -> SnapshotResult<String> {
        let snapshot = self.get(document_id, snapshot_id).await?;
        Ok(unified_diff(
            &snapshot.content,
            current,
            &format!("{} ({})", snapshot.title, snapshot.id),
            &format!("{} (current)", snapshot.title),
        ))
    }

    // ------------------------------------------------------------------
    // Retention
    // ------------------------------------------------------------------

    /// Remove AUTO snapshots older than the cleanup horizon as of `now`.
    ///
    /// Does nothing when the policy is disabled or the horizon is `Never`.
    pub async fn run_cleanup(
        &self,
        document_id: &DocumentId,
        now: DateTime<Utc>,
    ) -> SnapshotResult<usize> {
        let mut history = self.lock_document(document_id).await?;
        let removed = self.cleanup_locked(&mut history, now);
        if removed > 0 {
            self.persist_locked(&history).await?;
        }
        Ok(removed)
    }

    fn cleanup_locked(&self, history: &mut DocumentHistory, now: DateTime<Utc>) -> usize {
        let policy = self.policy_for(history);
        if !policy.enabled {
            return 0;
        }
        let Some(horizon) = policy.cleanup_horizon.as_duration() else {
            return 0;
        };

        let removed = history.remove_expired(now, horizon);
        if removed > 0 {
            info!(document_id = %history.id, removed, "Removed expired AUTO snapshots");
        }
        removed
    }

    /// Remove every AUTO snapshot of the document, keeping milestones.
    pub async fn clear_auto(&self, document_id: &DocumentId) -> SnapshotResult<usize> {
        let mut history = self.lock_document(document_id).await?;
        let removed = history.clear_auto();
        if removed > 0 {
            info!(document_id = %document_id, removed, "Cleared AUTO snapshots");
            self.persist_locked(&history).await?;
        }
        Ok(removed)
    }

    /// Write the document's current history to storage again.
    ///
    /// Safe to repeat; used to retry after a `Persistence` error.
    pub async fn persist(&self, document_id: &DocumentId) -> SnapshotResult<()> {
        let history = self.lock_document(document_id).await?;
        self.persist_locked(&history).await
    }

    // ------------------------------------------------------------------
    // Editor and scheduler entry points
    // ------------------------------------------------------------------

    /// Record the live content after an edit. The next due tick captures it.
    pub async fn note_edit(
        &self,
        document_id: &DocumentId,
        content: impl Into<String>,
        title: impl Into<String>,
    ) -> SnapshotResult<()> {
        let mut history = self.lock_document(document_id).await?;
        history.draft = Some(Draft {
            content: content.into(),
            title: title.into(),
            edited_at: self.inner.clock.now(),
        });
        Ok(())
    }

    /// Drop the pending edit without capturing it. Returns whether one was
    /// pending.
    ///
    /// Used when the live content has gone back to the newest snapshot.
    pub async fn discard_edit(&self, document_id: &DocumentId) -> SnapshotResult<bool> {
        let mut history = self.lock_document(document_id).await?;
        Ok(history.draft.take().is_some())
    }

    /// Scheduler callback: capture the pending edit if it is due, then run
    /// age cleanup.
    pub async fn on_tick(&self, document_id: &DocumentId) -> SnapshotResult<TickOutcome> {
        let history = self.lock_document(document_id).await?;
        self.tick_locked(history).await
    }

    /// Like [`on_tick`](Self::on_tick), but does nothing if `cancel` fired
    /// while waiting for the document lock.
    pub(crate) async fn tick_unless_cancelled(
        &self,
        document_id: &DocumentId,
        cancel: &CancellationToken,
    ) -> SnapshotResult<TickOutcome> {
        let history = self.lock_document(document_id).await?;
        if cancel.is_cancelled() {
            return Ok(TickOutcome::default());
        }
        self.tick_locked(history).await
    }

    async fn tick_locked(
        &self,
        mut history: OwnedMutexGuard<DocumentHistory>,
    ) -> SnapshotResult<TickOutcome> {
        let policy = self.policy_for(&history);
        let now = self.inner.clock.now();
        let mut outcome = TickOutcome::default();

        if !policy.enabled {
            return Ok(outcome);
        }

        let due = history.draft.as_ref().is_some_and(|draft| match policy.trigger_mode {
            TriggerMode::Interval => true,
            TriggerMode::Idle => {
                now.signed_duration_since(draft.edited_at)
                    >= chrono::Duration::seconds(i64::from(policy.idle_seconds))
            }
        });
        if due {
            if let Some(draft) = history.draft.take() {
                outcome.captured = Some(self.capture_locked(
                    &mut history,
                    draft.content,
                    draft.title,
                    SnapshotKind::Auto,
                ));
            }
        }

        outcome.removed = self.cleanup_locked(&mut history, now);

        if outcome.captured.is_some() || outcome.removed > 0 {
            self.persist_locked(&history).await?;
        }
        Ok(outcome)
    }

    /// How long the scheduler should wait before the next tick.
    ///
    /// Reads the current policy, so policy changes apply from the next tick.
    pub async fn next_tick_delay(&self, document_id: &DocumentId) -> SnapshotResult<Duration> {
        let history = self.lock_document(document_id).await?;
        let policy = self.policy_for(&history);

        let delay = match (&history.draft, policy.trigger_mode, policy.enabled) {
            (Some(draft), TriggerMode::Idle, true) => {
                let deadline =
                    draft.edited_at + chrono::Duration::seconds(i64::from(policy.idle_seconds));
                deadline
                    .signed_duration_since(self.inner.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO)
            }
            _ => policy.trigger_period(),
        };

        Ok(delay.max(MIN_TICK_DELAY))
    }

    /// Open the document and start its auto-capture timer.
    ///
    /// Attaching an attached document is a no-op.
    pub async fn attach(&self, document_id: &DocumentId) -> SnapshotResult<()> {
        self.open(document_id).await?;

        let token = CancellationToken::new();
        {
            let mut timers = self.timers();
            if timers.contains_key(document_id) {
                return Ok(());
            }
            timers.insert(document_id.clone(), token.clone());
        }

        scheduler::spawn(self.clone(), document_id.clone(), token);
        debug!(document_id = %document_id, "Attached auto-capture timer");
        Ok(())
    }

    /// Stop the document's auto-capture timer. Returns whether one was running.
    ///
    /// No tick takes effect once this returns; a tick already holding the
    /// document lock finishes.
    pub fn detach(&self, document_id: &DocumentId) -> bool {
        match self.timers().remove(document_id) {
            Some(token) => {
                token.cancel();
                debug!(document_id = %document_id, "Detached auto-capture timer");
                true
            }
            None => false,
        }
    }

    /// Stop every running timer.
    pub fn detach_all(&self) {
        for (document_id, token) in self.timers().drain() {
            token.cancel();
            debug!(document_id = %document_id, "Detached auto-capture timer");
        }
    }

    /// Whether the document has a running auto-capture timer.
    pub fn is_attached(&self, document_id: &DocumentId) -> bool {
        self.timers().contains_key(document_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<DocumentId, CancellationToken>> {
        self.inner
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn lock_document(
        &self,
        document_id: &DocumentId,
    ) -> SnapshotResult<OwnedMutexGuard<DocumentHistory>> {
        let handle = self
            .inner
            .documents
            .read()
            .await
            .get(document_id)
            .cloned()
            .ok_or_else(|| SnapshotError::document_not_found(document_id.as_str()))?;

        let history = handle.lock_owned().await;
        if history.deleted {
            return Err(SnapshotError::document_not_found(document_id.as_str()));
        }
        Ok(history)
    }

    async fn persist_locked(&self, history: &DocumentHistory) -> SnapshotResult<()> {
        let record = history.to_persisted();
        match self
            .inner
            .storage
            .write(&[HISTORY_PREFIX, history.id.as_str()], &record)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(document_id = %history.id, error = %e, "Failed to persist history");
                Err(SnapshotError::Persistence(e))
            }
        }
    }
}
