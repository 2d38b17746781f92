//! # Sync Orchestrator
//!
//! Runs one push-then-pull cycle between the local item store and the
//! backend.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          sync_all()                                     │
//! │                                                                         │
//! │  0. signed in? ── no ──► NotAuthenticated (nothing read, nothing sent)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. PUSH   for each needs_sync row, one call at a time:                 │
//! │            ┌──────────────┬────────────┬────────────────────────────┐   │
//! │            │ server_id    │ deleted_at │ action                     │   │
//! │            ├──────────────┼────────────┼────────────────────────────┤   │
//! │            │ None         │ None       │ CREATE  → store server id  │   │
//! │            │ Some         │ None       │ UPDATE  → store version    │   │
//! │            │ Some         │ Some       │ DELETE  → store version    │   │
//! │            │ None         │ Some       │ DROP_LOCAL (no call)       │   │
//! │            └──────────────┴────────────┴────────────────────────────┘   │
//! │            item failure  → recorded, row stays pending, loop goes on    │
//! │            network/auth  → cycle aborts                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. PULL   list_items(since = cursor, limit = page size), one page      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. APPLY  per remote item, matched on server id:                       │
//! │            no local row        → insert as synced                       │
//! │            local, not pending  → overwrite                              │
//! │            local, pending      → ConflictResolver (LWW)                 │
//! │              local wins        → keep content, base := pulled version   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. cursor := now  ──► Success(stats)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The orchestrator holds no locks. Running two cycles at once is prevented
//! by the scheduler's per-job guard.

use std::sync::Arc;

use tracing::{debug, info, warn};

use scanium_core::{
    ConflictResolver, LocalItem, PushAction, RemoteItem, Winner, DEFAULT_PULL_PAGE_SIZE,
};

use crate::auth::AuthProvider;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::local::LocalStore;
use crate::remote::{CreateItemRequest, RemoteClient, UpdateItemRequest};
use crate::state::{Clock, CursorStore, SystemClock};

// =============================================================================
// Outcome Types
// =============================================================================

/// A push that failed for one item without ending the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushFailure {
    pub local_id: String,
    pub action: PushAction,
    pub error: RemoteError,
}

/// Counters for one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Remote creates, updates and deletes acknowledged.
    pub pushed: usize,
    /// Remote items received in the pull page.
    pub pulled: usize,
    /// Pulled items that met a pending local edit.
    pub conflicts: usize,
    /// Never-synced tombstones removed without a remote call.
    pub dropped: usize,
    pub push_failures: Vec<PushFailure>,
}

/// Result of one [`SyncOrchestrator::sync_all`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success(SyncStats),
    NotAuthenticated,
    NetworkError(String),
    ServerError(String),
}

impl SyncOutcome {
    /// Classifies a cycle-ending error.
    pub fn from_error(err: SyncError) -> Self {
        match err {
            SyncError::Remote(RemoteError::Network(cause)) => SyncOutcome::NetworkError(cause),
            SyncError::Remote(RemoteError::Unauthorized) => SyncOutcome::NotAuthenticated,
            other => SyncOutcome::ServerError(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success(_))
    }

    pub fn stats(&self) -> Option<&SyncStats> {
        match self {
            SyncOutcome::Success(stats) => Some(stats),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOutcome::Success(stats) => write!(
                f,
                "success (pushed {}, pulled {}, conflicts {})",
                stats.pushed, stats.pulled, stats.conflicts
            ),
            SyncOutcome::NotAuthenticated => write!(f, "not authenticated"),
            SyncOutcome::NetworkError(cause) => write!(f, "network error: {cause}"),
            SyncOutcome::ServerError(cause) => write!(f, "server error: {cause}"),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives push, pull and apply for one cycle.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteClient>,
    local: Arc<dyn LocalStore>,
    auth: Arc<dyn AuthProvider>,
    cursor: CursorStore,
    clock: Arc<dyn Clock>,
    pull_page_size: u32,
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteClient>,
        local: Arc<dyn LocalStore>,
        auth: Arc<dyn AuthProvider>,
        cursor: CursorStore,
    ) -> Self {
        SyncOrchestrator {
            remote,
            local,
            auth,
            cursor,
            clock: Arc::new(SystemClock),
            pull_page_size: DEFAULT_PULL_PAGE_SIZE,
        }
    }

    /// Replaces the wall clock used for the cursor.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the pull page size.
    pub fn with_pull_page_size(mut self, limit: u32) -> Self {
        self.pull_page_size = limit;
        self
    }

    /// The local store this orchestrator writes to.
    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    /// Rows still waiting to be pushed.
    pub async fn pending_count(&self) -> SyncResult<i64> {
        self.local.count_pending().await
    }

    /// Runs one full cycle. Never retries on its own.
    pub async fn sync_all(&self) -> SyncOutcome {
        if !self.auth.is_signed_in() {
            info!("Skipping sync: not signed in");
            return SyncOutcome::NotAuthenticated;
        }

        match self.run_cycle().await {
            Ok(stats) => {
                info!(
                    pushed = stats.pushed,
                    pulled = stats.pulled,
                    conflicts = stats.conflicts,
                    dropped = stats.dropped,
                    push_failures = stats.push_failures.len(),
                    "Sync cycle complete"
                );
                SyncOutcome::Success(stats)
            }
            Err(e) => {
                warn!(error = %e, "Sync cycle aborted");
                SyncOutcome::from_error(e)
            }
        }
    }

    async fn run_cycle(&self) -> SyncResult<SyncStats> {
        let mut stats = SyncStats::default();

        self.push(&mut stats).await?;

        let since = self.cursor.load().await?;
        let pulled_at = self.clock.now();
        debug!(?since, limit = self.pull_page_size, "Pulling remote items");

        let page = self.remote.list_items(since, self.pull_page_size).await?;
        stats.pulled = page.items.len();

        for remote in &page.items {
            if self.apply(remote).await? {
                stats.conflicts += 1;
            }
        }

        self.cursor.save(pulled_at).await?;
        Ok(stats)
    }

    // =========================================================================
    // Push Phase
    // =========================================================================

    async fn push(&self, stats: &mut SyncStats) -> SyncResult<()> {
        let pending = self.local.pending_items().await?;
        debug!(count = pending.len(), "Pushing pending items");

        for item in &pending {
            let Some(action) = item.sync_state().push_action() else {
                continue;
            };

            match self.push_one(item, action).await {
                Ok(PushResult::Pushed) => stats.pushed += 1,
                Ok(PushResult::Dropped) => stats.dropped += 1,
                Err(SyncError::Remote(error)) if !error.aborts_cycle() => {
                    warn!(
                        id = %item.id,
                        action = %action,
                        error = %error,
                        "Item push failed; will retry next cycle"
                    );
                    stats.push_failures.push(PushFailure {
                        local_id: item.id.clone(),
                        action,
                        error,
                    });
                }
                Err(fatal) => return Err(fatal),
            }
        }

        Ok(())
    }

    async fn push_one(&self, item: &LocalItem, action: PushAction) -> SyncResult<PushResult> {
        match (action, item.server_id.as_deref()) {
            (PushAction::Create, _) => {
                let created = self
                    .remote
                    .create_item(&CreateItemRequest::from_local(item))
                    .await?;
                self.local
                    .mark_created(
                        &item.id,
                        &created.id,
                        created.sync_version,
                        item.client_updated_at,
                    )
                    .await?;
                debug!(id = %item.id, server_id = %created.id, "Created remotely");
            }
            (PushAction::Update, Some(server_id)) => {
                let ack = self
                    .remote
                    .update_item(server_id, &UpdateItemRequest::from_local(item))
                    .await?;
                self.local
                    .mark_synced(&item.id, ack.sync_version, item.client_updated_at)
                    .await?;
            }
            (PushAction::Delete, Some(server_id)) => {
                let ack = self.remote.delete_item(server_id).await?;
                self.local
                    .mark_synced(&item.id, ack.sync_version, item.client_updated_at)
                    .await?;
            }
            (PushAction::DropLocal, _) => {
                self.local.remove(&item.id).await?;
                debug!(id = %item.id, "Dropped never-synced tombstone");
                return Ok(PushResult::Dropped);
            }
            (PushAction::Update | PushAction::Delete, None) => {
                return Err(SyncError::Internal(format!(
                    "item {} classified as {} without a server id",
                    item.id, action
                )));
            }
        }

        Ok(PushResult::Pushed)
    }

    // =========================================================================
    // Apply Phase
    // =========================================================================

    /// Applies one pulled item. Returns true if it conflicted with a pending
    /// local edit.
    ///
    /// A local copy that wins keeps its content but takes the pulled
    /// `sync_version` as its base, so the next push supersedes the server
    /// copy instead of being rejected as stale.
    async fn apply(&self, remote: &RemoteItem) -> SyncResult<bool> {
        let Some(local) = self.local.find_by_server_id(&remote.id).await? else {
            self.local.insert_remote(remote).await?;
            return Ok(false);
        };

        let winner = if local.needs_sync {
            ConflictResolver::resolve_items(&local, remote)
        } else {
            Winner::Remote
        };

        match winner {
            Winner::Remote => {
                let applied = self
                    .local
                    .overwrite_from_remote(&local.id, remote, local.client_updated_at)
                    .await?;
                if applied {
                    return Ok(local.needs_sync);
                }
                // Edited since the read above; that edit is the newest write.
                debug!(id = %local.id, server_id = %remote.id, "Local edit landed mid-apply");
                self.local.rebase_version(&local.id, remote.sync_version).await?;
                Ok(true)
            }
            Winner::Local => {
                debug!(id = %local.id, server_id = %remote.id, "Conflict: local copy wins");
                self.local.rebase_version(&local.id, remote.sync_version).await?;
                Ok(true)
            }
        }
    }
}

enum PushResult {
    Pushed,
    Dropped,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{KeyValueStore, MemoryKeyValueStore};
    use crate::testing::{at_millis, CountingStore, FakeAuth, FakeRemote, FixedClock};
    use chrono::Utc;
    use scanium_core::{ItemPayload, ItemSyncState};
    use scanium_db::{Database, DbConfig};

    struct Harness {
        db: Database,
        remote: Arc<FakeRemote>,
        auth: Arc<FakeAuth>,
        kv: Arc<MemoryKeyValueStore>,
        orchestrator: SyncOrchestrator,
    }

    async fn harness() -> Harness {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = Arc::new(FakeRemote::new());
        let auth = Arc::new(FakeAuth::signed_in());
        let kv = Arc::new(MemoryKeyValueStore::new());

        let orchestrator = SyncOrchestrator::new(
            remote.clone(),
            Arc::new(db.clone()),
            auth.clone(),
            CursorStore::new(kv.clone()),
        );

        Harness {
            db,
            remote,
            auth,
            kv,
            orchestrator,
        }
    }

    fn item_at(millis: i64, title: &str) -> LocalItem {
        LocalItem::new_local(ItemPayload::titled(title), at_millis(millis))
    }

    fn remote_item(server_id: &str, updated_millis: i64, title: &str) -> RemoteItem {
        RemoteItem {
            id: server_id.to_string(),
            sync_version: 1,
            created_at: at_millis(0),
            client_updated_at: at_millis(updated_millis),
            deleted_at: None,
            payload: ItemPayload::titled(title),
        }
    }

    #[tokio::test]
    async fn test_new_item_gets_server_id() {
        let h = harness().await;
        let a = item_at(100, "A");
        h.db.items().insert(&a).await.unwrap();

        let outcome = h.orchestrator.sync_all().await;

        let stats = outcome.stats().unwrap();
        assert_eq!(stats.pushed, 1);
        let a = h.db.items().get_by_id(&a.id).await.unwrap().unwrap();
        assert_eq!(a.server_id.as_deref(), Some("srv-1"));
        assert!(!a.needs_sync);
        assert_eq!(h.remote.calls().create, 1);
    }

    #[tokio::test]
    async fn test_second_cycle_is_a_no_op() {
        let h = harness().await;
        h.db.items().create(ItemPayload::titled("Lamp")).await.unwrap();
        h.db.items().create(ItemPayload::titled("Chair")).await.unwrap();

        assert!(h.orchestrator.sync_all().await.is_success());

        let second = h.orchestrator.sync_all().await;
        let stats = second.stats().unwrap();
        assert_eq!(stats.pushed, 0);
        assert_eq!(stats.pulled, 0);
        assert_eq!(h.remote.calls().create, 2);
    }

    #[tokio::test]
    async fn test_offline_item_gets_server_id_once_back_online() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Offline")).await.unwrap();

        h.remote.set_network_down(true);
        assert!(matches!(
            h.orchestrator.sync_all().await,
            SyncOutcome::NetworkError(_)
        ));

        h.remote.set_network_down(false);
        assert!(h.orchestrator.sync_all().await.is_success());

        let item = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert!(item.server_id.is_some());
        assert_eq!(item.sync_state(), ItemSyncState::Synced);
    }

    #[tokio::test]
    async fn test_crash_after_remote_create_recreates_with_same_key() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.items().create(ItemPayload::titled("Fragile")).await.unwrap();

        let store = Arc::new(CountingStore::new(Arc::new(db.clone())));
        let remote = Arc::new(FakeRemote::new());
        let orchestrator = SyncOrchestrator::new(
            remote.clone(),
            store.clone(),
            Arc::new(FakeAuth::signed_in()),
            CursorStore::new(Arc::new(MemoryKeyValueStore::new())),
        );

        store.fail_mark_created(true);
        assert!(matches!(
            orchestrator.sync_all().await,
            SyncOutcome::ServerError(_)
        ));
        assert!(db.items().get_by_id(&item.id).await.unwrap().unwrap().needs_sync);

        store.fail_mark_created(false);
        assert!(orchestrator.sync_all().await.is_success());

        assert_eq!(remote.calls().create, 2);
        assert_eq!(remote.stored_count(), 1);
        let item = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(item.server_id.as_deref(), Some("srv-1"));
    }

    #[tokio::test]
    async fn test_pending_delete_completes() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Gone")).await.unwrap();
        assert!(h.orchestrator.sync_all().await.is_success());

        h.db.items().soft_delete(&item.id).await.unwrap();
        let before = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(before.sync_state(), ItemSyncState::PendingDelete);

        let outcome = h.orchestrator.sync_all().await;
        assert_eq!(outcome.stats().unwrap().pushed, 1);

        let after = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert!(!after.needs_sync);
        assert!(after.is_tombstone());
        assert!(after.sync_version > before.sync_version);
        assert_eq!(h.remote.calls().delete, 1);
    }

    #[tokio::test]
    async fn test_never_synced_tombstone_is_dropped_locally() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Oops")).await.unwrap();
        h.db.items().soft_delete(&item.id).await.unwrap();

        let outcome = h.orchestrator.sync_all().await;

        assert_eq!(outcome.stats().unwrap().dropped, 1);
        assert!(h.db.items().get_by_id(&item.id).await.unwrap().is_none());
        let calls = h.remote.calls();
        assert_eq!(calls.create + calls.update + calls.delete, 0);
    }

    #[tokio::test]
    async fn test_local_conflict_winner_reaches_server() {
        let h = harness().await;

        let mut b = item_at(500, "B local");
        b.server_id = Some("srv-2".into());
        b.sync_version = 1;
        h.db.items().insert(&b).await.unwrap();

        let mut server = remote_item("srv-2", 300, "B server");
        server.sync_version = 2;
        h.remote.seed(server);

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.push_failures.len(), 1);
        assert!(matches!(
            stats.push_failures[0].error,
            RemoteError::Conflict { .. }
        ));

        let stored = h.db.items().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.payload.title, "B local");
        assert_eq!(stored.client_updated_at, b.client_updated_at);
        assert_eq!(stored.sync_version, 2);
        assert!(stored.needs_sync);

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pushed, 1);
        assert!(stats.push_failures.is_empty());
        assert_eq!(h.remote.item("srv-2").unwrap().payload.title, "B local");

        let stored = h.db.items().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.sync_state(), ItemSyncState::Synced);
        assert_eq!(stored.sync_version, 3);

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pushed, 0);
        assert!(stats.push_failures.is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_item_where_server_is_newer() {
        let h = harness().await;

        let mut b = item_at(300, "B local");
        b.server_id = Some("srv-2".into());
        h.db.items().insert(&b).await.unwrap();

        h.remote.seed(remote_item("srv-2", 300, "B server"));

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.conflicts, 1);
        assert_eq!(stats.push_failures.len(), 1);

        let stored = h.db.items().get_by_id(&b.id).await.unwrap().unwrap();
        assert_eq!(stored.payload.title, "B server");
        assert!(!stored.needs_sync);

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pushed, 0);
        assert_eq!(h.remote.calls().update, 1);
    }

    #[tokio::test]
    async fn test_server_edit_overwrites_synced_row() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Lamp")).await.unwrap();
        assert!(h.orchestrator.sync_all().await.is_success());

        let edited_at = Utc::now() + chrono::Duration::seconds(60);
        h.remote.edit("srv-1", |remote| {
            remote.client_updated_at = edited_at;
            remote.payload = ItemPayload::titled("Brass lamp");
        });

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pulled, 1);
        assert_eq!(stats.conflicts, 0);

        let stored = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.payload.title, "Brass lamp");
        assert_eq!(stored.client_updated_at, edited_at);
        assert_eq!(stored.deleted_at, None);
        assert_eq!(stored.sync_version, 2);
        assert_eq!(stored.sync_state(), ItemSyncState::Synced);
    }

    #[tokio::test]
    async fn test_server_tombstone_overwrites_synced_row() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Lamp")).await.unwrap();
        assert!(h.orchestrator.sync_all().await.is_success());

        let deleted_at = Utc::now() + chrono::Duration::seconds(60);
        h.remote.edit("srv-1", |remote| {
            remote.client_updated_at = deleted_at;
            remote.deleted_at = Some(deleted_at);
        });

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.conflicts, 0);

        let stored = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.deleted_at, Some(deleted_at));
        assert_eq!(stored.sync_version, 2);
        assert!(!stored.needs_sync);
        assert!(h.db.items().list_visible().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_create_response_recovers_next_cycle() {
        let h = harness().await;
        let item = h.db.items().create(ItemPayload::titled("Vase")).await.unwrap();
        h.remote.lose_create_response_for(&item.id);

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.push_failures.len(), 1);
        assert!(matches!(
            stats.push_failures[0].error,
            RemoteError::Decode(_)
        ));
        assert_eq!(stats.pulled, 1);
        assert_eq!(h.db.items().count().await.unwrap(), 2);

        for _ in 0..2 {
            assert!(h.orchestrator.sync_all().await.is_success());
        }

        assert_eq!(h.db.items().count().await.unwrap(), 1);
        assert_eq!(h.db.items().count_pending().await.unwrap(), 0);
        let stored = h.db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.server_id.as_deref(), Some("srv-1"));
        assert_eq!(stored.payload.title, "Vase");
        assert_eq!(h.remote.stored_count(), 1);
    }

    /// Runs one local edit while the first create call is in flight.
    struct EditDuringCreate {
        inner: Arc<FakeRemote>,
        db: Database,
        edit: std::sync::Mutex<Option<(String, ItemPayload)>>,
    }

    #[async_trait::async_trait]
    impl RemoteClient for EditDuringCreate {
        async fn create_item(
            &self,
            request: &CreateItemRequest,
        ) -> Result<crate::remote::CreatedItem, RemoteError> {
            let edit = self.edit.lock().unwrap().take();
            if let Some((id, payload)) = edit {
                self.db.items().update_payload(&id, payload).await.unwrap();
            }
            self.inner.create_item(request).await
        }

        async fn update_item(
            &self,
            server_id: &str,
            request: &UpdateItemRequest,
        ) -> Result<crate::remote::VersionAck, RemoteError> {
            self.inner.update_item(server_id, request).await
        }

        async fn delete_item(
            &self,
            server_id: &str,
        ) -> Result<crate::remote::VersionAck, RemoteError> {
            self.inner.delete_item(server_id).await
        }

        async fn list_items(
            &self,
            since: Option<chrono::DateTime<Utc>>,
            limit: u32,
        ) -> Result<crate::remote::ItemPage, RemoteError> {
            self.inner.list_items(since, limit).await
        }
    }

    #[tokio::test]
    async fn test_edit_while_create_in_flight_is_pushed_next_cycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.items().create(ItemPayload::titled("Lamp")).await.unwrap();

        let fake = Arc::new(FakeRemote::new());
        let remote = Arc::new(EditDuringCreate {
            inner: fake.clone(),
            db: db.clone(),
            edit: std::sync::Mutex::new(Some((
                item.id.clone(),
                ItemPayload::titled("Edited mid-push"),
            ))),
        });
        let orchestrator = SyncOrchestrator::new(
            remote,
            Arc::new(db.clone()),
            Arc::new(FakeAuth::signed_in()),
            CursorStore::new(Arc::new(MemoryKeyValueStore::new())),
        );

        let stats = orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pushed, 1);

        let stored = db.items().get_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.server_id.as_deref(), Some("srv-1"));
        assert_eq!(stored.payload.title, "Edited mid-push");
        assert_eq!(stored.sync_state(), ItemSyncState::PendingUpdate);

        let stats = orchestrator.sync_all().await.stats().cloned().unwrap();
        assert_eq!(stats.pushed, 1);
        assert_eq!(fake.calls().update, 1);
        assert_eq!(fake.item("srv-1").unwrap().payload.title, "Edited mid-push");
        assert!(!db.items().get_by_id(&item.id).await.unwrap().unwrap().needs_sync);
    }

    #[tokio::test]
    async fn test_item_failure_does_not_block_others_or_pull() {
        let h = harness().await;
        let bad = h.db.items().create(ItemPayload::titled("Bad")).await.unwrap();
        let good = h.db.items().create(ItemPayload::titled("Good")).await.unwrap();
        h.remote.fail_create_for(&bad.id);
        h.remote.seed(remote_item("srv-remote", 1_000, "From web"));

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();

        assert_eq!(stats.pushed, 1);
        assert_eq!(stats.push_failures.len(), 1);
        assert_eq!(stats.push_failures[0].local_id, bad.id);
        assert_eq!(stats.push_failures[0].action, PushAction::Create);
        assert!(stats.pulled >= 1);

        assert!(h.db.items().get_by_id(&bad.id).await.unwrap().unwrap().needs_sync);
        assert!(!h.db.items().get_by_id(&good.id).await.unwrap().unwrap().needs_sync);
        assert!(h.db.items().get_by_server_id("srv-remote").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_network_error_during_push_skips_pull_and_keeps_cursor() {
        let h = harness().await;
        h.db.items().create(ItemPayload::titled("Lamp")).await.unwrap();
        h.remote.set_network_down(true);

        let outcome = h.orchestrator.sync_all().await;

        assert!(matches!(outcome, SyncOutcome::NetworkError(_)));
        assert_eq!(h.remote.calls().list, 0);
        assert_eq!(h.kv.get(crate::state::CURSOR_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_response_maps_to_not_authenticated() {
        let h = harness().await;
        h.db.items().create(ItemPayload::titled("Lamp")).await.unwrap();
        h.remote.set_unauthorized(true);

        assert_eq!(h.orchestrator.sync_all().await, SyncOutcome::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_not_signed_in_touches_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.items().create(ItemPayload::titled("Lamp")).await.unwrap();

        let store = Arc::new(CountingStore::new(Arc::new(db)));
        let remote = Arc::new(FakeRemote::new());
        let orchestrator = SyncOrchestrator::new(
            remote.clone(),
            store.clone(),
            Arc::new(FakeAuth::signed_out()),
            CursorStore::new(Arc::new(MemoryKeyValueStore::new())),
        );

        assert_eq!(orchestrator.sync_all().await, SyncOutcome::NotAuthenticated);
        assert_eq!(store.call_count(), 0);
        assert_eq!(remote.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_cursor_advances_to_clock_time() {
        let h = harness().await;
        let clock = Arc::new(FixedClock::new(at_millis(42_000)));
        let orchestrator = SyncOrchestrator::new(
            h.remote.clone(),
            Arc::new(h.db.clone()),
            h.auth.clone(),
            CursorStore::new(h.kv.clone()),
        )
        .with_clock(clock)
        .with_pull_page_size(10);

        assert!(orchestrator.sync_all().await.is_success());
        orchestrator.sync_all().await;

        let cursor = CursorStore::new(h.kv.clone()).load().await.unwrap();
        assert_eq!(cursor, Some(at_millis(42_000)));
        assert_eq!(h.remote.last_list_request(), Some((Some(at_millis(42_000)), 10)));
    }

    #[tokio::test]
    async fn test_pulled_items_without_local_match_are_inserted() {
        let h = harness().await;
        h.remote.seed(remote_item("srv-a", 10, "A"));
        h.remote.seed(remote_item("srv-b", 20, "B"));

        let stats = h.orchestrator.sync_all().await.stats().cloned().unwrap();

        assert_eq!(stats.pulled, 2);
        assert_eq!(stats.conflicts, 0);
        let visible = h.db.items().list_visible().await.unwrap();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|i| i.sync_state() == ItemSyncState::Synced));
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(
            SyncOutcome::from_error(RemoteError::Network("down".into()).into()),
            SyncOutcome::NetworkError("down".into())
        );
        assert_eq!(
            SyncOutcome::from_error(RemoteError::Unauthorized.into()),
            SyncOutcome::NotAuthenticated
        );
        assert!(matches!(
            SyncOutcome::from_error(RemoteError::server(500, "boom").into()),
            SyncOutcome::ServerError(_)
        ));
        assert!(matches!(
            SyncOutcome::from_error(SyncError::Store("disk full".into())),
            SyncOutcome::ServerError(_)
        ));
    }
}
