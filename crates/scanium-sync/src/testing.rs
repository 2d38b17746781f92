//! In-process fakes for the sync collaborators.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use scanium_core::{LocalItem, RemoteItem};

use crate::auth::AuthProvider;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::local::LocalStore;
use crate::remote::{
    CreateItemRequest, CreatedItem, ItemPage, RemoteClient, UpdateItemRequest, VersionAck,
};
use crate::state::Clock;

pub fn at_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

// =============================================================================
// Remote
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub list: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete + self.list
    }
}

#[derive(Default)]
struct FakeState {
    items: BTreeMap<String, RemoteItem>,
    by_client_id: HashMap<String, String>,
    next_id: u64,
    calls: CallCounts,
    network_down: bool,
    unauthorized: bool,
    failing_creates: HashSet<String>,
    lost_create_responses: HashSet<String>,
    last_list: Option<(Option<DateTime<Utc>>, u32)>,
}

impl FakeState {
    fn gate(&self) -> Result<(), RemoteError> {
        if self.network_down {
            return Err(RemoteError::Network("connection refused".into()));
        }
        if self.unauthorized {
            return Err(RemoteError::Unauthorized);
        }
        Ok(())
    }
}

/// Backend stand-in. Creates are idempotent on the client item id and
/// updates based on an older version than the stored one get a 409.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    list_gate: Arc<RwLock<()>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn seed(&self, item: RemoteItem) {
        self.state().items.insert(item.id.clone(), item);
    }

    pub fn set_network_down(&self, down: bool) {
        self.state().network_down = down;
    }

    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.state().unauthorized = unauthorized;
    }

    pub fn fail_create_for(&self, local_id: &str) {
        self.state().failing_creates.insert(local_id.to_string());
    }

    /// Commits the next create for `local_id`, then fails its response.
    pub fn lose_create_response_for(&self, local_id: &str) {
        self.state()
            .lost_create_responses
            .insert(local_id.to_string());
    }

    /// Applies an edit made by another client, bumping the version.
    pub fn edit(&self, server_id: &str, change: impl FnOnce(&mut RemoteItem)) {
        let mut state = self.state();
        let item = state.items.get_mut(server_id).unwrap();
        change(item);
        item.sync_version += 1;
    }

    pub fn item(&self, server_id: &str) -> Option<RemoteItem> {
        self.state().items.get(server_id).cloned()
    }

    pub fn calls(&self) -> CallCounts {
        self.state().calls
    }

    pub fn stored_count(&self) -> usize {
        self.state().items.len()
    }

    pub fn last_list_request(&self) -> Option<(Option<DateTime<Utc>>, u32)> {
        self.state().last_list
    }

    /// Holds every `list_items` call until the guard is dropped.
    pub async fn block_lists(&self) -> OwnedRwLockWriteGuard<()> {
        self.list_gate.clone().write_owned().await
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn create_item(&self, request: &CreateItemRequest) -> Result<CreatedItem, RemoteError> {
        let mut state = self.state();
        state.calls.create += 1;
        state.gate()?;

        if state.failing_creates.contains(&request.client_item_id) {
            return Err(RemoteError::server(500, "rejected"));
        }

        if let Some(existing) = state.by_client_id.get(&request.client_item_id).cloned() {
            let item = &state.items[&existing];
            return Ok(CreatedItem {
                id: item.id.clone(),
                sync_version: item.sync_version,
            });
        }

        state.next_id += 1;
        let id = format!("srv-{}", state.next_id);
        state.items.insert(
            id.clone(),
            RemoteItem {
                id: id.clone(),
                sync_version: 1,
                created_at: request.client_updated_at,
                client_updated_at: request.client_updated_at,
                deleted_at: None,
                payload: request.payload.clone(),
            },
        );
        state
            .by_client_id
            .insert(request.client_item_id.clone(), id.clone());

        if state.lost_create_responses.remove(&request.client_item_id) {
            return Err(RemoteError::Decode("truncated body".into()));
        }

        Ok(CreatedItem {
            id,
            sync_version: 1,
        })
    }

    async fn update_item(
        &self,
        server_id: &str,
        request: &UpdateItemRequest,
    ) -> Result<VersionAck, RemoteError> {
        let mut state = self.state();
        state.calls.update += 1;
        state.gate()?;

        let item = state
            .items
            .get_mut(server_id)
            .ok_or_else(|| RemoteError::server(404, "no such item"))?;
        if request.sync_version < item.sync_version {
            return Err(RemoteError::Conflict {
                message: "stale sync version".into(),
            });
        }
        item.sync_version += 1;
        item.client_updated_at = request.client_updated_at;
        item.payload = request.payload.clone();

        Ok(VersionAck {
            sync_version: item.sync_version,
        })
    }

    async fn delete_item(&self, server_id: &str) -> Result<VersionAck, RemoteError> {
        let mut state = self.state();
        state.calls.delete += 1;
        state.gate()?;

        let item = state
            .items
            .get_mut(server_id)
            .ok_or_else(|| RemoteError::server(404, "no such item"))?;
        item.sync_version += 1;
        item.deleted_at.get_or_insert_with(Utc::now);

        Ok(VersionAck {
            sync_version: item.sync_version,
        })
    }

    async fn list_items(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<ItemPage, RemoteError> {
        let _open = self.list_gate.read().await;

        let mut state = self.state();
        state.calls.list += 1;
        state.last_list = Some((since, limit));
        state.gate()?;

        let mut items: Vec<RemoteItem> = state
            .items
            .values()
            .filter(|item| since.map_or(true, |since| item.client_updated_at > since))
            .cloned()
            .collect();
        items.sort_by_key(|item| item.client_updated_at);
        items.truncate(limit as usize);

        Ok(ItemPage { items })
    }
}

// =============================================================================
// Local Store
// =============================================================================

/// Wraps a store, counting every call and optionally failing `mark_created`.
pub struct CountingStore {
    inner: Arc<dyn LocalStore>,
    calls: AtomicUsize,
    fail_mark_created: AtomicBool,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn LocalStore>) -> Self {
        CountingStore {
            inner,
            calls: AtomicUsize::new(0),
            fail_mark_created: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_mark_created(&self, fail: bool) {
        self.fail_mark_created.store(fail, Ordering::SeqCst);
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalStore for CountingStore {
    async fn pending_items(&self) -> SyncResult<Vec<LocalItem>> {
        self.tick();
        self.inner.pending_items().await
    }

    async fn find_by_id(&self, local_id: &str) -> SyncResult<Option<LocalItem>> {
        self.tick();
        self.inner.find_by_id(local_id).await
    }

    async fn find_by_server_id(&self, server_id: &str) -> SyncResult<Option<LocalItem>> {
        self.tick();
        self.inner.find_by_server_id(server_id).await
    }

    async fn mark_created(
        &self,
        local_id: &str,
        server_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.tick();
        if self.fail_mark_created.load(Ordering::SeqCst) {
            return Err(SyncError::Store("process killed before write".into()));
        }
        self.inner
            .mark_created(local_id, server_id, sync_version, pushed_at)
            .await
    }

    async fn mark_synced(
        &self,
        local_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.tick();
        self.inner
            .mark_synced(local_id, sync_version, pushed_at)
            .await
    }

    async fn insert_remote(&self, remote: &RemoteItem) -> SyncResult<LocalItem> {
        self.tick();
        self.inner.insert_remote(remote).await
    }

    async fn overwrite_from_remote(
        &self,
        local_id: &str,
        remote: &RemoteItem,
        read_at: DateTime<Utc>,
    ) -> SyncResult<bool> {
        self.tick();
        self.inner
            .overwrite_from_remote(local_id, remote, read_at)
            .await
    }

    async fn rebase_version(&self, local_id: &str, sync_version: i64) -> SyncResult<()> {
        self.tick();
        self.inner.rebase_version(local_id, sync_version).await
    }

    async fn remove(&self, local_id: &str) -> SyncResult<()> {
        self.tick();
        self.inner.remove(local_id).await
    }

    async fn count_items(&self) -> SyncResult<i64> {
        self.tick();
        self.inner.count_items().await
    }

    async fn count_pending(&self) -> SyncResult<i64> {
        self.tick();
        self.inner.count_pending().await
    }

    async fn mark_all_needs_sync(&self) -> SyncResult<u64> {
        self.tick();
        self.inner.mark_all_needs_sync().await
    }
}

// =============================================================================
// Auth & Clock
// =============================================================================

pub struct FakeAuth {
    signed_in: AtomicBool,
}

impl FakeAuth {
    pub fn signed_in() -> Self {
        FakeAuth {
            signed_in: AtomicBool::new(true),
        }
    }

    pub fn signed_out() -> Self {
        FakeAuth {
            signed_in: AtomicBool::new(false),
        }
    }
}

impl AuthProvider for FakeAuth {
    fn is_signed_in(&self) -> bool {
        self.signed_in.load(Ordering::SeqCst)
    }

    fn access_token(&self) -> Option<String> {
        self.is_signed_in().then(|| "test-token".to_string())
    }
}

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        FixedClock {
            now: Mutex::new(now),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
