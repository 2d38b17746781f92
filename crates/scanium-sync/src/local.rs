//! # Local Store
//!
//! Row-level access to the on-device items, shaped around what a sync cycle
//! needs. The SQLite adapter delegates to [`scanium_db::ItemRepository`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use scanium_core::{LocalItem, RemoteItem};
use scanium_db::Database;

use crate::error::SyncResult;

/// On-device item store as seen by the sync engine.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Rows with `needs_sync` set, oldest first.
    async fn pending_items(&self) -> SyncResult<Vec<LocalItem>>;

    async fn find_by_id(&self, local_id: &str) -> SyncResult<Option<LocalItem>>;

    async fn find_by_server_id(&self, server_id: &str) -> SyncResult<Option<LocalItem>>;

    /// Records a successful create. An existing server id is kept, and
    /// `needs_sync` stays set if the row changed after `pushed_at`.
    async fn mark_created(
        &self,
        local_id: &str,
        server_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()>;

    /// Records a successful update or delete. `needs_sync` stays set if the
    /// row changed after `pushed_at`.
    async fn mark_synced(
        &self,
        local_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()>;

    /// Stores a pulled item that has no local counterpart.
    async fn insert_remote(&self, remote: &RemoteItem) -> SyncResult<LocalItem>;

    /// Overwrites a local row with the server copy and clears `needs_sync`.
    /// Returns false, writing nothing, if the row changed after `read_at`.
    async fn overwrite_from_remote(
        &self,
        local_id: &str,
        remote: &RemoteItem,
        read_at: DateTime<Utc>,
    ) -> SyncResult<bool>;

    /// Raises a pending row's base version to a pulled server version.
    async fn rebase_version(&self, local_id: &str, sync_version: i64) -> SyncResult<()>;

    /// Hard-deletes a row.
    async fn remove(&self, local_id: &str) -> SyncResult<()>;

    async fn count_items(&self) -> SyncResult<i64>;

    async fn count_pending(&self) -> SyncResult<i64>;

    /// Flags every row for the next push; returns the number flagged.
    async fn mark_all_needs_sync(&self) -> SyncResult<u64>;
}

#[async_trait]
impl LocalStore for Database {
    async fn pending_items(&self) -> SyncResult<Vec<LocalItem>> {
        Ok(self.items().list_pending().await?)
    }

    async fn find_by_id(&self, local_id: &str) -> SyncResult<Option<LocalItem>> {
        Ok(self.items().get_by_id(local_id).await?)
    }

    async fn find_by_server_id(&self, server_id: &str) -> SyncResult<Option<LocalItem>> {
        Ok(self.items().get_by_server_id(server_id).await?)
    }

    async fn mark_created(
        &self,
        local_id: &str,
        server_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        Ok(self
            .items()
            .mark_created(local_id, server_id, sync_version, pushed_at)
            .await?)
    }

    async fn mark_synced(
        &self,
        local_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        Ok(self
            .items()
            .mark_synced(local_id, sync_version, pushed_at)
            .await?)
    }

    async fn insert_remote(&self, remote: &RemoteItem) -> SyncResult<LocalItem> {
        let item = LocalItem::from_remote(remote);
        self.items().insert(&item).await?;
        Ok(item)
    }

    async fn overwrite_from_remote(
        &self,
        local_id: &str,
        remote: &RemoteItem,
        read_at: DateTime<Utc>,
    ) -> SyncResult<bool> {
        Ok(self
            .items()
            .overwrite_from_remote(local_id, remote, read_at)
            .await?)
    }

    async fn rebase_version(&self, local_id: &str, sync_version: i64) -> SyncResult<()> {
        Ok(self.items().rebase_version(local_id, sync_version).await?)
    }

    async fn remove(&self, local_id: &str) -> SyncResult<()> {
        self.items().remove(local_id).await?;
        Ok(())
    }

    async fn count_items(&self) -> SyncResult<i64> {
        Ok(self.items().count().await?)
    }

    async fn count_pending(&self) -> SyncResult<i64> {
        Ok(self.items().count_pending().await?)
    }

    async fn mark_all_needs_sync(&self) -> SyncResult<u64> {
        Ok(self.items().mark_all_needs_sync().await?)
    }
}
