//! # Item Repository
//!
//! Database operations for scanned items and their sync-control columns.
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     items table writers                                 │
//! │                                                                         │
//! │  Local edits (app)          needs_sync = 1, client_updated_at = now     │
//! │  ├── create                 server_id NULL, sync_version 0              │
//! │  ├── update_payload                                                     │
//! │  └── soft_delete            deleted_at = now                            │
//! │                                                                         │
//! │  Sync engine (server responses only)                                    │
//! │  ├── mark_created           server_id = COALESCE(server_id, ?)          │
//! │  ├── mark_synced            sync_version = MAX(sync_version, ?)         │
//! │  ├── insert                 new synced row from a pulled item           │
//! │  ├── overwrite_from_remote  remote copy wins, needs_sync = 0            │
//! │  └── rebase_version         local copy wins, keeps its content          │
//! │                                                                         │
//! │  server_id never changes once set; sync_version never goes down.        │
//! │  needs_sync is only cleared while client_updated_at still matches       │
//! │  what the cycle read, so an edit made mid-cycle is never lost.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use scanium_core::{CoreError, ItemPayload, LocalItem, RemoteItem};

const SELECT_ITEM: &str = r#"
    SELECT
        id,
        server_id,
        needs_sync,
        sync_version,
        client_updated_at,
        deleted_at,
        created_at,
        payload
    FROM items
"#;

/// Raw `items` row; the payload column holds JSON text.
#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    server_id: Option<String>,
    needs_sync: bool,
    sync_version: i64,
    client_updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    payload: String,
}

impl TryFrom<ItemRow> for LocalItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> DbResult<Self> {
        let payload: ItemPayload =
            serde_json::from_str(&row.payload).map_err(|e| CoreError::InvalidPayload {
                id: row.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(LocalItem {
            id: row.id,
            server_id: row.server_id,
            needs_sync: row.needs_sync,
            sync_version: row.sync_version,
            client_updated_at: row.client_updated_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            payload,
        })
    }
}

fn into_items(rows: Vec<ItemRow>) -> DbResult<Vec<LocalItem>> {
    rows.into_iter().map(LocalItem::try_from).collect()
}

fn unique_on_server_id(err: &DbError) -> bool {
    matches!(err, DbError::UniqueViolation { field, .. } if field.ends_with("server_id"))
}

/// Repository for item database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.items();
///
/// let item = repo.create(ItemPayload::titled("Desk lamp")).await?;
/// repo.soft_delete(&item.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    // =========================================================================
    // Local Edits
    // =========================================================================

    /// Stores a freshly scanned item as never-synced.
    pub async fn create(&self, payload: ItemPayload) -> DbResult<LocalItem> {
        payload.validate().map_err(CoreError::from)?;

        let item = LocalItem::new_local(payload, Utc::now());
        debug!(id = %item.id, "Creating item");

        self.insert(&item).await?;
        Ok(item)
    }

    /// Replaces an item's payload and queues it for the next push.
    ///
    /// ## Errors
    /// - `NotFound` if the id is unknown
    /// - `CoreError::ItemDeleted` if the item is tombstoned
    pub async fn update_payload(&self, id: &str, payload: ItemPayload) -> DbResult<LocalItem> {
        payload.validate().map_err(CoreError::from)?;

        let mut item = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        if item.is_tombstone() {
            return Err(CoreError::ItemDeleted(id.to_string()).into());
        }

        debug!(id = %id, "Updating item payload");

        let now = Utc::now();
        let payload_json = serde_json::to_string(&payload)?;

        sqlx::query(
            r#"
            UPDATE items
            SET
                payload = ?2,
                client_updated_at = ?3,
                needs_sync = 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(payload_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        item.payload = payload;
        item.client_updated_at = now;
        item.needs_sync = true;
        Ok(item)
    }

    /// Tombstones an item and queues the deletion for the next push.
    ///
    /// Deleting an already-deleted item is a no-op.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting item");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE items
            SET
                deleted_at = ?2,
                client_updated_at = ?2,
                needs_sync = 1
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 && self.get_by_id(id).await?.is_none() {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an item by its local id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<LocalItem>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEM} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LocalItem::try_from).transpose()
    }

    /// Gets an item by the id the backend assigned it.
    pub async fn get_by_server_id(&self, server_id: &str) -> DbResult<Option<LocalItem>> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEM} WHERE server_id = ?1"))
            .bind(server_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LocalItem::try_from).transpose()
    }

    /// Lists items that are not tombstoned, newest first.
    pub async fn list_visible(&self) -> DbResult<Vec<LocalItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{SELECT_ITEM} WHERE deleted_at IS NULL ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_items(rows)
    }

    /// Lists items with unacknowledged local changes, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<LocalItem>> {
        let rows: Vec<ItemRow> = sqlx::query_as(&format!(
            "{SELECT_ITEM} WHERE needs_sync = 1 ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_items(rows)
    }

    /// Counts every stored row, tombstones included.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Counts rows waiting to be pushed.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE needs_sync = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Sync Writes
    // =========================================================================

    /// Inserts a complete row as-is.
    pub async fn insert(&self, item: &LocalItem) -> DbResult<()> {
        let payload_json = serde_json::to_string(&item.payload)?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, server_id, needs_sync, sync_version,
                client_updated_at, deleted_at, created_at, payload
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.server_id)
        .bind(item.needs_sync)
        .bind(item.sync_version)
        .bind(item.client_updated_at)
        .bind(item.deleted_at)
        .bind(item.created_at)
        .bind(payload_json)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err @ DbError::UniqueViolation { .. } if unique_on_server_id(&err) => {
                err.with_value(item.server_id.as_deref().unwrap_or_default())
            }
            err => err.with_value(&item.id),
        })?;

        Ok(())
    }

    /// Records a successful remote create.
    ///
    /// `pushed_at` is the `client_updated_at` the create was built from.
    /// `needs_sync` is cleared only if the row still carries it, so an edit
    /// made while the call was in flight stays pending.
    ///
    /// If a pull already stored the same server item under another local id
    /// (the create response was lost), that duplicate row is folded into
    /// this one: the newer edit of the two is kept and the duplicate removed.
    /// A server id already on the row is kept.
    pub async fn mark_created(
        &self,
        id: &str,
        server_id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, server_id = %server_id, "Marking item created");

        let mut tx = self.pool.begin().await?;

        let current: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_ITEM} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let current = current
            .map(LocalItem::try_from)
            .transpose()?
            .ok_or_else(|| DbError::not_found("Item", id))?;

        let duplicate: Option<ItemRow> =
            sqlx::query_as(&format!("{SELECT_ITEM} WHERE server_id = ?1 AND id != ?2"))
                .bind(server_id)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(duplicate) = duplicate.map(LocalItem::try_from).transpose()? {
            debug!(
                id = %id,
                duplicate = %duplicate.id,
                server_id = %server_id,
                "Folding pulled duplicate into created item"
            );

            sqlx::query("DELETE FROM items WHERE id = ?1")
                .bind(&duplicate.id)
                .execute(&mut *tx)
                .await?;

            if duplicate.client_updated_at > current.client_updated_at {
                sqlx::query(
                    r#"
                    UPDATE items
                    SET
                        payload = ?2,
                        client_updated_at = ?3,
                        deleted_at = ?4,
                        needs_sync = ?5,
                        sync_version = MAX(sync_version, ?6)
                    WHERE id = ?1
                    "#,
                )
                .bind(id)
                .bind(serde_json::to_string(&duplicate.payload)?)
                .bind(duplicate.client_updated_at)
                .bind(duplicate.deleted_at)
                .bind(duplicate.needs_sync)
                .bind(duplicate.sync_version)
                .execute(&mut *tx)
                .await?;
            }
        }

        sqlx::query(
            r#"
            UPDATE items
            SET
                server_id = COALESCE(server_id, ?2),
                sync_version = MAX(sync_version, ?3),
                needs_sync = CASE WHEN client_updated_at = ?4 THEN 0 ELSE needs_sync END
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(server_id)
        .bind(sync_version)
        .bind(pushed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from(e).with_value(server_id))?;

        tx.commit().await?;
        Ok(())
    }

    /// Records a successful remote update or delete.
    ///
    /// As with [`mark_created`](Self::mark_created), `needs_sync` is cleared
    /// only if the row was not edited after `pushed_at`.
    pub async fn mark_synced(
        &self,
        id: &str,
        sync_version: i64,
        pushed_at: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET
                sync_version = MAX(sync_version, ?2),
                needs_sync = CASE WHEN client_updated_at = ?3 THEN 0 ELSE needs_sync END
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(sync_version)
        .bind(pushed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Replaces a local row's content with the server's copy and clears
    /// `needs_sync`.
    ///
    /// The write only lands if the row's `client_updated_at` still equals
    /// `read_at`. Returns false when a local edit got there first; the row
    /// is then left untouched.
    pub async fn overwrite_from_remote(
        &self,
        id: &str,
        remote: &RemoteItem,
        read_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, server_id = %remote.id, "Applying remote item");

        let payload_json = serde_json::to_string(&remote.payload)?;

        let result = sqlx::query(
            r#"
            UPDATE items
            SET
                server_id = COALESCE(server_id, ?2),
                sync_version = MAX(sync_version, ?3),
                client_updated_at = ?4,
                deleted_at = ?5,
                payload = ?6,
                needs_sync = 0
            WHERE id = ?1 AND client_updated_at = ?7
            "#,
        )
        .bind(id)
        .bind(&remote.id)
        .bind(remote.sync_version)
        .bind(remote.client_updated_at)
        .bind(remote.deleted_at)
        .bind(payload_json)
        .bind(read_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            if self.get_by_id(id).await?.is_none() {
                return Err(DbError::not_found("Item", id));
            }
            debug!(id = %id, "Row edited since it was read; remote copy not applied");
            return Ok(false);
        }

        Ok(true)
    }

    /// Moves a pending row's base version up to `sync_version` without
    /// touching its content, so the next update is not rejected as stale.
    pub async fn rebase_version(&self, id: &str, sync_version: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE items
            SET sync_version = MAX(sync_version, ?2)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(sync_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Item", id));
        }

        Ok(())
    }

    /// Hard-deletes a row. Returns true if it existed.
    pub async fn remove(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flags every row for the next push. Returns the number of rows touched.
    pub async fn mark_all_needs_sync(&self) -> DbResult<u64> {
        let result = sqlx::query("UPDATE items SET needs_sync = 1")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Removes synced tombstones deleted more than `older_than_days` ago.
    ///
    /// Pending deletes are never purged.
    pub async fn purge_tombstones(&self, older_than_days: i64) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(older_than_days);

        let stale: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM items
            WHERE needs_sync = 0 AND deleted_at IS NOT NULL AND deleted_at < ?1
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut purged = 0;
        for id in &stale {
            if self.remove(id).await? {
                purged += 1;
            }
        }

        debug!(purged, older_than_days, "Purged synced tombstones");
        Ok(purged)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
