//! # Persisted Sync State
//!
//! Two scalars live outside the item rows: the pull cursor and the
//! bootstrap flag. Each is a small value object over a shared
//! [`KeyValueStore`] and owns exactly one key.
//!
//! ```text
//!  CursorStore         ── "sync.pull_cursor"    ── RFC 3339 instant
//!  BootstrapFlagStore  ── "sync.bootstrap_done" ── "true" | absent
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use scanium_core::BootstrapFlag;
use scanium_db::Database;

use crate::error::SyncResult;

/// Key holding the pull watermark.
pub const CURSOR_KEY: &str = "sync.pull_cursor";

/// Key holding the bootstrap flag.
pub const BOOTSTRAP_KEY: &str = "sync.bootstrap_done";

// =============================================================================
// Key/Value Store
// =============================================================================

/// String key/value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> SyncResult<()>;
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.sync_state().get(key).await?)
    }

    async fn put(&self, key: &str, value: &str) -> SyncResult<()> {
        Ok(self.sync_state().put(key, value).await?)
    }
}

/// Process-local store, for hosts without a database and for tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> SyncResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// Cursor Store
// =============================================================================

/// The watermark of the last successful pull.
#[derive(Clone)]
pub struct CursorStore {
    kv: Arc<dyn KeyValueStore>,
}

impl CursorStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        CursorStore { kv }
    }

    /// Reads the cursor. An unreadable value is treated as absent, which
    /// makes the next pull start from the beginning.
    pub async fn load(&self) -> SyncResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(CURSOR_KEY).await? else {
            return Ok(None);
        };

        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(value = %raw, error = %e, "Discarding unreadable pull cursor");
                Ok(None)
            }
        }
    }

    /// Moves the cursor to `at`.
    pub async fn save(&self, at: DateTime<Utc>) -> SyncResult<()> {
        debug!(cursor = %at, "Advancing pull cursor");
        self.kv
            .put(CURSOR_KEY, &at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .await
    }
}

// =============================================================================
// Bootstrap Flag Store
// =============================================================================

/// Whether the first-sign-in full upload has completed.
#[derive(Clone)]
pub struct BootstrapFlagStore {
    kv: Arc<dyn KeyValueStore>,
}

impl BootstrapFlagStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        BootstrapFlagStore { kv }
    }

    pub async fn load(&self) -> SyncResult<BootstrapFlag> {
        let flag = match self.kv.get(BOOTSTRAP_KEY).await?.as_deref() {
            Some("true") => BootstrapFlag::Done,
            _ => BootstrapFlag::NotDone,
        };
        Ok(flag)
    }

    pub async fn mark_done(&self) -> SyncResult<()> {
        self.kv.put(BOOTSTRAP_KEY, "true").await
    }
}

// =============================================================================
// Clock
// =============================================================================

/// Source of "now" for the cursor.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use scanium_db::DbConfig;

    #[tokio::test]
    async fn test_cursor_roundtrip_in_memory() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let cursor = CursorStore::new(kv.clone());
        assert_eq!(cursor.load().await.unwrap(), None);

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        cursor.save(at).await.unwrap();
        assert_eq!(cursor.load().await.unwrap(), Some(at));

        assert_eq!(
            kv.get(CURSOR_KEY).await.unwrap().as_deref(),
            Some("2024-05-01T10:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_unreadable_cursor_is_absent() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        kv.put(CURSOR_KEY, "yesterday").await.unwrap();
        assert_eq!(CursorStore::new(kv).load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_flag_and_cursor_persist_in_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let kv: Arc<dyn KeyValueStore> = Arc::new(db.clone());

        let flag = BootstrapFlagStore::new(kv.clone());
        let cursor = CursorStore::new(kv.clone());

        assert_eq!(flag.load().await.unwrap(), BootstrapFlag::NotDone);
        flag.mark_done().await.unwrap();

        let at = Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap();
        cursor.save(at).await.unwrap();

        // Fresh value objects over the same database see the same state
        let kv: Arc<dyn KeyValueStore> = Arc::new(db);
        assert!(BootstrapFlagStore::new(kv.clone()).load().await.unwrap().is_done());
        assert_eq!(CursorStore::new(kv).load().await.unwrap(), Some(at));
    }
}
