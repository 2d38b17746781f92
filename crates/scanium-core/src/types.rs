//! # Item Types
//!
//! Item types shared by the local store and the sync engine.
//!
//! ## Sync-State Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LocalItem Sync States                            │
//! │                                                                         │
//! │  needs_sync │ server_id │ deleted_at │ state            │ push action   │
//! │  ───────────┼───────────┼────────────┼──────────────────┼────────────── │
//! │  false      │    any    │    any     │ Synced           │ (none)        │
//! │  true       │   None    │   None     │ NeverSynced      │ Create        │
//! │  true       │   Some    │   Some     │ PendingDelete    │ Delete        │
//! │  true       │   Some    │   None     │ PendingUpdate    │ Update        │
//! │  true       │   None    │   Some     │ LocalTombstone   │ DropLocal     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! Every item has:
//! - `id`: UUID v4 assigned on device, stable for the life of the row
//! - `server_id`: assigned by the backend on first successful create, then immutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::MAX_TITLE_LEN;

// =============================================================================
// Item Payload
// =============================================================================

/// The user-facing content of a scanned item.
///
/// The sync engine never looks inside the payload; it is stored and
/// transmitted as one JSON document and replaced wholesale on conflict.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPayload {
    /// Display title (e.g. "Vintage leather jacket").
    pub title: String,

    /// Marketplace category the classifier assigned.
    #[serde(default)]
    pub category: Option<String>,

    /// Raw classifier label.
    #[serde(default)]
    pub label: Option<String>,

    /// Classifier confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f32>,

    /// Lower bound of the resale price estimate, in cents.
    #[serde(default)]
    pub price_low_cents: Option<i64>,

    /// Upper bound of the resale price estimate, in cents.
    #[serde(default)]
    pub price_high_cents: Option<i64>,

    /// Free-form user notes.
    #[serde(default)]
    pub notes: Option<String>,

    /// Location of the captured image.
    #[serde(default)]
    pub image_uri: Option<String>,

    /// Extra attributes (brand, color, size...).
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ItemPayload {
    /// Creates a payload with just a title.
    pub fn titled(title: impl Into<String>) -> Self {
        ItemPayload {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Validates the payload before it is written locally.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Required {
                field: "title".to_string(),
            });
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TooLong {
                field: "title".to_string(),
                max: MAX_TITLE_LEN,
            });
        }

        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ValidationError::InvalidFormat {
                    field: "confidence".to_string(),
                    reason: format!("{} is outside [0, 1]", confidence),
                });
            }
        }

        for (field, value) in [
            ("price_low_cents", self.price_low_cents),
            ("price_high_cents", self.price_high_cents),
        ] {
            if matches!(value, Some(v) if v < 0) {
                return Err(ValidationError::MustBePositive {
                    field: field.to_string(),
                });
            }
        }

        if let (Some(low), Some(high)) = (self.price_low_cents, self.price_high_cents) {
            if low > high {
                return Err(ValidationError::InvalidRange {
                    field: "price".to_string(),
                    low,
                    high,
                });
            }
        }

        Ok(())
    }
}

// =============================================================================
// Local Item
// =============================================================================

/// An item row in the on-device store, including its sync-control fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalItem {
    /// Local identifier (UUID v4), stable.
    pub id: String,

    /// Backend identifier, assigned once by a successful create.
    pub server_id: Option<String>,

    /// Whether the row carries changes the backend has not acknowledged.
    pub needs_sync: bool,

    /// Server-assigned version; only ever set from server responses.
    pub sync_version: i64,

    /// Time of the last local edit (drives last-write-wins).
    pub client_updated_at: DateTime<Utc>,

    /// Tombstone marker.
    pub deleted_at: Option<DateTime<Utc>>,

    /// When the row was first written on this device.
    pub created_at: DateTime<Utc>,

    /// Opaque item content.
    pub payload: ItemPayload,
}

impl LocalItem {
    /// Creates a never-synced item for a fresh scan.
    pub fn new_local(payload: ItemPayload, now: DateTime<Utc>) -> Self {
        LocalItem {
            id: Uuid::new_v4().to_string(),
            server_id: None,
            needs_sync: true,
            sync_version: 0,
            client_updated_at: now,
            deleted_at: None,
            created_at: now,
            payload,
        }
    }

    /// Creates a synced local row for a remote item with no local match.
    pub fn from_remote(remote: &RemoteItem) -> Self {
        LocalItem {
            id: Uuid::new_v4().to_string(),
            server_id: Some(remote.id.clone()),
            needs_sync: false,
            sync_version: remote.sync_version,
            client_updated_at: remote.client_updated_at,
            deleted_at: remote.deleted_at,
            created_at: remote.created_at,
            payload: remote.payload.clone(),
        }
    }

    /// Overwrites the syncable fields with the server's copy.
    ///
    /// `server_id` is left alone when already set and `sync_version` never
    /// moves backwards.
    pub fn apply_remote(&mut self, remote: &RemoteItem) {
        if self.server_id.is_none() {
            self.server_id = Some(remote.id.clone());
        }
        self.sync_version = self.sync_version.max(remote.sync_version);
        self.client_updated_at = remote.client_updated_at;
        self.deleted_at = remote.deleted_at;
        self.payload = remote.payload.clone();
        self.needs_sync = false;
    }

    /// Returns true if the item is locally deleted.
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Classifies the row's sync state.
    pub fn sync_state(&self) -> ItemSyncState {
        ItemSyncState::of(self)
    }
}

// =============================================================================
// Remote Item
// =============================================================================

/// An item as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Server identifier.
    pub id: String,
    pub sync_version: i64,
    pub created_at: DateTime<Utc>,
    pub client_updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub payload: ItemPayload,
}

// =============================================================================
// Sync State
// =============================================================================

/// Where a local row stands relative to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSyncState {
    /// Created locally, never pushed.
    NeverSynced,
    /// Known to the server, edited locally since.
    PendingUpdate,
    /// Known to the server, deleted locally since.
    PendingDelete,
    /// Deleted locally before it ever reached the server.
    LocalTombstone,
    /// Nothing to push.
    Synced,
}

impl ItemSyncState {
    /// Classifies a local row.
    pub fn of(item: &LocalItem) -> Self {
        if !item.needs_sync {
            return ItemSyncState::Synced;
        }
        match (item.server_id.is_some(), item.deleted_at.is_some()) {
            (false, false) => ItemSyncState::NeverSynced,
            (false, true) => ItemSyncState::LocalTombstone,
            (true, true) => ItemSyncState::PendingDelete,
            (true, false) => ItemSyncState::PendingUpdate,
        }
    }

    /// The push-phase action for this state, if any.
    pub fn push_action(&self) -> Option<PushAction> {
        match self {
            ItemSyncState::NeverSynced => Some(PushAction::Create),
            ItemSyncState::PendingUpdate => Some(PushAction::Update),
            ItemSyncState::PendingDelete => Some(PushAction::Delete),
            ItemSyncState::LocalTombstone => Some(PushAction::DropLocal),
            ItemSyncState::Synced => None,
        }
    }
}

/// The remote operation the push phase performs for a pending row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushAction {
    Create,
    Update,
    Delete,
    /// Never-synced tombstone: removed locally, nothing sent.
    DropLocal,
}

impl std::fmt::Display for PushAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushAction::Create => write!(f, "create"),
            PushAction::Update => write!(f, "update"),
            PushAction::Delete => write!(f, "delete"),
            PushAction::DropLocal => write!(f, "drop_local"),
        }
    }
}

// =============================================================================
// Bootstrap Flag
// =============================================================================

/// Whether the first-sign-in full upload has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapFlag {
    #[default]
    NotDone,
    Done,
}

impl BootstrapFlag {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, BootstrapFlag::Done)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
