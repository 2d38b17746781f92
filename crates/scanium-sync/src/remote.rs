//! # Remote Client
//!
//! Request/response-shaped interface to the backend item API.
//!
//! ```text
//!  create_item(req)          → { id, syncVersion }
//!  update_item(id, req)      → { syncVersion }
//!  delete_item(id)           → { syncVersion }
//!  list_items(since, limit)  → { items: [...] }
//! ```
//!
//! Every call returns a typed [`RemoteError`]; the orchestrator decides from
//! the variant whether the failure is per-item or ends the cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scanium_core::{ItemPayload, LocalItem, RemoteItem};

use crate::error::RemoteError;

// =============================================================================
// Wire Types
// =============================================================================

/// Body of a create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Local id; also sent as the idempotency key.
    pub client_item_id: String,
    pub client_updated_at: DateTime<Utc>,
    pub payload: ItemPayload,
}

impl CreateItemRequest {
    pub fn from_local(item: &LocalItem) -> Self {
        CreateItemRequest {
            client_item_id: item.id.clone(),
            client_updated_at: item.client_updated_at,
            payload: item.payload.clone(),
        }
    }
}

/// Response to a create call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    pub id: String,
    pub sync_version: i64,
}

/// Body of an update call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// The version this edit was based on.
    pub sync_version: i64,
    pub client_updated_at: DateTime<Utc>,
    pub payload: ItemPayload,
}

impl UpdateItemRequest {
    pub fn from_local(item: &LocalItem) -> Self {
        UpdateItemRequest {
            sync_version: item.sync_version,
            client_updated_at: item.client_updated_at,
            payload: item.payload.clone(),
        }
    }
}

/// Version acknowledgement returned by update and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionAck {
    pub sync_version: i64,
}

/// One page of remote items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemPage {
    #[serde(default)]
    pub items: Vec<RemoteItem>,
}

// =============================================================================
// Remote Client Trait
// =============================================================================

/// Backend item API.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Creates an item; the backend assigns its id.
    async fn create_item(&self, request: &CreateItemRequest) -> Result<CreatedItem, RemoteError>;

    /// Replaces an item's content.
    async fn update_item(
        &self,
        server_id: &str,
        request: &UpdateItemRequest,
    ) -> Result<VersionAck, RemoteError>;

    /// Tombstones an item on the backend.
    async fn delete_item(&self, server_id: &str) -> Result<VersionAck, RemoteError>;

    /// Lists items changed after `since` (all items when `None`), at most
    /// `limit` of them.
    async fn list_items(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<ItemPage, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_wire_format() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let mut item = LocalItem::new_local(ItemPayload::titled("Camera"), now);
        item.sync_version = 4;

        let create = serde_json::to_value(CreateItemRequest::from_local(&item)).unwrap();
        assert_eq!(create["clientItemId"], item.id.as_str());
        assert_eq!(create["payload"]["title"], "Camera");

        let update = serde_json::to_value(UpdateItemRequest::from_local(&item)).unwrap();
        assert_eq!(update["syncVersion"], 4);
        assert!(update.get("clientUpdatedAt").is_some());
    }

    #[test]
    fn test_empty_page_decodes() {
        let page: ItemPage = serde_json::from_str("{}").unwrap();
        assert!(page.items.is_empty());

        let ack: VersionAck = serde_json::from_str(r#"{"syncVersion": 9}"#).unwrap();
        assert_eq!(ack.sync_version, 9);
    }
}
