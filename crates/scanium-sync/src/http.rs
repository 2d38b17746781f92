//! # HTTP Remote Client
//!
//! [`RemoteClient`] over the backend's JSON item API.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST   {base}/v1/items             Idempotency-Key: <local id>         │
//! │         {clientItemId, clientUpdatedAt, payload} → {id, syncVersion}    │
//! │  PUT    {base}/v1/items/{id}                                            │
//! │         {syncVersion, clientUpdatedAt, payload}  → {syncVersion}        │
//! │  DELETE {base}/v1/items/{id}                     → {syncVersion}        │
//! │  GET    {base}/v1/items?since=<rfc3339>&limit=n  → {items: [...]}       │
//! │                                                                         │
//! │  All requests carry `Authorization: Bearer <token>`.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Mapping
//! ```text
//! 2xx            → Ok
//! 401, 403       → RemoteError::Unauthorized
//! 409            → RemoteError::Conflict
//! other non-2xx  → RemoteError::Server { status }
//! send failure   → RemoteError::Network
//! bad body       → RemoteError::Decode
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::AuthProvider;
use crate::config::RemoteSettings;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::remote::{
    CreateItemRequest, CreatedItem, ItemPage, RemoteClient, UpdateItemRequest, VersionAck,
};

/// reqwest-backed item API client.
pub struct HttpRemoteClient {
    client: Client,
    items_url: String,
    auth: Arc<dyn AuthProvider>,
}

impl HttpRemoteClient {
    /// Builds a client for `settings.base_url`.
    pub fn new(settings: &RemoteSettings, auth: Arc<dyn AuthProvider>) -> SyncResult<Self> {
        let base = Url::parse(&settings.base_url)?;

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .connect_timeout(settings.connect_timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(HttpRemoteClient {
            client,
            items_url: format!("{}/v1/items", base.as_str().trim_end_matches('/')),
            auth,
        })
    }

    fn item_url(&self, server_id: &str) -> String {
        format!("{}/{}", self.items_url, server_id)
    }

    /// Attaches the bearer token and sends.
    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let token = self.auth.access_token().ok_or(RemoteError::Unauthorized)?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response).await
    }
}

/// Maps non-success statuses onto [`RemoteError`].
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "Backend returned error status");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        StatusCode::CONFLICT => RemoteError::Conflict { message },
        other => RemoteError::Server {
            status: other.as_u16(),
            message,
        },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn create_item(&self, request: &CreateItemRequest) -> Result<CreatedItem, RemoteError> {
        let builder = self
            .client
            .post(&self.items_url)
            .header("Idempotency-Key", &request.client_item_id)
            .json(request);

        decode(self.send(builder).await?).await
    }

    async fn update_item(
        &self,
        server_id: &str,
        request: &UpdateItemRequest,
    ) -> Result<VersionAck, RemoteError> {
        let builder = self.client.put(self.item_url(server_id)).json(request);
        decode(self.send(builder).await?).await
    }

    async fn delete_item(&self, server_id: &str) -> Result<VersionAck, RemoteError> {
        let builder = self.client.delete(self.item_url(server_id));
        decode(self.send(builder).await?).await
    }

    async fn list_items(
        &self,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<ItemPage, RemoteError> {
        let mut builder = self
            .client
            .get(&self.items_url)
            .query(&[("limit", limit.to_string())]);

        if let Some(since) = since {
            builder = builder.query(&[("since", since.to_rfc3339_opts(SecondsFormat::Millis, true))]);
        }

        decode(self.send(builder).await?).await
    }
}
