//! # Sync Error Types
//!
//! Error types for sync operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────┐  ┌─────────────────────┐ │
//! │  │  Configuration  │  │   Remote (typed)    │  │     Local store     │ │
//! │  │                 │  │                     │  │                     │ │
//! │  │  InvalidConfig  │  │  Network        ──┐ │  │  Store              │ │
//! │  │  InvalidUrl     │  │  Unauthorized   ──┤ │  │  SerializationFailed│ │
//! │  │  ConfigLoad/Save│  │  Conflict         │ │  │                     │ │
//! │  └─────────────────┘  │  Server{status}   │ │  └─────────────────────┘ │
//! │                       │  Decode           │ │                          │
//! │                       └───────────────────┼─┘                          │
//! │                                           │                            │
//! │                 abort the cycle ◄─────────┘                            │
//! │                 (everything else fails one item only)                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

// =============================================================================
// Remote Error
// =============================================================================

/// Typed failure of a single backend call.
///
/// Classification happens on this enum, never on message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Backend unreachable (connect failure, timeout, dropped connection).
    #[error("Network error: {0}")]
    Network(String),

    /// Credentials missing, expired, or rejected (401/403).
    #[error("Not authorized")]
    Unauthorized,

    /// The backend rejected a write as conflicting (409).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Any other non-success status.
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Returns true if this error ends the whole sync cycle rather than
    /// failing a single item.
    pub fn aborts_cycle(&self) -> bool {
        matches!(self, RemoteError::Network(_) | RemoteError::Unauthorized)
    }

    /// Convenience constructor for server errors.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Server {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}

// =============================================================================
// Sync Error
// =============================================================================

/// Sync error type covering engine, configuration, and store failures.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Invalid backend URL.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// A backend call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// The local item store or key/value store failed.
    #[error("Local store error: {0}")]
    Store(String),

    /// Failed to serialize or parse persisted state.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// The scheduler task has already stopped.
    #[error("Sync scheduler is shutting down")]
    ShuttingDown,

    /// Internal sync engine error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<scanium_db::DbError> for SyncError {
    fn from(err: scanium_db::DbError) -> Self {
        SyncError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt may succeed without user action.
    ///
    /// ## Retryable Errors
    /// - Network failures
    /// - Server-side failures (4xx/5xx other than auth)
    /// - Local store failures (disk busy, pool exhausted)
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Authorization failures
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(RemoteError::Unauthorized) => false,
            SyncError::Remote(_) => true,
            SyncError::Store(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
