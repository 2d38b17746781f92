//! # Authentication
//!
//! The engine only needs to know whether a user is signed in and, for the
//! HTTP client, which bearer token to send. Sign-in itself happens elsewhere.

use std::sync::RwLock;
use tracing::info;

/// Source of the current session.
pub trait AuthProvider: Send + Sync {
    /// Returns true if a user is signed in.
    fn is_signed_in(&self) -> bool;

    /// Returns the bearer token for backend calls, if signed in.
    fn access_token(&self) -> Option<String>;
}

/// Session holder the host application updates on sign-in and sign-out.
#[derive(Debug, Default)]
pub struct SessionAuth {
    token: RwLock<Option<String>>,
}

impl SessionAuth {
    /// Creates a signed-out session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that is already signed in.
    pub fn with_token(token: impl Into<String>) -> Self {
        SessionAuth {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Stores a fresh token.
    pub fn sign_in(&self, token: impl Into<String>) {
        info!("Session signed in");
        *self.write() = Some(token.into());
    }

    /// Drops the token.
    pub fn sign_out(&self) {
        info!("Session signed out");
        *self.write() = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuthProvider for SessionAuth {
    fn is_signed_in(&self) -> bool {
        self.access_token().is_some()
    }

    fn access_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
