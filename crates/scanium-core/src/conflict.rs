//! # Conflict Resolution
//!
//! Last-write-wins over whole records.
//!
//! A conflict arises during the pull phase when the server reports an item
//! that also has unpushed local changes. The later `client_updated_at` wins
//! and replaces the other copy entirely; no field-level merge happens.
//!
//! ```text
//!   local.client_updated_at  >  remote.client_updated_at   →  Local
//!   local.client_updated_at  <= remote.client_updated_at   →  Remote
//! ```
//!
//! Ties go to the server copy so every device converges on the same record.

use chrono::{DateTime, Utc};

use crate::types::{LocalItem, RemoteItem};

/// Which copy of a conflicting item survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Local,
    Remote,
}

/// Stateless last-write-wins resolver.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Compares two client timestamps. Local wins only when strictly later.
    #[inline]
    pub fn resolve(local: DateTime<Utc>, remote: DateTime<Utc>) -> Winner {
        if local > remote {
            Winner::Local
        } else {
            Winner::Remote
        }
    }

    /// Resolves a conflict between a local row and the server's copy.
    pub fn resolve_items(local: &LocalItem, remote: &RemoteItem) -> Winner {
        Self::resolve(local.client_updated_at, remote.client_updated_at)
    }
}
