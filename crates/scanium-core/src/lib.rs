//! # scanium-core: Pure Item & Sync Types
//!
//! This crate holds the item model shared by the local store and the sync
//! engine, along with the pieces of sync logic that need no I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Scanium Sync Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            scanium-sync (orchestrator, scheduler, http)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ scanium-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐  ┌──────────────┐  ┌──────────────────────┐  │   │
//! │  │   │    types    │  │   conflict   │  │       error          │  │   │
//! │  │   │  LocalItem  │  │ LWW resolver │  │ CoreError            │  │   │
//! │  │   │  RemoteItem │  │   Winner     │  │ ValidationError      │  │   │
//! │  │   └─────────────┘  └──────────────┘  └──────────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 scanium-db (SQLite item store)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Items, payloads, sync-state classification
//! - [`conflict`] - Last-write-wins conflict resolution
//! - [`error`] - Domain error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use scanium_core::conflict::{ConflictResolver, Winner};
//!
//! let now = Utc::now();
//! assert_eq!(ConflictResolver::resolve(now, now - Duration::seconds(1)), Winner::Local);
//! assert_eq!(ConflictResolver::resolve(now, now), Winner::Remote);
//! ```

pub mod conflict;
pub mod error;
pub mod types;

pub use conflict::{ConflictResolver, Winner};
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

/// Number of remote items requested per pull cycle.
///
/// One page per cycle. The cursor still advances to the cycle's start time,
/// so remote changes that did not fit in the page are not fetched later.
pub const DEFAULT_PULL_PAGE_SIZE: u32 = 100;

/// Maximum length of an item title.
pub const MAX_TITLE_LEN: usize = 200;
