//! # scanium-sync: Item Sync Engine for Scanium
//!
//! This crate keeps the on-device item store and the Scanium backend in
//! step. Items are edited offline; a cycle pushes local edits, pulls what
//! changed remotely, and settles conflicts by last write wins.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Sync Engine Architecture                        │
//! │                                                                         │
//! │  ┌───────────────────────┐          ┌──────────────────────────────┐   │
//! │  │  BackgroundScheduler  │          │      BootstrapManager        │   │
//! │  │                       │          │                              │   │
//! │  │ periodic tokio task   │          │ first sign-in: flag every    │   │
//! │  │ constraints + backoff │          │ item, one full cycle, mark   │   │
//! │  │ run_now() for "retry" │          │ done on success              │   │
//! │  └───────────┬───────────┘          └──────────────┬───────────────┘   │
//! │              └──────────────────┬──────────────────┘                   │
//! │                                 ▼                                       │
//! │              ┌───────────────────────────────────────┐                 │
//! │              │           SyncOrchestrator            │                 │
//! │              │   auth gate → push → pull → apply     │                 │
//! │              └──┬──────────────┬──────────────────┬──┘                 │
//! │                 ▼              ▼                  ▼                     │
//! │        ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐          │
//! │        │ RemoteClient │ │  LocalStore  │ │ CursorStore      │          │
//! │        │ HttpRemote-  │ │  (SQLite via │ │ BootstrapFlag-   │          │
//! │        │ Client       │ │  scanium-db) │ │ Store (KV)       │          │
//! │        └──────────────┘ └──────────────┘ └──────────────────┘          │
//! │                                                                         │
//! │  STATUS (to the host UI):                                              │
//! │  • SyncEventEmitter::emit_status after every run                       │
//! │  • SyncEventEmitter::emit_error when a run did not succeed             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Item Sync States
//! ```text
//!  state            server_id   deleted_at   needs_sync   push action
//!  ───────────────  ──────────  ───────────  ───────────  ───────────
//!  NeverSynced      None        None         true         CREATE
//!  PendingUpdate    Some        None         true         UPDATE
//!  PendingDelete    Some        Some         true         DELETE
//!  LocalTombstone   None        Some         true         DROP_LOCAL
//!  Synced           any         any          false        none
//! ```
//!
//! ## Modules
//!
//! - [`orchestrator`] - One push-then-pull cycle
//! - [`scheduler`] - Periodic job, named-job guard, retry backoff
//! - [`bootstrap`] - First sign-in full upload
//! - [`remote`] - Backend interface and wire types
//! - [`http`] - reqwest implementation of the backend interface
//! - [`local`] - Local item store interface
//! - [`state`] - Pull cursor and bootstrap flag persistence
//! - [`auth`] - Signed-in check and bearer token
//! - [`engine`] - Wires everything from a [`SyncConfig`]
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Error types

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod local;
pub mod orchestrator;
pub mod remote;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod testing;

pub use auth::{AuthProvider, SessionAuth};
pub use bootstrap::{BootstrapManager, BootstrapReport};
pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{RemoteError, SyncError, SyncResult};
pub use http::HttpRemoteClient;
pub use local::LocalStore;
pub use orchestrator::{PushFailure, SyncOrchestrator, SyncOutcome, SyncStats};
pub use remote::RemoteClient;
pub use scheduler::{
    AlwaysAllowed, BackgroundScheduler, JobConstraints, JobOutcome, NoOpEmitter, RetryReport,
    SchedulePolicy, SchedulerHandle, SyncEventEmitter, SyncStatus,
};
pub use state::{BootstrapFlagStore, Clock, CursorStore, KeyValueStore, SystemClock};
