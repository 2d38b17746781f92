//! # Repository Module
//!
//! Database repository implementations for the Scanium item store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  App / sync engine                                                      │
//! │       │                                                                 │
//! │       │  db.items().list_pending()                                      │
//! │       ▼                                                                 │
//! │  ItemRepository                                                         │
//! │  ├── local edits:  create, update_payload, soft_delete                  │
//! │  ├── push phase:   list_pending, mark_created, mark_synced, remove      │
//! │  ├── apply phase:  get_by_server_id, insert, overwrite_from_remote      │
//! │  │                 rebase_version                                       │
//! │  └── maintenance:  purge_tombstones, mark_all_needs_sync                │
//! │                                                                         │
//! │  SyncStateRepository                                                    │
//! │  └── get / put / delete on the sync_state key/value table               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod item;
pub mod sync_state;
