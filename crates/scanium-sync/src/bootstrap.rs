//! # First Sign-In Bootstrap
//!
//! Uploads every item captured before the user first signed in.
//!
//! ```text
//! ┌──────────┐  flag Done          ┌──────────────────────────────┐
//! │ sign in  │ ──────────────────► │ (0, true), no I/O            │
//! └────┬─────┘                     └──────────────────────────────┘
//!      │ flag NotDone
//!      ▼
//! count items ── 0 ──► mark Done ──► (0, true)
//!      │ n > 0
//!      ▼
//! mark all needs_sync ──► sync_all() ── Success ──► mark Done ──► (n, true)
//!                                     └─ other ───► flag stays ─► (n, false)
//! ```
//!
//! A run that fails or is cancelled leaves the flag `NotDone`, so the next
//! sign-in tries again.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::SyncResult;
use crate::local::LocalStore;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::state::BootstrapFlagStore;

/// Result of [`BootstrapManager::handle_first_sign_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Local items queued for upload.
    pub item_count: i64,
    pub success: bool,
}

impl BootstrapReport {
    fn done(item_count: i64) -> Self {
        BootstrapReport {
            item_count,
            success: true,
        }
    }
}

pub struct BootstrapManager {
    orchestrator: Arc<SyncOrchestrator>,
    local: Arc<dyn LocalStore>,
    flag: BootstrapFlagStore,
}

impl BootstrapManager {
    pub fn new(
        orchestrator: Arc<SyncOrchestrator>,
        local: Arc<dyn LocalStore>,
        flag: BootstrapFlagStore,
    ) -> Self {
        BootstrapManager {
            orchestrator,
            local,
            flag,
        }
    }

    /// Runs the first-sign-in upload at most once to completion.
    pub async fn handle_first_sign_in(&self) -> BootstrapReport {
        let mut item_count = 0;
        match self.bootstrap(&mut item_count).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, item_count, "Bootstrap failed");
                BootstrapReport {
                    item_count,
                    success: false,
                }
            }
        }
    }

    async fn bootstrap(&self, item_count: &mut i64) -> SyncResult<BootstrapReport> {
        if self.flag.load().await?.is_done() {
            return Ok(BootstrapReport::done(0));
        }

        *item_count = self.local.count_items().await?;
        if *item_count == 0 {
            self.flag.mark_done().await?;
            info!("Bootstrap complete: no local items");
            return Ok(BootstrapReport::done(0));
        }

        let flagged = self.local.mark_all_needs_sync().await?;
        info!(items = *item_count, flagged, "Bootstrap: uploading local items");

        match self.orchestrator.sync_all().await {
            SyncOutcome::Success(stats) => {
                self.flag.mark_done().await?;
                info!(
                    items = *item_count,
                    pushed = stats.pushed,
                    "Bootstrap complete"
                );
                Ok(BootstrapReport::done(*item_count))
            }
            other => {
                warn!(outcome = %other, "Bootstrap sync did not succeed; will retry on next sign-in");
                Ok(BootstrapReport {
                    item_count: *item_count,
                    success: false,
                })
            }
        }
    }
}
