//! # Sync Engine
//!
//! Wires configuration, the SQLite store and the HTTP client into one
//! orchestrator, and hands out the scheduler and bootstrap entry points
//! built on it.
//!
//! ## Usage
//! ```rust,ignore
//! let auth = Arc::new(SessionAuth::new());
//! let engine = SyncEngine::open(SyncConfig::load(None)?, auth.clone()).await?;
//!
//! auth.sign_in(token);
//! engine.handle_first_sign_in().await;
//!
//! let scheduler = engine.start_scheduler(Arc::new(AlwaysAllowed));
//! let report = scheduler.run_now().await;
//! ```

use std::sync::Arc;

use tracing::info;

use scanium_db::Database;

use crate::auth::AuthProvider;
use crate::bootstrap::{BootstrapManager, BootstrapReport};
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::http::HttpRemoteClient;
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};
use crate::remote::RemoteClient;
use crate::scheduler::{
    BackgroundScheduler, JobConstraints, SchedulePolicy, SchedulerHandle, SyncEventEmitter,
};
use crate::state::{BootstrapFlagStore, CursorStore, KeyValueStore};

/// Fully wired sync engine for one signed-in device.
pub struct SyncEngine {
    config: SyncConfig,
    db: Database,
    orchestrator: Arc<SyncOrchestrator>,
    bootstrap: BootstrapManager,
}

impl SyncEngine {
    /// Opens the database named in `config` and builds the HTTP client.
    pub async fn open(config: SyncConfig, auth: Arc<dyn AuthProvider>) -> SyncResult<Self> {
        config.validate()?;

        let db_config = config.database.db_config()?;
        if let Some(parent) = db_config.database_path.parent() {
            if !db_config.is_in_memory() && !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::new(db_config).await?;
        let remote = Arc::new(HttpRemoteClient::new(&config.remote, auth.clone())?);

        Ok(Self::with_parts(config, db, remote, auth))
    }

    /// Builds an engine over an existing database and remote client.
    pub fn with_parts(
        config: SyncConfig,
        db: Database,
        remote: Arc<dyn RemoteClient>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::new(db.clone());
        let local = Arc::new(db.clone());

        let orchestrator = Arc::new(
            SyncOrchestrator::new(remote, local.clone(), auth, CursorStore::new(kv.clone()))
                .with_pull_page_size(config.sync.pull_page_size),
        );
        let bootstrap =
            BootstrapManager::new(orchestrator.clone(), local, BootstrapFlagStore::new(kv));

        info!(
            base_url = %config.remote.base_url,
            pull_page_size = config.sync.pull_page_size,
            "Sync engine ready"
        );

        SyncEngine {
            config,
            db,
            orchestrator,
            bootstrap,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The local item store, for the app's own edits.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        self.orchestrator.clone()
    }

    /// Runs one cycle outside the scheduler's guard.
    pub async fn sync_now(&self) -> SyncOutcome {
        self.orchestrator.sync_all().await
    }

    pub async fn handle_first_sign_in(&self) -> BootstrapReport {
        self.bootstrap.handle_first_sign_in().await
    }

    /// Starts the periodic job with the configured timing.
    pub fn start_scheduler(&self, constraints: Arc<dyn JobConstraints>) -> SchedulerHandle {
        BackgroundScheduler::spawn(
            self.orchestrator.clone(),
            SchedulePolicy::from(&self.config.scheduler),
            constraints,
        )
    }

    pub fn start_scheduler_with_emitter(
        &self,
        constraints: Arc<dyn JobConstraints>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SchedulerHandle {
        BackgroundScheduler::spawn_with_emitter(
            self.orchestrator.clone(),
            SchedulePolicy::from(&self.config.scheduler),
            constraints,
            emitter,
        )
    }
}
