//! # Background Scheduler
//!
//! Periodic driver for the sync job, plus the on-demand "retry sync" entry
//! point used by the UI.
//!
//! ## Job Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scheduler Task (tokio)                             │
//! │                                                                         │
//! │   sleep(delay) ──┬── shutdown ──► stop                                  │
//! │                  ▼                                                      │
//! │        constraints met? ── no ──► delay = interval                      │
//! │                  │ yes                                                  │
//! │                  ▼                                                      │
//! │        job guard free? ── no ──► Skipped, delay = interval              │
//! │                  │ yes                                                  │
//! │                  ▼                                                      │
//! │        spawn(sync_all) ──► JobOutcome                                   │
//! │                  │                                                      │
//! │     ┌────────────┼─────────────────┬──────────────────┐                 │
//! │     ▼            ▼                 ▼                  ▼                 │
//! │  Success      Failure            Retry             Skipped              │
//! │  reset        delay =            delay =           delay =              │
//! │  backoff,     interval           next backoff      interval             │
//! │  interval                        (initial..max)                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Outcome Mapping
//! ```text
//! SyncOutcome::Success            → JobOutcome::Success
//! SyncOutcome::NotAuthenticated   → JobOutcome::Failure  (not retried)
//! SyncOutcome::NetworkError       → JobOutcome::Retry
//! SyncOutcome::ServerError        → JobOutcome::Retry
//! cycle task panicked             → JobOutcome::Retry
//! ```

use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::SchedulerSettings;
use crate::error::{SyncError, SyncResult};
use crate::orchestrator::{SyncOrchestrator, SyncOutcome};

// =============================================================================
// Job Outcome
// =============================================================================

/// What the scheduler does after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    /// Terminal for this period; the next firing happens on schedule.
    Failure,
    /// Transient; retried after backoff.
    Retry,
    /// Not run because a run of the same job was in progress.
    Skipped,
}

impl JobOutcome {
    pub fn from_sync(outcome: &SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Success(_) => JobOutcome::Success,
            SyncOutcome::NotAuthenticated => JobOutcome::Failure,
            SyncOutcome::NetworkError(_) | SyncOutcome::ServerError(_) => JobOutcome::Retry,
        }
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "success"),
            JobOutcome::Failure => write!(f, "failure"),
            JobOutcome::Retry => write!(f, "retry"),
            JobOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

// =============================================================================
// Schedule Policy
// =============================================================================

/// Timing of the periodic job.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    pub job_name: String,
    pub interval: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl From<&SchedulerSettings> for SchedulePolicy {
    fn from(settings: &SchedulerSettings) -> Self {
        SchedulePolicy {
            job_name: settings.job_name.clone(),
            interval: settings.interval(),
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
        }
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        SchedulePolicy::from(&SchedulerSettings::default())
    }
}

// =============================================================================
// Constraints
// =============================================================================

/// Device conditions a periodic firing requires.
pub trait JobConstraints: Send + Sync {
    fn network_available(&self) -> bool;

    fn battery_not_low(&self) -> bool;

    fn satisfied(&self) -> bool {
        self.network_available() && self.battery_not_low()
    }
}

/// Constraints that always hold.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllowed;

impl JobConstraints for AlwaysAllowed {
    fn network_available(&self) -> bool {
        true
    }

    fn battery_not_low(&self) -> bool {
        true
    }
}

// =============================================================================
// Status & Events
// =============================================================================

/// Snapshot of the sync job.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub job_name: String,

    /// Whether a run is in progress.
    pub running: bool,

    /// Result of the last cycle that actually ran.
    pub last_outcome: Option<SyncOutcome>,

    pub last_job_outcome: Option<JobOutcome>,

    pub last_success_at: Option<DateTime<Utc>>,

    pub last_error: Option<String>,

    /// Rows waiting to be pushed, as of the last run.
    pub pending_count: i64,
}

/// Receives status changes for the host UI.
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a sync status change event.
    fn emit_status(&self, status: &SyncStatus);

    /// Emits a sync error event.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

/// Result of an explicit "retry sync".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryReport {
    pub outcome: JobOutcome,
    /// The cycle result, absent when skipped or the cycle panicked.
    pub sync: Option<SyncOutcome>,
    /// Items pushed.
    pub succeeded: usize,
    /// Items that failed to push, or every pending item if the cycle failed.
    pub failed: usize,
}

// =============================================================================
// Job Runner
// =============================================================================

/// Runs the named job under its guard and records the result.
struct JobRunner {
    orchestrator: Arc<SyncOrchestrator>,
    guard: Mutex<()>,
    status: RwLock<SyncStatus>,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl JobRunner {
    async fn run(&self) -> (JobOutcome, Option<SyncOutcome>) {
        let Ok(_running) = self.guard.try_lock() else {
            debug!("Sync job already running; skipping");
            return (JobOutcome::Skipped, None);
        };

        self.status.write().await.running = true;

        let orchestrator = self.orchestrator.clone();
        let joined = tokio::spawn(async move { orchestrator.sync_all().await }).await;

        let (job_outcome, sync_outcome) = match joined {
            Ok(outcome) => (JobOutcome::from_sync(&outcome), Some(outcome)),
            Err(e) => {
                warn!(error = %e, "Sync job task failed");
                (JobOutcome::Retry, None)
            }
        };

        self.record(job_outcome, sync_outcome.as_ref()).await;
        (job_outcome, sync_outcome)
    }

    async fn record(&self, job_outcome: JobOutcome, sync_outcome: Option<&SyncOutcome>) {
        let pending = match self.orchestrator.pending_count().await {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Failed to count pending items");
                None
            }
        };

        let error = match sync_outcome {
            Some(SyncOutcome::Success(_)) => None,
            Some(other) => Some(other.to_string()),
            None => Some("sync task did not complete".to_string()),
        };

        let snapshot = {
            let mut status = self.status.write().await;
            status.running = false;
            status.last_job_outcome = Some(job_outcome);
            status.last_outcome = sync_outcome.cloned();
            if let Some(n) = pending {
                status.pending_count = n;
            }
            match &error {
                None => {
                    status.last_success_at = Some(Utc::now());
                    status.last_error = None;
                }
                Some(message) => status.last_error = Some(message.clone()),
            }
            status.clone()
        };

        info!(
            job = %snapshot.job_name,
            outcome = %job_outcome,
            pending = snapshot.pending_count,
            "Sync job finished"
        );

        self.emitter.emit_status(&snapshot);
        if let Some(message) = error {
            self.emitter
                .emit_error(&message, job_outcome == JobOutcome::Retry);
        }
    }
}

// =============================================================================
// Background Scheduler
// =============================================================================

/// Spawns the periodic sync job.
pub struct BackgroundScheduler;

impl BackgroundScheduler {
    /// Starts the job on the current tokio runtime.
    ///
    /// The first firing happens one interval after spawn. Dropping every
    /// [`SchedulerHandle`] stops the job.
    pub fn spawn(
        orchestrator: Arc<SyncOrchestrator>,
        policy: SchedulePolicy,
        constraints: Arc<dyn JobConstraints>,
    ) -> SchedulerHandle {
        Self::spawn_with_emitter(orchestrator, policy, constraints, Arc::new(NoOpEmitter))
    }

    /// Starts the job with a custom event emitter.
    pub fn spawn_with_emitter(
        orchestrator: Arc<SyncOrchestrator>,
        policy: SchedulePolicy,
        constraints: Arc<dyn JobConstraints>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> SchedulerHandle {
        let runner = Arc::new(JobRunner {
            orchestrator,
            guard: Mutex::new(()),
            status: RwLock::new(SyncStatus {
                job_name: policy.job_name.clone(),
                ..Default::default()
            }),
            emitter,
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        info!(
            job = %policy.job_name,
            interval_secs = policy.interval.as_secs(),
            "Starting sync scheduler"
        );
        tokio::spawn(Self::run_loop(
            runner.clone(),
            policy,
            constraints,
            shutdown_rx,
        ));

        SchedulerHandle {
            runner,
            shutdown_tx,
        }
    }

    async fn run_loop(
        runner: Arc<JobRunner>,
        policy: SchedulePolicy,
        constraints: Arc<dyn JobConstraints>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let mut backoff = retry_backoff(&policy);
        let mut delay = policy.interval;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => {
                    info!(job = %policy.job_name, "Sync scheduler received shutdown");
                    break;
                }
            }

            if !constraints.satisfied() {
                debug!(
                    network = constraints.network_available(),
                    battery_ok = constraints.battery_not_low(),
                    "Constraints not met; skipping sync"
                );
                delay = policy.interval;
                continue;
            }

            let (outcome, _) = runner.run().await;
            delay = match outcome {
                JobOutcome::Success => {
                    backoff.reset();
                    policy.interval
                }
                JobOutcome::Retry => {
                    let wait = backoff.next_backoff().unwrap_or(policy.max_backoff);
                    debug!(retry_in_ms = wait.as_millis() as u64, "Scheduling sync retry");
                    wait
                }
                JobOutcome::Failure | JobOutcome::Skipped => policy.interval,
            };
        }

        info!(job = %policy.job_name, "Sync scheduler stopped");
    }
}

fn retry_backoff(policy: &SchedulePolicy) -> ExponentialBackoff {
    let mut backoff = ExponentialBackoff {
        current_interval: policy.initial_backoff,
        initial_interval: policy.initial_backoff,
        max_interval: policy.max_backoff,
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    };
    backoff.reset();
    backoff
}

// =============================================================================
// Scheduler Handle
// =============================================================================

/// Handle for controlling a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    runner: Arc<JobRunner>,
    shutdown_tx: mpsc::Sender<()>,
}

impl SchedulerHandle {
    /// Runs one cycle now, through the same guard as the periodic firing.
    pub async fn run_now(&self) -> RetryReport {
        let (outcome, sync) = self.runner.run().await;

        let (succeeded, failed) = match &sync {
            Some(SyncOutcome::Success(stats)) => (stats.pushed, stats.push_failures.len()),
            _ if outcome == JobOutcome::Skipped => (0, 0),
            _ => (0, self.runner.status.read().await.pending_count.max(0) as usize),
        };

        RetryReport {
            outcome,
            sync,
            succeeded,
            failed,
        }
    }

    /// Gets the current job status.
    pub async fn status(&self) -> SyncStatus {
        self.runner.status.read().await.clone()
    }

    /// Signals the scheduler to stop. A run in progress finishes.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
