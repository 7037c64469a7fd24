//! Shared application state.
//!
//! One [`AppState`] is shared by every view: the push-channel bus, the
//! batch progress reconciler and the scope-keyed selection store. A pump
//! task folds bus events into the reconciler and emits a refresh signal
//! whenever a job finishes, so views re-query their records.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use sc_core::config::Config;
use sc_core::events::EventBus;
use sc_core::{JobId, MediaUnitId};
use sc_view::{ApplyOutcome, ProgressReconciler, SelectionStore};

/// How often the pump checks for finished jobs to auto-dismiss.
const DISMISS_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// State shared by all views of one session.
pub struct AppState {
    pub config: Config,
    pub bus: Arc<EventBus>,
    pub progress: Arc<Mutex<ProgressReconciler>>,
    pub selection: Arc<Mutex<SelectionStore<MediaUnitId>>>,
    refresh_tx: broadcast::Sender<JobId>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let (refresh_tx, _) = broadcast::channel(64);
        Arc::new(Self {
            config,
            bus: Arc::new(EventBus::default()),
            progress: Arc::new(Mutex::new(ProgressReconciler::new())),
            selection: Arc::new(Mutex::new(SelectionStore::new())),
            refresh_tx,
        })
    }

    /// Receive the id of every job that reaches its terminal state.
    pub fn subscribe_refresh(&self) -> broadcast::Receiver<JobId> {
        self.refresh_tx.subscribe()
    }

    /// Spawn the task that applies bus events to the progress reconciler.
    ///
    /// Terminal jobs are auto-dismissed after `progress.auto_dismiss_secs`
    /// (never when that is 0). The task runs until its handle is aborted.
    pub fn spawn_progress_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        let mut rx = self.bus.subscribe();
        let auto_dismiss = Duration::from_secs(self.config.progress.auto_dismiss_secs);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(DISMISS_CHECK_INTERVAL);
            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(event) => state.apply_event(&event.payload),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!("Progress pump lagged, {} events skipped", n);
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = ticker.tick() => {
                        let dismissed = state.progress.lock().dismiss_expired(Instant::now(), auto_dismiss);
                        for job_id in dismissed {
                            tracing::debug!(job_id = %job_id, "auto-dismissed finished batch");
                        }
                    }
                }
            }
            tracing::debug!("progress pump stopped");
        })
    }

    /// Apply one push event and signal a refresh when it ends a job.
    pub fn apply_event(&self, event: &sc_core::events::JobEvent) {
        let outcome = self.progress.lock().apply(event);
        if outcome == ApplyOutcome::Finished {
            // No listening view is fine.
            let _ = self.refresh_tx.send(event.job_id());
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bus", &self.bus)
            .field("refresh_listeners", &self.refresh_tx.receiver_count())
            .finish()
    }
}
