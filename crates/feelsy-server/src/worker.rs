//! Background streak worker.
//!
//! Drains jobs left pending by an earlier process, then runs a pass on every
//! wake-up or poll tick. Users within a pass are processed concurrently on the
//! blocking pool; one user's jobs always run under that user's lock.

use std::sync::Arc;
use std::time::Duration;

use feelsy_core::storage::StreakWorkerConfig;
use feelsy_core::{FeelService, ProcessReport};
use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

pub struct StreakWorker {
    service: Arc<FeelService>,
    wake: Arc<Notify>,
    config: StreakWorkerConfig,
}

impl StreakWorker {
    pub fn new(service: Arc<FeelService>, wake: Arc<Notify>, config: StreakWorkerConfig) -> Self {
        Self {
            service,
            wake,
            config,
        }
    }

    /// Start the worker. It stops after `shutdown` turns true, finishing
    /// the pass in progress first.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let startup = self.drain().await;
        info!(
            applied = startup.applied,
            failed = startup.failed,
            dead = startup.dead,
            "streak worker started"
        );

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms.max(1)));
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = self.wake.notified() => {}
                _ = ticker.tick() => self.purge().await,
            }
            self.pass().await;
        }

        info!("streak worker stopped");
    }

    /// Run passes until one makes no progress.
    pub async fn drain(&self) -> ProcessReport {
        let mut total = ProcessReport::default();
        loop {
            let report = self.pass().await;
            total.merge(report);
            if report.applied == 0 && report.dead == 0 {
                return total;
            }
        }
    }

    /// One pass over every user with pending jobs.
    pub async fn pass(&self) -> ProcessReport {
        let batch = self.config.batch_size.max(1);
        let service = Arc::clone(&self.service);
        let users = match tokio::task::spawn_blocking(move || service.database().pending_job_users(batch)).await {
            Ok(Ok(users)) => users,
            Ok(Err(e)) => {
                error!(error = %e, "failed to load pending streak jobs");
                return ProcessReport::default();
            }
            Err(e) => {
                error!(error = %e, "streak job lookup task failed");
                return ProcessReport::default();
            }
        };

        let mut tasks = JoinSet::new();
        for user_id in users {
            let service = Arc::clone(&self.service);
            tasks.spawn_blocking(move || (user_id, service.process_user_jobs(user_id, batch)));
        }

        let mut report = ProcessReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(user_report))) => report.merge(user_report),
                Ok((user_id, Err(e))) => {
                    error!(user_id = %user_id, error = %e, "streak processing failed")
                }
                Err(e) => error!(error = %e, "streak task panicked"),
            }
        }

        if !report.is_empty() {
            debug!(
                applied = report.applied,
                skipped = report.skipped,
                failed = report.failed,
                dead = report.dead,
                deferred = report.deferred,
                "streak pass finished"
            );
        }
        report
    }

    async fn purge(&self) {
        let Some(retain) = i64::try_from(self.config.retain_done_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
        else {
            error!(
                retain_done_hours = self.config.retain_done_hours,
                "retention out of range, skipping purge"
            );
            return;
        };
        let service = Arc::clone(&self.service);
        match tokio::task::spawn_blocking(move || service.purge_done_jobs(retain)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(error = %e, "failed to purge applied streak jobs"),
            Err(e) => error!(error = %e, "purge task failed"),
        }
    }
}
