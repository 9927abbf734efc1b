//! Ingest queue: worker pool, LISTEN/NOTIFY or polling, and the stale
//! task reaper.
//!
//! Shutdown: [`IngestQueue::shutdown`] signals the pool to stop
//! claiming; it does not wait for in-flight tasks. Coordinate with the
//! runtime and give running extractions time to finish before exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;
use ufdr_db::{IngestTask, IngestTaskRepository, INGEST_NOTIFY_CHANNEL};

use crate::pipeline::IngestPipeline;

#[derive(Clone)]
pub struct IngestQueueConfig {
    pub max_workers: usize,
    pub poll_interval_ms: u64,
    /// Hard ceiling on one extraction; a task past this is failed.
    pub task_timeout_secs: u64,
    /// Interval in seconds between runs of the stale task reaper.
    pub stale_reap_interval_secs: u64,
    /// Grace period added to the task timeout before reaping stuck
    /// `running` rows left behind by a dead worker.
    pub stale_grace_period_secs: i64,
}

impl Default for IngestQueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            poll_interval_ms: 1000,
            task_timeout_secs: 3600,
            stale_reap_interval_secs: 60,
            stale_grace_period_secs: 300,
        }
    }
}

pub struct IngestQueue {
    shutdown_tx: mpsc::Sender<()>,
}

impl IngestQueue {
    /// Start the worker pool.
    ///
    /// If `pool` is `Some`, the workers LISTEN on the ingest channel and
    /// wake as soon as a task is enqueued, in addition to polling at
    /// `poll_interval_ms`. With `None`, only polling is used.
    pub fn new(
        repository: IngestTaskRepository,
        config: IngestQueueConfig,
        pipeline: Arc<IngestPipeline>,
        pool: Option<sqlx::PgPool>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::worker_pool(repository, config, pipeline, shutdown_rx, pool).await;
        });

        Self { shutdown_tx }
    }

    async fn worker_pool(
        repository: IngestTaskRepository,
        config: IngestQueueConfig,
        pipeline: Arc<IngestPipeline>,
        mut shutdown_rx: mpsc::Receiver<()>,
        pool: Option<sqlx::PgPool>,
    ) {
        let use_listen = pool.is_some();
        tracing::info!(
            max_workers = config.max_workers,
            poll_interval_ms = config.poll_interval_ms,
            listen_notify = use_listen,
            "ingest worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(config.max_workers));
        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        // Wakes the main loop when LISTEN receives a NOTIFY; the loop
        // never blocks on recv when no pool was supplied.
        let (notify_tx, mut notify_rx) = mpsc::channel::<()>(16);
        if let Some(pool) = pool {
            let tx = notify_tx.clone();
            tokio::spawn(async move {
                loop {
                    match sqlx::postgres::PgListener::connect_with(&pool).await {
                        Ok(mut listener) => {
                            if let Err(e) = listener.listen(INGEST_NOTIFY_CHANNEL).await {
                                tracing::warn!(error = %e, "LISTEN failed, will retry");
                                tokio::time::sleep(Duration::from_secs(5)).await;
                                continue;
                            }
                            while listener.recv().await.is_ok() {
                                let _ = tx.send(()).await;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "PgListener connect failed, will retry");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }
            });
        }

        // Stale task reaper (if interval > 0)
        let (reaper_shutdown_tx, mut reaper_shutdown_rx) = mpsc::channel::<()>(1);
        if config.stale_reap_interval_secs > 0 {
            let repo_for_reaper = repository.clone();
            let reap_interval = Duration::from_secs(config.stale_reap_interval_secs);
            let older_than = config.task_timeout_secs as i64 + config.stale_grace_period_secs;
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(reap_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            match repo_for_reaper.reap_stale_running(older_than).await {
                                Ok(0) => {}
                                Ok(reaped) => tracing::warn!(reaped, "reaped stale ingest tasks"),
                                Err(e) => tracing::error!(error = %e, "stale task reaper failed"),
                            }
                        }
                        _ = reaper_shutdown_rx.recv() => break,
                    }
                }
            });
        }

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("ingest worker pool shutting down");
                    let _ = reaper_shutdown_tx.send(()).await;
                    break;
                }
                _ = notify_rx.recv() => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &pipeline, &config).await;
                }
                _ = sleep(poll_interval) => {
                    Self::claim_and_dispatch_one(&repository, &semaphore, &pipeline, &config).await;
                }
            }
        }

        tracing::info!("ingest worker pool stopped");
    }

    async fn claim_and_dispatch_one(
        repository: &IngestTaskRepository,
        semaphore: &Arc<Semaphore>,
        pipeline: &Arc<IngestPipeline>,
        config: &IngestQueueConfig,
    ) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!("no workers available, skipping claim");
                return;
            }
        };

        match repository.claim_next().await {
            Ok(Some(task)) => {
                let repo = repository.clone();
                let pipeline = pipeline.clone();
                let timeout = Duration::from_secs(config.task_timeout_secs);
                tokio::spawn(async move {
                    let _permit = permit;
                    Self::run_task(task, repo, pipeline, timeout).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("no ingest tasks available");
            }
            Err(e) => {
                drop(permit);
                tracing::error!(error = %e, "failed to claim ingest task");
            }
        }
    }

    #[tracing::instrument(skip(repository, pipeline, timeout), fields(task_id = %task.id, upload_id = %task.upload_id))]
    async fn run_task(
        task: IngestTask,
        repository: IngestTaskRepository,
        pipeline: Arc<IngestPipeline>,
        timeout: Duration,
    ) {
        match tokio::time::timeout(timeout, pipeline.process(&task)).await {
            Ok(Ok(())) => {
                if let Err(e) = repository.mark_completed(task.id).await {
                    tracing::error!(error = %e, "failed to mark ingest task completed");
                }
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "ingest task failed");
                if let Err(mark_err) = repository.mark_failed(task.id, &e.to_string()).await {
                    tracing::error!(error = %mark_err, "failed to mark ingest task failed");
                }
            }
            Err(_) => {
                tracing::error!(timeout_secs = timeout.as_secs(), "ingest task timed out");
                pipeline
                    .mark_upload_failed(task.upload_id, "extraction timed out")
                    .await;
                if let Err(e) = repository.mark_failed(task.id, "extraction timed out").await {
                    tracing::error!(error = %e, "failed to mark timed-out task failed");
                }
            }
        }
    }

    /// Signals the pool to stop claiming new tasks. Returns immediately;
    /// in-flight extractions keep running until they finish or time out.
    pub async fn shutdown(&self) {
        tracing::info!("initiating ingest queue shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl Clone for IngestQueue {
    fn clone(&self) -> Self {
        Self {
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_keeps_polling_enabled() {
        let config = IngestQueueConfig::default();
        assert!(config.poll_interval_ms > 0);
        assert!(config.max_workers >= 1);
        assert!(config.stale_grace_period_secs > 0);
    }
}
