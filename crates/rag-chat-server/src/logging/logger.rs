use anyhow::Result;
use flume::{bounded, Receiver, Sender};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::types::ActivityLog;
use crate::config::ActivityLogConfig;

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Queue capacity (max logs in memory before dropping)
    pub queue_capacity: usize,

    /// Batch size for sink writes
    pub batch_size: usize,

    /// Max wait time before flushing batch (milliseconds)
    pub batch_timeout_ms: u64,

    /// Number of worker tasks draining the queue
    pub worker_count: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            batch_size: 100,
            batch_timeout_ms: 1000,
            worker_count: 2,
        }
    }
}

impl From<&ActivityLogConfig> for LoggerConfig {
    fn from(cfg: &ActivityLogConfig) -> Self {
        Self {
            queue_capacity: cfg.queue_capacity.max(1),
            batch_size: cfg.batch_size.max(1),
            batch_timeout_ms: cfg.batch_timeout_ms.max(1),
            worker_count: cfg.worker_count.max(1),
        }
    }
}

/// Destination for batches of activity logs
#[async_trait::async_trait]
pub trait ActivitySink: Send + Sync {
    /// Persist a batch, returns number of records written
    async fn write_batch(&self, batch: &[ActivityLog]) -> Result<usize>;
}

/// Writes activity logs to `chat_activity_logs`
pub struct PgActivitySink {
    pool: PgPool,
}

impl PgActivitySink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActivitySink for PgActivitySink {
    async fn write_batch(&self, logs: &[ActivityLog]) -> Result<usize> {
        let mut query_builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
            r#"
            INSERT INTO chat_activity_logs (
                session_id, activity_type, activity_status, intent,
                message_content, response_content, retrieval_count, similarity_score,
                processing_time_ms, llm_call_duration_ms, retrieval_duration_ms,
                error_message, error_type, created_at
            )
            "#,
        );

        query_builder.push_values(logs, |mut b, log| {
            b.push_bind(&log.session_id)
                .push_bind(log.activity_type.as_str())
                .push_bind(log.activity_status.as_str())
                .push_bind(&log.intent)
                .push_bind(&log.message_content)
                .push_bind(&log.response_content)
                .push_bind(log.retrieval_count)
                .push_bind(log.similarity_score)
                .push_bind(log.processing_time_ms)
                .push_bind(log.llm_call_duration_ms)
                .push_bind(log.retrieval_duration_ms)
                .push_bind(&log.error_message)
                .push_bind(&log.error_type)
                .push_bind(log.created_at);
        });

        let result = query_builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected() as usize)
    }
}

/// Emits activity logs as structured tracing events
pub struct TracingActivitySink;

#[async_trait::async_trait]
impl ActivitySink for TracingActivitySink {
    async fn write_batch(&self, logs: &[ActivityLog]) -> Result<usize> {
        for log in logs {
            info!(
                target: "activity",
                session_id = %log.session_id,
                activity = log.activity_type.as_str(),
                status = log.activity_status.as_str(),
                intent = log.intent.as_deref().unwrap_or(""),
                error = log.error_message.as_deref().unwrap_or(""),
                "activity"
            );
        }
        Ok(logs.len())
    }
}

/// Async activity logger with queue mechanism
#[derive(Clone)]
pub struct ActivityLogger {
    sender: Option<Sender<ActivityLog>>,
}

/// Handles to the background workers of an [`ActivityLogger`]
pub struct ActivityWorkers {
    handles: Vec<JoinHandle<()>>,
}

impl ActivityWorkers {
    /// Wait for workers to flush and exit. Workers stop once every logger
    /// clone has been dropped.
    pub async fn drain(self, timeout: Duration) {
        let count = self.handles.len();
        let join_all = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    error!("Activity worker panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, join_all).await {
            Ok(()) => debug!("{} activity workers drained", count),
            Err(_) => warn!("Activity workers still busy after {:?}, pending logs dropped", timeout),
        }
    }
}

impl ActivityLogger {
    /// Initialize logger with background workers. Must run inside a tokio runtime.
    pub fn new(sink: Arc<dyn ActivitySink>, config: LoggerConfig) -> (Self, ActivityWorkers) {
        let (sender, receiver) = bounded(config.queue_capacity);

        info!(
            "Initializing ActivityLogger: queue={}, batch={}, timeout={}ms, workers={}",
            config.queue_capacity,
            config.batch_size,
            config.batch_timeout_ms,
            config.worker_count
        );

        let handles = (0..config.worker_count)
            .map(|worker_id| {
                let sink = sink.clone();
                let receiver = receiver.clone();
                let config = config.clone();

                tokio::spawn(async move {
                    Self::worker_loop(worker_id, sink, receiver, config).await;
                })
            })
            .collect();

        (Self { sender: Some(sender) }, ActivityWorkers { handles })
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Log activity (non-blocking, fire-and-forget)
    pub fn log(&self, activity: ActivityLog) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(e) = sender.try_send(activity) {
            warn!("Failed to enqueue activity log (queue full?): {}", e);
        }
    }

    /// Worker loop - processes logs in batches
    async fn worker_loop(
        worker_id: usize,
        sink: Arc<dyn ActivitySink>,
        receiver: Receiver<ActivityLog>,
        config: LoggerConfig,
    ) {
        debug!("Activity worker {} started", worker_id);

        let mut batch: Vec<ActivityLog> = Vec::with_capacity(config.batch_size);
        let batch_timeout = Duration::from_millis(config.batch_timeout_ms);

        loop {
            let deadline = tokio::time::Instant::now() + batch_timeout;

            while batch.len() < config.batch_size {
                match tokio::time::timeout_at(deadline, receiver.recv_async()).await {
                    Ok(Ok(log)) => batch.push(log),
                    Ok(Err(_)) => {
                        // Channel closed, flush and exit
                        if !batch.is_empty() {
                            Self::flush_batch(sink.as_ref(), &batch, worker_id).await;
                        }
                        debug!("Activity worker {} shutting down (channel closed)", worker_id);
                        return;
                    }
                    Err(_) => break,
                }
            }

            if !batch.is_empty() {
                Self::flush_batch(sink.as_ref(), &batch, worker_id).await;
                batch.clear();
            }
        }
    }

    async fn flush_batch(sink: &dyn ActivitySink, batch: &[ActivityLog], worker_id: usize) {
        let start = std::time::Instant::now();

        match sink.write_batch(batch).await {
            Ok(written) => debug!(
                "Worker {} wrote {} activity logs in {:?}",
                worker_id,
                written,
                start.elapsed()
            ),
            Err(e) => error!("Worker {} failed to write activity batch: {:#}", worker_id, e),
        }
    }

    /// Queue length (for monitoring)
    pub fn queue_len(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }
}
