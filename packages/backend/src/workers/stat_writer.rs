//! Ordered write-behind queue for deck statistics
//!
//! Session engines are synchronous, so their counter writes are pushed onto an
//! unbounded channel and applied by a single task. Writes land in the order
//! they were sent; a failing write is retried with capped exponential backoff
//! and blocks everything queued behind it until it succeeds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deckcycle_engine::{DeckId, PersistenceError, StatUpdate};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WriterConfig;
use crate::db::{self, StoreError};

#[derive(Debug)]
pub enum WriterMessage {
    Write { deck_id: DeckId, update: StatUpdate },
    /// Acknowledged once every write queued before it has landed
    Flush(oneshot::Sender<()>),
    /// Stops accepting messages; already queued ones are still applied
    Shutdown,
}

/// Cloneable producer side of the writer channel
#[derive(Debug, Clone)]
pub struct StatSender {
    tx: mpsc::UnboundedSender<WriterMessage>,
}

impl StatSender {
    pub fn send(&self, deck_id: DeckId, update: StatUpdate) -> Result<(), PersistenceError> {
        self.tx
            .send(WriterMessage::Write { deck_id, update })
            .map_err(|_| PersistenceError::Unavailable("stat writer stopped".to_string()))
    }
}

/// Running totals kept by the writer task
#[derive(Debug, Default)]
struct WriterCounters {
    applied: AtomicU64,
    dropped: AtomicU64,
}

pub struct StatWriter;

impl StatWriter {
    pub fn spawn(pool: SqlitePool, config: WriterConfig) -> StatWriterHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let drain_timeout = config.drain_timeout;
        let counters = Arc::new(WriterCounters::default());
        let join = tokio::spawn(run(pool, rx, config, Arc::clone(&counters)));
        StatWriterHandle {
            tx,
            join,
            drain_timeout,
            counters,
        }
    }
}

pub struct StatWriterHandle {
    tx: mpsc::UnboundedSender<WriterMessage>,
    join: JoinHandle<()>,
    drain_timeout: Duration,
    counters: Arc<WriterCounters>,
}

impl StatWriterHandle {
    pub fn sender(&self) -> StatSender {
        StatSender {
            tx: self.tx.clone(),
        }
    }

    /// Writes that reached the database
    pub fn applied(&self) -> u64 {
        self.counters.applied.load(Ordering::Relaxed)
    }

    /// Writes discarded because their deck no longer exists
    pub fn dropped(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    /// Waits until everything sent so far has been written
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(WriterMessage::Flush(ack_tx))
            .map_err(|_| PersistenceError::Unavailable("stat writer stopped".to_string()))?;
        ack_rx
            .await
            .map_err(|_| PersistenceError::Unavailable("stat writer stopped".to_string()))
    }

    /// Drains the queue and stops the task.
    ///
    /// Returns `false` when the drain timed out and the task was aborted.
    pub async fn shutdown(self) -> bool {
        if self.tx.send(WriterMessage::Shutdown).is_err() {
            return true;
        }

        let mut join = self.join;
        match tokio::time::timeout(self.drain_timeout, &mut join).await {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                warn!(error = %err, "stat writer task failed");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "stat writer drain timed out, pending writes abandoned"
                );
                join.abort();
                false
            }
        }
    }
}

async fn run(
    pool: SqlitePool,
    mut rx: mpsc::UnboundedReceiver<WriterMessage>,
    config: WriterConfig,
    counters: Arc<WriterCounters>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            WriterMessage::Write { deck_id, update } => {
                let counter = if write_with_retry(&pool, deck_id, &update, &config).await {
                    &counters.applied
                } else {
                    &counters.dropped
                };
                counter.fetch_add(1, Ordering::Relaxed);
            }
            WriterMessage::Flush(ack) => {
                let _ = ack.send(());
            }
            WriterMessage::Shutdown => {
                debug!("stat writer closing");
                rx.close();
            }
        }
    }

    info!(
        applied = counters.applied.load(Ordering::Relaxed),
        dropped = counters.dropped.load(Ordering::Relaxed),
        "stat writer stopped"
    );
}

/// Returns `false` only for writes that can never succeed.
async fn write_with_retry(
    pool: &SqlitePool,
    deck_id: DeckId,
    update: &StatUpdate,
    config: &WriterConfig,
) -> bool {
    let mut backoff = config.initial_backoff;
    let mut attempt = 1u32;

    loop {
        match db::apply_stat_update(pool, deck_id, update).await {
            Ok(()) => {
                debug!(deck_id, update = update.event_type(), attempt, "stat written");
                return true;
            }
            Err(StoreError::DeckNotFound(_)) => {
                warn!(deck_id, update = update.event_type(), "deck gone, stat write dropped");
                return false;
            }
            Err(err) => {
                warn!(
                    deck_id,
                    update = update.event_type(),
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "stat write failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(config.max_backoff);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
