//! The consumer worker: claims stream entries, enriches them, persists the
//! result, and publishes fan-out notifications.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;

use sentistream_analyzer::{Analyzer, AnalyzerError};
use sentistream_core::AppConfig;
use sentistream_db::{persist_post_analysis, DbError, NewAnalysis, StreamEntry};

use crate::notify;
use crate::payload::decode_post;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),
}

pub struct Worker {
    pool: PgPool,
    analyzer: Arc<dyn Analyzer>,
    stream: String,
    group: String,
    consumer: String,
    block: Duration,
    batch_size: i64,
    visibility: Duration,
}

impl Worker {
    /// Build a worker from config. Each instance gets a process-scoped
    /// consumer name so the stream's delivery bookkeeping can attribute
    /// claims to it.
    #[must_use]
    pub fn from_config(pool: PgPool, analyzer: Arc<dyn Analyzer>, config: &AppConfig) -> Self {
        Self {
            pool,
            analyzer,
            stream: config.stream_name.clone(),
            group: config.consumer_group.clone(),
            consumer: format!("worker_{}", std::process::id()),
            block: Duration::from_secs(config.stream_block_secs),
            batch_size: config.stream_batch_size,
            visibility: Duration::from_secs(config.stream_visibility_timeout_secs),
        }
    }

    /// Idempotently provision the consumer group. Failure here is fatal —
    /// the worker cannot make progress without a group to read from.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Db`] if provisioning fails.
    pub async fn bootstrap(&self) -> Result<(), WorkerError> {
        sentistream_db::ensure_group(&self.pool, &self.stream, &self.group).await?;
        tracing::info!(
            stream = %self.stream,
            group = %self.group,
            consumer = %self.consumer,
            "consumer group ready"
        );
        Ok(())
    }

    /// Run the read loop until `shutdown` resolves.
    ///
    /// Shutdown is only observed between reads, so an entry that is mid
    /// processing finishes (or fails and stays unacked) before the loop
    /// exits. Read errors are transient: logged, short backoff, continue.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let entries = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(consumer = %self.consumer, "worker shutting down");
                    return;
                }
                result = sentistream_db::read_group(
                    &self.pool,
                    &self.stream,
                    &self.group,
                    &self.consumer,
                    self.batch_size,
                    self.visibility,
                    self.block,
                ) => match result {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::error!(error = %e, "stream read failed; backing off");
                        tokio::select! {
                            () = &mut shutdown => return,
                            () = tokio::time::sleep(Duration::from_secs(5)) => continue,
                        }
                    }
                },
            };

            for entry in &entries {
                if let Err(e) = self.process_entry(entry).await {
                    // Not acked: the entry stays pending and will be
                    // redelivered after the visibility timeout.
                    tracing::error!(
                        entry_id = entry.entry_id,
                        delivery_count = entry.delivery_count,
                        error = %e,
                        "entry processing failed; leaving unacked for redelivery"
                    );
                }
            }
        }
    }

    /// Process one claimed entry to a terminal state.
    ///
    /// Persist happens-before ack happens-before publish, so subscribers
    /// never see a notification for data that is not durably stored. Drops
    /// (undecodable payload, empty content) are acked: redelivery cannot
    /// change the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] if analysis or persistence fails; the entry
    /// is left unacked in that case.
    pub async fn process_entry(&self, entry: &StreamEntry) -> Result<(), WorkerError> {
        let post = match decode_post(&entry.payload, chrono::Utc::now()) {
            Ok(post) => post,
            Err(e) => {
                tracing::warn!(
                    entry_id = entry.entry_id,
                    error = %e,
                    "malformed stream payload; acking as terminal drop"
                );
                sentistream_db::ack(&self.pool, &self.group, entry.entry_id).await?;
                return Ok(());
            }
        };

        let Some(outcome) = self.analyzer.analyze(&post.content).await? else {
            tracing::debug!(
                entry_id = entry.entry_id,
                post_id = %post.post_id,
                "unanalyzable content; acking as terminal drop"
            );
            sentistream_db::ack(&self.pool, &self.group, entry.entry_id).await?;
            return Ok(());
        };

        let analysis = NewAnalysis {
            post_id: post.post_id.clone(),
            model_name: outcome.model_name.clone(),
            sentiment_label: outcome.sentiment_label.as_str().to_string(),
            confidence_score: outcome.confidence_score,
            emotion: outcome.emotion.clone(),
        };

        let persisted = persist_post_analysis(&self.pool, &post, &analysis).await?;

        sentistream_db::ack(&self.pool, &self.group, entry.entry_id).await?;

        let message = notify::build_notification(&post, &outcome);
        if let Err(e) = notify::publish(&self.pool, &message).await {
            // The entry is persisted and acked; losing one live notification
            // only affects currently connected subscribers.
            tracing::warn!(post_id = %post.post_id, error = %e, "fan-out publish failed");
        }

        tracing::info!(
            post_id = %post.post_id,
            label = %outcome.sentiment_label,
            post_inserted = persisted.post_inserted,
            analysis_inserted = persisted.analysis_inserted,
            "entry processed"
        );
        Ok(())
    }
}
