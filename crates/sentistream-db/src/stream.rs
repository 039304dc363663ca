//! Postgres-backed event stream with competing-consumer groups.
//!
//! `stream_entries` is the append-only log; `stream_deliveries` holds one
//! claim row per `(group, entry)`. A claim without `acked_at` whose
//! `claimed_at` is older than the visibility timeout becomes eligible for
//! redelivery, which gives consumers at-least-once semantics. Claiming is a
//! single statement guarded by `FOR UPDATE SKIP LOCKED`, so concurrent
//! consumers in one group never receive the same entry at the same time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// How often `read_group` re-polls while waiting for new entries.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An entry delivered to a consumer. `delivery_count` is 1 on first
/// delivery and grows with each redelivery.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StreamEntry {
    pub entry_id: i64,
    pub payload: Value,
    pub delivery_count: i32,
    pub enqueued_at: DateTime<Utc>,
}

/// Append a payload to a stream and return the entry id.
///
/// Streams exist implicitly; appending to an unknown stream name creates it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn append(pool: &PgPool, stream: &str, payload: &Value) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO stream_entries (stream, payload) VALUES ($1, $2) RETURNING id",
    )
    .bind(stream)
    .bind(payload)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Idempotently register a consumer group on a stream.
///
/// Safe to call from every worker instance at startup: "group already
/// exists" is success. Any error here is a provisioning failure the caller
/// should treat as fatal.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn ensure_group(pool: &PgPool, stream: &str, group: &str) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO stream_groups (stream, group_name) VALUES ($1, $2) \
         ON CONFLICT (stream, group_name) DO NOTHING",
    )
    .bind(stream)
    .bind(group)
    .execute(pool)
    .await?;

    Ok(())
}

/// Claim up to `limit` entries for `consumer` within `group`.
///
/// Eligible entries are those the group has never claimed, plus unacked
/// claims older than `visibility` (redelivery). The select-and-upsert runs
/// as one statement: candidate entry rows are locked with
/// `FOR UPDATE SKIP LOCKED`, so a concurrent claimer skips them instead of
/// blocking or double-claiming. Redeliveries bump `delivery_count` and
/// re-stamp the claim with this consumer.
///
/// The eligibility check is repeated in the conflict guard. The candidate
/// select runs against the statement snapshot, so a claim committed by a
/// rival consumer between snapshot and lock acquisition is invisible to it;
/// without the guard the upsert would re-stamp that fresh claim and hand
/// the entry to both consumers inside the visibility window.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn claim_batch(
    pool: &PgPool,
    stream: &str,
    group: &str,
    consumer: &str,
    limit: i64,
    visibility: Duration,
) -> Result<Vec<StreamEntry>, DbError> {
    let rows = sqlx::query_as::<_, StreamEntry>(
        "WITH candidate AS ( \
             SELECT e.id \
             FROM stream_entries e \
             LEFT JOIN stream_deliveries d \
                    ON d.entry_id = e.id AND d.group_name = $2 \
             WHERE e.stream = $1 \
               AND (d.id IS NULL \
                    OR (d.acked_at IS NULL \
                        AND d.claimed_at < now() - make_interval(secs => $5))) \
             ORDER BY e.id \
             LIMIT $4 \
             FOR UPDATE OF e SKIP LOCKED \
         ), claimed AS ( \
             INSERT INTO stream_deliveries (group_name, entry_id, claimed_by) \
             SELECT $2, id, $3 FROM candidate \
             ON CONFLICT (group_name, entry_id) DO UPDATE \
                 SET claimed_by = EXCLUDED.claimed_by, \
                     claimed_at = now(), \
                     delivery_count = stream_deliveries.delivery_count + 1 \
                 WHERE stream_deliveries.acked_at IS NULL \
                   AND stream_deliveries.claimed_at < now() - make_interval(secs => $5) \
             RETURNING entry_id, delivery_count \
         ) \
         SELECT c.entry_id, e.payload, c.delivery_count, e.enqueued_at \
         FROM claimed c \
         JOIN stream_entries e ON e.id = c.entry_id \
         ORDER BY c.entry_id",
    )
    .bind(stream)
    .bind(group)
    .bind(consumer)
    .bind(limit)
    .bind(visibility.as_secs_f64())
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Acknowledge an entry for a group, marking it terminally processed.
///
/// Returns `true` if this call acked the entry, `false` if it was already
/// acked (double-ack after redelivery is harmless).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn ack(pool: &PgPool, group: &str, entry_id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE stream_deliveries SET acked_at = now() \
         WHERE group_name = $1 AND entry_id = $2 AND acked_at IS NULL",
    )
    .bind(group)
    .bind(entry_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bounded-wait read: poll [`claim_batch`] until entries arrive or `block`
/// elapses. An empty result at the deadline is not an error — the caller's
/// loop simply comes back around, which also keeps cancellation prompt.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a claim attempt fails.
pub async fn read_group(
    pool: &PgPool,
    stream: &str,
    group: &str,
    consumer: &str,
    limit: i64,
    visibility: Duration,
    block: Duration,
) -> Result<Vec<StreamEntry>, DbError> {
    let deadline = tokio::time::Instant::now() + block;

    loop {
        let entries = claim_batch(pool, stream, group, consumer, limit, visibility).await?;
        if !entries.is_empty() {
            return Ok(entries);
        }
        if tokio::time::Instant::now() + POLL_INTERVAL > deadline {
            return Ok(Vec::new());
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
