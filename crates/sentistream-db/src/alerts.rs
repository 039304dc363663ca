//! Database operations for the `alerts` table. Alerts are append-only facts;
//! nothing in the pipeline updates or deletes them.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    pub id: i64,
    pub alert_type: String,
    pub threshold_value: f64,
    pub actual_value: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub post_count: i32,
    pub triggered_at: DateTime<Utc>,
    pub details: Value,
}

/// Input for an alert insert. `details` carries the raw window counts that
/// produced the ratio.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub alert_type: String,
    pub threshold_value: f64,
    pub actual_value: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub post_count: i32,
    pub triggered_at: DateTime<Utc>,
    pub details: Value,
}

/// Insert a new alert and return its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_alert(pool: &PgPool, alert: &NewAlert) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO alerts \
             (alert_type, threshold_value, actual_value, window_start, window_end, \
              post_count, triggered_at, details) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(&alert.alert_type)
    .bind(alert.threshold_value)
    .bind(alert.actual_value)
    .bind(alert.window_start)
    .bind(alert.window_end)
    .bind(alert.post_count)
    .bind(alert.triggered_at)
    .bind(&alert.details)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// List recent alerts, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_alerts(pool: &PgPool, limit: i64) -> Result<Vec<AlertRow>, DbError> {
    let rows = sqlx::query_as::<_, AlertRow>(
        "SELECT id, alert_type, threshold_value, actual_value, window_start, window_end, \
                post_count, triggered_at, details \
         FROM alerts \
         ORDER BY triggered_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
