//! Aggregation/alert monitor: two independent periodic loops sharing the
//! store. Every tick recomputes its window from scratch; a failed tick is
//! logged and the next one fires on schedule.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::hub::Hub;
use sentistream_core::AppConfig;
use sentistream_db::{insert_alert, LabelCounts, NewAlert};

const ALERT_TYPE: &str = "high_negative_ratio";

/// Builds and starts the monitor's job scheduler.
///
/// Registers the alert loop and the metrics loop and starts the scheduler.
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down both loops.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    hub: Arc<Hub>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    let metrics_interval = Duration::from_secs(config.metrics_interval_secs);
    register_alert_job(&scheduler, pool.clone(), config).await?;
    register_metrics_job(&scheduler, pool, metrics_interval, hub).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_alert_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let interval = Duration::from_secs(config.alert_interval_secs);
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);

        Box::pin(async move {
            if let Err(e) = run_alert_tick(&pool, &config).await {
                tracing::error!(error = %e, "alert tick failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_metrics_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    interval: Duration,
    hub: Arc<Hub>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let pool = pool.clone();
        let hub = Arc::clone(&hub);

        Box::pin(async move {
            if let Err(e) = run_metrics_tick(&pool, &hub).await {
                tracing::error!(error = %e, "metrics tick failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Alert loop
// ---------------------------------------------------------------------------

/// The outcome of evaluating one alert window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertDecision {
    pub ratio: f64,
}

/// Decide whether a window's counts warrant an alert.
///
/// Below `min_posts` total observations no decision is made. The ratio is
/// `negative / positive`, except with zero positives it degenerates to the
/// raw negative count — no positive signal to offset any negativity.
/// Evaluation is stateless: no dedup, no cooldown.
#[must_use]
pub fn evaluate_alert(counts: &LabelCounts, threshold: f64, min_posts: i64) -> Option<AlertDecision> {
    if counts.total() < min_posts {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = if counts.positive > 0 {
        counts.negative as f64 / counts.positive as f64
    } else {
        counts.negative as f64
    };

    (ratio > threshold).then_some(AlertDecision { ratio })
}

/// One alert-loop tick: recompute the trailing window and persist an alert
/// fact if the negative ratio exceeds the threshold.
async fn run_alert_tick(pool: &PgPool, config: &AppConfig) -> Result<(), sentistream_db::DbError> {
    let window_end = Utc::now();
    let window_start = window_end - chrono::Duration::minutes(config.alert_window_minutes);

    let counts = sentistream_db::label_counts_in_event_window(pool, window_start).await?;

    let Some(decision) = evaluate_alert(
        &counts,
        config.alert_negative_ratio_threshold,
        config.alert_min_posts,
    ) else {
        tracing::debug!(total = counts.total(), "alert window below threshold");
        return Ok(());
    };

    let total = counts.total();
    let alert = NewAlert {
        alert_type: ALERT_TYPE.to_string(),
        threshold_value: config.alert_negative_ratio_threshold,
        actual_value: decision.ratio,
        window_start,
        window_end,
        post_count: i32::try_from(total).unwrap_or(i32::MAX),
        triggered_at: window_end,
        details: serde_json::json!({
            "positive_count": counts.positive,
            "negative_count": counts.negative,
            "neutral_count": counts.neutral,
            "total_count": total,
        }),
    };

    let id = insert_alert(pool, &alert).await?;
    tracing::warn!(
        alert_id = id,
        ratio = decision.ratio,
        threshold = config.alert_negative_ratio_threshold,
        negative = counts.negative,
        positive = counts.positive,
        "negative-sentiment alert raised"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Metrics loop
// ---------------------------------------------------------------------------

/// Build one window's counts mapping: one entry per observed label, plus
/// `total`.
fn window_counts(counts: &LabelCounts) -> Value {
    let mut map = Map::new();
    for (label, count) in [
        ("positive", counts.positive),
        ("negative", counts.negative),
        ("neutral", counts.neutral),
    ] {
        if count > 0 {
            map.insert(label.to_string(), Value::from(count));
        }
    }
    map.insert("total".to_string(), Value::from(counts.total()));
    Value::Object(map)
}

/// Build the combined `metrics_update` snapshot message.
#[must_use]
pub fn build_metrics_snapshot(
    now: DateTime<Utc>,
    last_minute: &LabelCounts,
    last_hour: &LabelCounts,
    last_24_hours: &LabelCounts,
) -> Value {
    serde_json::json!({
        "type": "metrics_update",
        "timestamp": now.to_rfc3339(),
        "data": {
            "last_minute": window_counts(last_minute),
            "last_hour": window_counts(last_hour),
            "last_24_hours": window_counts(last_24_hours),
        },
    })
}

/// One metrics-loop tick: re-derive the three trailing windows from the
/// store and broadcast a combined snapshot.
async fn run_metrics_tick(pool: &PgPool, hub: &Hub) -> Result<(), sentistream_db::DbError> {
    let now = Utc::now();

    let last_minute =
        sentistream_db::label_counts_since_analyzed(pool, now - chrono::Duration::minutes(1), None)
            .await?;
    let last_hour =
        sentistream_db::label_counts_since_analyzed(pool, now - chrono::Duration::hours(1), None)
            .await?;
    let last_24_hours =
        sentistream_db::label_counts_since_analyzed(pool, now - chrono::Duration::hours(24), None)
            .await?;

    let snapshot = build_metrics_snapshot(now, &last_minute, &last_hour, &last_24_hours);
    let delivered = hub.broadcast(&snapshot.to_string());
    tracing::debug!(delivered, "metrics snapshot broadcast");
    Ok(())
}
