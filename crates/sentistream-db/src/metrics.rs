//! Windowed aggregate queries for the monitor loops and the read API.
//!
//! Every function here recomputes its window from scratch; there is no
//! incremental counter state, so the numbers stay correct across restarts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Sentiment-label counts for one trailing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
}

impl LabelCounts {
    #[must_use]
    pub fn total(&self) -> i64 {
        self.positive + self.negative + self.neutral
    }
}

/// One emotion with its occurrence count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmotionCount {
    pub emotion: String,
    pub count: i64,
}

fn fold_counts(rows: Vec<(String, i64)>) -> LabelCounts {
    let mut counts = LabelCounts::default();
    for (label, count) in rows {
        match label.as_str() {
            "positive" => counts.positive = count,
            "negative" => counts.negative = count,
            "neutral" => counts.neutral = count,
            // CHECK constraint on analyses.sentiment_label rules this out.
            _ => {}
        }
    }
    counts
}

/// Count analyses grouped by label where the joined post's event time
/// (`posts.created_at`) falls in the trailing window. The alert loop keys
/// its decision off event time, not processing time.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn label_counts_in_event_window(
    pool: &PgPool,
    window_start: DateTime<Utc>,
) -> Result<LabelCounts, DbError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT a.sentiment_label, COUNT(*) \
         FROM analyses a \
         JOIN posts p ON p.post_id = a.post_id \
         WHERE p.created_at >= $1 \
         GROUP BY a.sentiment_label",
    )
    .bind(window_start)
    .fetch_all(pool)
    .await?;

    Ok(fold_counts(rows))
}

/// Count analyses grouped by label by processing time (`analyzed_at`),
/// optionally restricted to one post source. The metrics loop passes no
/// source; the distribution endpoint may pass one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn label_counts_since_analyzed(
    pool: &PgPool,
    since: DateTime<Utc>,
    source: Option<&str>,
) -> Result<LabelCounts, DbError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT a.sentiment_label, COUNT(*) \
         FROM analyses a \
         JOIN posts p ON p.post_id = a.post_id \
         WHERE a.analyzed_at >= $1 \
           AND ($2::text IS NULL OR p.source = $2) \
         GROUP BY a.sentiment_label",
    )
    .bind(since)
    .bind(source)
    .fetch_all(pool)
    .await?;

    Ok(fold_counts(rows))
}

/// One time bucket of the aggregate series. `avg_confidence` is `None` for
/// a bucket with no analyses, which cannot appear in `sentiment_aggregate`
/// output but keeps the row type honest about the SQL `AVG`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AggregateBucketRow {
    pub bucket: DateTime<Utc>,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub avg_confidence: Option<f64>,
}

/// Per-label counts and average confidence bucketed by `date_trunc` over
/// processing time, ascending. `period` must be a valid `date_trunc` unit;
/// the API layer restricts it to `minute`, `hour`, or `day` before calling.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn sentiment_aggregate(
    pool: &PgPool,
    period: &str,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    source: Option<&str>,
) -> Result<Vec<AggregateBucketRow>, DbError> {
    let rows = sqlx::query_as::<_, AggregateBucketRow>(
        "SELECT date_trunc($1, a.analyzed_at) AS bucket, \
                COUNT(*) FILTER (WHERE a.sentiment_label = 'positive') AS positive, \
                COUNT(*) FILTER (WHERE a.sentiment_label = 'negative') AS negative, \
                COUNT(*) FILTER (WHERE a.sentiment_label = 'neutral') AS neutral, \
                AVG(a.confidence_score) AS avg_confidence \
         FROM analyses a \
         JOIN posts p ON p.post_id = a.post_id \
         WHERE ($2::timestamptz IS NULL OR a.analyzed_at >= $2) \
           AND ($3::timestamptz IS NULL OR a.analyzed_at <= $3) \
           AND ($4::text IS NULL OR p.source = $4) \
         GROUP BY bucket \
         ORDER BY bucket",
    )
    .bind(period)
    .bind(start)
    .bind(end)
    .bind(source)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most frequent emotions among analyses since `since`, descending.
/// Rows with no emotion are excluded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_emotions_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<EmotionCount>, DbError> {
    let rows = sqlx::query_as::<_, EmotionCount>(
        "SELECT emotion, COUNT(*) AS count \
         FROM analyses \
         WHERE analyzed_at >= $1 AND emotion IS NOT NULL \
         GROUP BY emotion \
         ORDER BY count DESC, emotion ASC \
         LIMIT $2",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
