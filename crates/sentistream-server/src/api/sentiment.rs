use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};
use sentistream_db::{AggregateBucketRow, LabelCounts};

const TOP_EMOTIONS_LIMIT: i64 = 5;

#[derive(Debug, Deserialize)]
pub(super) struct DistributionQuery {
    pub hours: Option<i64>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct DistributionData {
    pub window_hours: i64,
    pub total: i64,
    pub distribution: BTreeMap<&'static str, i64>,
    pub percentages: BTreeMap<&'static str, f64>,
    pub top_emotions: Vec<EmotionItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct EmotionItem {
    pub emotion: String,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct AggregateQuery {
    pub period: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct AggregateData {
    pub period: &'static str,
    pub data: Vec<AggregateItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct AggregateItem {
    pub timestamp: DateTime<Utc>,
    pub positive_count: i64,
    pub negative_count: i64,
    pub neutral_count: i64,
    pub total_count: i64,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
    pub average_confidence: f64,
}

/// Trailing window length, clamped to one week.
fn normalize_hours(hours: Option<i64>) -> i64 {
    hours.unwrap_or(24).clamp(1, 168)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of each label as a percentage, rounded to two decimals. An empty
/// window yields all zeros rather than a division error.
fn build_distribution(
    hours: i64,
    counts: &LabelCounts,
    top_emotions: Vec<EmotionItem>,
) -> DistributionData {
    let total = counts.total();
    let labels = [
        ("positive", counts.positive),
        ("negative", counts.negative),
        ("neutral", counts.neutral),
    ];

    let distribution: BTreeMap<&'static str, i64> = labels.into_iter().collect();
    #[allow(clippy::cast_precision_loss)]
    let percentages = labels
        .into_iter()
        .map(|(label, count)| {
            let pct = if total > 0 {
                round2(count as f64 / total as f64 * 100.0)
            } else {
                0.0
            };
            (label, pct)
        })
        .collect();

    DistributionData {
        window_hours: hours,
        total,
        distribution,
        percentages,
        top_emotions,
    }
}

/// The closed set of bucket sizes accepted by the aggregate endpoint. Also
/// the guard that keeps arbitrary strings out of the `date_trunc` argument.
fn parse_period(raw: &str) -> Option<&'static str> {
    match raw {
        "minute" => Some("minute"),
        "hour" => Some("hour"),
        "day" => Some("day"),
        _ => None,
    }
}

/// One bucket's counts as the wire item: percentages rounded to two
/// decimals, average confidence to four, zeros for an empty bucket.
fn build_aggregate_item(row: &AggregateBucketRow) -> AggregateItem {
    let total = row.positive + row.negative + row.neutral;
    #[allow(clippy::cast_precision_loss)]
    let pct = |count: i64| {
        if total > 0 {
            round2(count as f64 / total as f64 * 100.0)
        } else {
            0.0
        }
    };

    AggregateItem {
        timestamp: row.bucket,
        positive_count: row.positive,
        negative_count: row.negative,
        neutral_count: row.neutral,
        total_count: total,
        positive_percentage: pct(row.positive),
        negative_percentage: pct(row.negative),
        neutral_percentage: pct(row.neutral),
        average_confidence: row
            .avg_confidence
            .map_or(0.0, |avg| (avg * 10_000.0).round() / 10_000.0),
    }
}

pub(super) async fn sentiment_distribution(
    State(state): State<AppState>,
    Query(query): Query<DistributionQuery>,
) -> Result<Json<ApiResponse<DistributionData>>, ApiError> {
    let hours = normalize_hours(query.hours);
    let since = Utc::now() - chrono::Duration::hours(hours);

    let counts =
        sentistream_db::label_counts_since_analyzed(&state.pool, since, query.source.as_deref())
            .await
            .map_err(|e| map_db_error(&e))?;
    let emotions = sentistream_db::top_emotions_since(&state.pool, since, TOP_EMOTIONS_LIMIT)
        .await
        .map_err(|e| map_db_error(&e))?;

    let top_emotions = emotions
        .into_iter()
        .map(|row| EmotionItem {
            emotion: row.emotion,
            count: row.count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data: build_distribution(hours, &counts, top_emotions),
        meta: ResponseMeta::now(),
    }))
}

pub(super) async fn sentiment_aggregate(
    State(state): State<AppState>,
    Query(query): Query<AggregateQuery>,
) -> Result<Json<ApiResponse<AggregateData>>, ApiError> {
    let Some(period) = parse_period(&query.period) else {
        return Err(ApiError::new(
            "validation_error",
            "period must be one of: minute, hour, day",
        ));
    };

    let rows = sentistream_db::sentiment_aggregate(
        &state.pool,
        period,
        query.start_date,
        query.end_date,
        query.source.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(&e))?;

    let data = rows.iter().map(build_aggregate_item).collect();

    Ok(Json(ApiResponse {
        data: AggregateData { period, data },
        meta: ResponseMeta::now(),
    }))
}
