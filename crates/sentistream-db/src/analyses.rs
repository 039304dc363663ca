//! Database operations for the `analyses` table.

use sqlx::{PgExecutor, PgPool};

use crate::DbError;

/// Input for an analysis insert.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub post_id: String,
    pub model_name: String,
    pub sentiment_label: String,
    pub confidence_score: f64,
    pub emotion: Option<String>,
}

/// Insert an analysis if none exists yet for `(post_id, model_name)`.
///
/// Returns `true` if this call inserted the row. A redelivered stream entry
/// whose analysis was already written before the crash lands here as a
/// no-op, which is what makes the whole processing step safe to repeat.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_analysis_if_absent<'e>(
    executor: impl PgExecutor<'e>,
    analysis: &NewAnalysis,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO analyses (post_id, model_name, sentiment_label, confidence_score, emotion) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (post_id, model_name) DO NOTHING",
    )
    .bind(&analysis.post_id)
    .bind(&analysis.model_name)
    .bind(&analysis.sentiment_label)
    .bind(analysis.confidence_score)
    .bind(&analysis.emotion)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count all stored analyses.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_analyses(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM analyses")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
