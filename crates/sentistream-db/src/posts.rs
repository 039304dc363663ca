//! Database operations for the `posts` table.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Input for a post insert. `post_id` is the producer-assigned natural key.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub post_id: String,
    pub source: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// A post joined with its analysis, for the read API.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostWithAnalysisRow {
    pub post_id: String,
    pub source: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub sentiment_label: String,
    pub confidence_score: f64,
    pub emotion: Option<String>,
    pub model_name: String,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Insert a post if no row with the same `post_id` exists yet.
///
/// Returns `true` if this call inserted the row, `false` if another writer
/// got there first. Two workers racing on the same `post_id` see exactly one
/// `true` between them; the unique constraint is the only coordination.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_post_if_absent<'e>(
    executor: impl PgExecutor<'e>,
    post: &NewPost,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "INSERT INTO posts (post_id, source, content, author, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (post_id) DO NOTHING",
    )
    .bind(&post.post_id)
    .bind(&post.source)
    .bind(&post.content)
    .bind(&post.author)
    .bind(post.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Count all stored posts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_posts(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// List posts joined with their analyses, newest first, with optional
/// source and sentiment-label filters.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_with_analyses(
    pool: &PgPool,
    limit: i64,
    offset: i64,
    source: Option<&str>,
    sentiment: Option<&str>,
) -> Result<Vec<PostWithAnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, PostWithAnalysisRow>(
        "SELECT p.post_id, p.source, p.content, p.author, p.created_at, \
                a.sentiment_label, a.confidence_score, a.emotion, a.model_name \
         FROM posts p \
         JOIN analyses a ON a.post_id = p.post_id \
         WHERE ($3::text IS NULL OR p.source = $3) \
           AND ($4::text IS NULL OR a.sentiment_label = $4) \
         ORDER BY p.created_at DESC, p.id DESC \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .bind(source)
    .bind(sentiment)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
