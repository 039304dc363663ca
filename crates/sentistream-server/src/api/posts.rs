use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct PostsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub source: Option<String>,
    pub sentiment: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct PostItem {
    pub post_id: String,
    pub source: String,
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub sentiment: SentimentBlock,
}

#[derive(Debug, Serialize)]
pub(super) struct SentimentBlock {
    pub sentiment_label: String,
    pub confidence_score: f64,
    pub emotion: Option<String>,
    pub model_name: String,
}

pub(super) async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<ApiResponse<Vec<PostItem>>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let rows = sentistream_db::list_posts_with_analyses(
        &state.pool,
        limit,
        offset,
        query.source.as_deref(),
        query.sentiment.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(&e))?;

    let data = rows
        .into_iter()
        .map(|row| PostItem {
            post_id: row.post_id,
            source: row.source,
            content: row.content,
            author: row.author,
            created_at: row.created_at,
            sentiment: SentimentBlock {
                sentiment_label: row.sentiment_label,
                confidence_score: row.confidence_score,
                emotion: row.emotion,
                model_name: row.model_name,
            },
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::now(),
    }))
}
