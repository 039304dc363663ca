mod posts;
mod sentiment;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::hub::Hub;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub hub: Arc<Hub>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    database: &'static str,
    total_posts: i64,
    total_analyses: i64,
    websocket_subscribers: usize,
}

impl ResponseMeta {
    pub(super) fn now() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::now(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(error: &sentistream_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new("internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/posts", get(posts::list_posts))
        .route(
            "/api/v1/sentiment/distribution",
            get(sentiment::sentiment_distribution),
        )
        .route(
            "/api/v1/sentiment/aggregate",
            get(sentiment::sentiment_aggregate),
        )
        .route("/ws/sentiment", get(ws::ws_sentiment))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let meta = ResponseMeta::now();

    match sentistream_db::health_check(&state.pool).await {
        Ok(()) => {
            let total_posts = sentistream_db::count_posts(&state.pool)
                .await
                .unwrap_or_default();
            let total_analyses = sentistream_db::count_analyses(&state.pool)
                .await
                .unwrap_or_default();
            (
                StatusCode::OK,
                Json(ApiResponse {
                    data: HealthData {
                        status: "ok",
                        database: "ok",
                        total_posts,
                        total_analyses,
                        websocket_subscribers: state.hub.subscriber_count(),
                    },
                    meta,
                }),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                        total_posts: 0,
                        total_analyses: 0,
                        websocket_subscribers: state.hub.subscriber_count(),
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(pool: sqlx::PgPool) -> AppState {
        AppState {
            pool,
            hub: Arc::new(Hub::new(64)),
        }
    }

    async fn seed_analyzed_post(
        pool: &sqlx::PgPool,
        post_id: &str,
        source: &str,
        label: &str,
        emotion: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO posts (post_id, source, content, author, created_at) \
             VALUES ($1, $2, 'content', 'author', NOW())",
        )
        .bind(post_id)
        .bind(source)
        .execute(pool)
        .await
        .expect("insert post");

        sqlx::query(
            "INSERT INTO analyses \
             (post_id, sentiment_label, confidence_score, emotion, model_name, analyzed_at) \
             VALUES ($1, $2, 0.9, $3, 'lexicon-v1', NOW())",
        )
        .bind(post_id)
        .bind(label)
        .bind(emotion)
        .execute(pool)
        .await
        .expect("insert analysis");
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_unknown_code_maps_to_internal_error() {
        let response = ApiError::new("mystery", "boom").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_totals(pool: sqlx::PgPool) {
        seed_analyzed_post(&pool, "health-1", "twitter", "positive", None).await;

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["total_posts"].as_i64(), Some(1));
        assert_eq!(json["data"]["total_analyses"].as_i64(), Some(1));
        assert_eq!(json["data"]["websocket_subscribers"].as_u64(), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_posts_filters_by_sentiment(pool: sqlx::PgPool) {
        seed_analyzed_post(&pool, "filter-1", "twitter", "positive", Some("joy")).await;
        seed_analyzed_post(&pool, "filter-2", "reddit", "negative", None).await;

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/posts?sentiment=negative")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = json["data"].as_array().expect("data array");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["post_id"], "filter-2");
        assert_eq!(data[0]["sentiment"]["sentiment_label"], "negative");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unanalyzed_posts_are_not_listed(pool: sqlx::PgPool) {
        sqlx::query(
            "INSERT INTO posts (post_id, source, content, author, created_at) \
             VALUES ('pending-1', 'twitter', 'content', 'author', NOW())",
        )
        .execute(&pool)
        .await
        .expect("insert post");

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/posts")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"].as_array().map(Vec::len), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn distribution_reports_percentages_and_emotions(pool: sqlx::PgPool) {
        seed_analyzed_post(&pool, "dist-1", "twitter", "positive", Some("joy")).await;
        seed_analyzed_post(&pool, "dist-2", "twitter", "positive", Some("joy")).await;
        seed_analyzed_post(&pool, "dist-3", "reddit", "negative", Some("anger")).await;
        seed_analyzed_post(&pool, "dist-4", "reddit", "neutral", None).await;

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sentiment/distribution?hours=24")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        let data = &json["data"];
        assert_eq!(data["total"].as_i64(), Some(4));
        assert_eq!(data["distribution"]["positive"].as_i64(), Some(2));
        assert!((data["percentages"]["positive"].as_f64().unwrap() - 50.0).abs() < 1e-9);
        assert!((data["percentages"]["negative"].as_f64().unwrap() - 25.0).abs() < 1e-9);
        assert_eq!(data["top_emotions"][0]["emotion"], "joy");
        assert_eq!(data["top_emotions"][0]["count"].as_i64(), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn aggregate_buckets_by_hour(pool: sqlx::PgPool) {
        for (post_id, label, hour) in [
            ("agg-1", "positive", 10),
            ("agg-2", "positive", 10),
            ("agg-3", "negative", 10),
            ("agg-4", "neutral", 11),
        ] {
            sqlx::query(
                "INSERT INTO posts (post_id, source, content, author, created_at) \
                 VALUES ($1, 'twitter', 'content', 'author', NOW())",
            )
            .bind(post_id)
            .execute(&pool)
            .await
            .expect("insert post");

            sqlx::query(
                "INSERT INTO analyses \
                 (post_id, sentiment_label, confidence_score, emotion, model_name, analyzed_at) \
                 VALUES ($1, $2, 0.8, NULL, 'lexicon-v1', \
                         make_timestamptz(2025, 1, 15, $3, 30, 0.0, 'UTC'))",
            )
            .bind(post_id)
            .bind(label)
            .bind(hour)
            .execute(&pool)
            .await
            .expect("insert analysis");
        }

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sentiment/aggregate?period=hour")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["period"], "hour");

        let buckets = json["data"]["data"].as_array().expect("bucket array");
        assert_eq!(buckets.len(), 2, "two distinct hours seeded");
        assert_eq!(buckets[0]["positive_count"].as_i64(), Some(2));
        assert_eq!(buckets[0]["negative_count"].as_i64(), Some(1));
        assert_eq!(buckets[0]["total_count"].as_i64(), Some(3));
        assert!((buckets[0]["positive_percentage"].as_f64().unwrap() - 66.67).abs() < 1e-9);
        assert!((buckets[0]["average_confidence"].as_f64().unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(buckets[1]["neutral_count"].as_i64(), Some(1));
        assert!(
            buckets[0]["timestamp"].as_str().unwrap() < buckets[1]["timestamp"].as_str().unwrap(),
            "buckets ascend by time"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn aggregate_rejects_unknown_period(pool: sqlx::PgPool) {
        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sentiment/aggregate?period=fortnight")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn distribution_respects_source_filter(pool: sqlx::PgPool) {
        seed_analyzed_post(&pool, "src-1", "twitter", "positive", None).await;
        seed_analyzed_post(&pool, "src-2", "reddit", "negative", None).await;

        let app = build_app(test_state(pool));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sentiment/distribution?source=reddit")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["total"].as_i64(), Some(1));
        assert_eq!(json["data"]["distribution"]["negative"].as_i64(), Some(1));
    }
}
