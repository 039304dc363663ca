//! Enriched-event fan-out notification, published over Postgres
//! LISTEN/NOTIFY. The server's listener task forwards payloads verbatim to
//! WebSocket subscribers, so the JSON built here is the wire format clients
//! see.

use serde_json::{json, Value};
use sqlx::PgPool;

use sentistream_analyzer::AnalysisOutcome;
use sentistream_core::NOTIFY_CHANNEL;
use sentistream_db::{DbError, NewPost};

/// Build the `new_post` fan-out message for one enriched post.
#[must_use]
pub fn build_notification(post: &NewPost, outcome: &AnalysisOutcome) -> Value {
    json!({
        "type": "new_post",
        "data": {
            "post_id": post.post_id,
            "source": post.source,
            "content": post.content,
            "author": post.author,
            "created_at": post.created_at.to_rfc3339(),
            "sentiment": {
                "sentiment_label": outcome.sentiment_label,
                "confidence_score": outcome.confidence_score,
                "emotion": outcome.emotion,
                "model_name": outcome.model_name,
            },
        },
    })
}

/// Publish a notification on the fan-out channel.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the notify fails. Callers log and move on —
/// the entry is already persisted and acked by the time this runs.
pub async fn publish(pool: &PgPool, message: &Value) -> Result<(), DbError> {
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(NOTIFY_CHANNEL)
        .bind(message.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sentistream_core::SentimentLabel;

    #[test]
    fn notification_matches_wire_format() {
        let post = NewPost {
            post_id: "post_ab12".to_string(),
            source: "reddit".to_string(),
            content: "love it".to_string(),
            author: "alex_99".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
        };
        let outcome = AnalysisOutcome {
            sentiment_label: SentimentLabel::Positive,
            confidence_score: 0.9,
            emotion: Some("joy".to_string()),
            model_name: "lexicon-v1".to_string(),
        };

        let message = build_notification(&post, &outcome);

        assert_eq!(message["type"], "new_post");
        assert_eq!(message["data"]["post_id"], "post_ab12");
        assert_eq!(message["data"]["created_at"], "2025-01-15T10:30:00+00:00");
        assert_eq!(message["data"]["sentiment"]["sentiment_label"], "positive");
        assert_eq!(message["data"]["sentiment"]["emotion"], "joy");
        assert_eq!(message["data"]["sentiment"]["model_name"], "lexicon-v1");
    }

    #[test]
    fn notification_carries_null_emotion() {
        let post = NewPost {
            post_id: "p".to_string(),
            source: "twitter".to_string(),
            content: "meh".to_string(),
            author: "a".to_string(),
            created_at: Utc::now(),
        };
        let outcome = AnalysisOutcome {
            sentiment_label: SentimentLabel::Neutral,
            confidence_score: 0.5,
            emotion: None,
            model_name: "lexicon-v1".to_string(),
        };

        let message = build_notification(&post, &outcome);
        assert!(message["data"]["sentiment"]["emotion"].is_null());
    }
}
