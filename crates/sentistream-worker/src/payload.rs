//! Stream entry payload decoding.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use sentistream_db::NewPost;

/// The producer-side wire shape of one stream entry.
#[derive(Debug, Deserialize)]
struct RawStreamPost {
    post_id: String,
    source: String,
    content: String,
    author: String,
    created_at: Option<String>,
}

/// Decode a stream payload into a [`NewPost`].
///
/// `created_at` accepts RFC 3339 (with or without a trailing `Z`) and the
/// offset-less `YYYY-MM-DDTHH:MM:SS` form producers sometimes emit; a
/// missing or unparseable value falls back to `ingested_at`. Decoding fails
/// only when the required string fields are absent — which the caller
/// treats as a terminal drop, since redelivery cannot fix a malformed
/// payload.
pub fn decode_post(payload: &Value, ingested_at: DateTime<Utc>) -> Result<NewPost, serde_json::Error> {
    let raw: RawStreamPost = serde_json::from_value(payload.clone())?;

    let created_at = raw
        .created_at
        .as_deref()
        .and_then(parse_event_time)
        .unwrap_or(ingested_at);

    Ok(NewPost {
        post_id: raw.post_id,
        source: raw.source,
        content: raw.content,
        author: raw.author,
        created_at,
    })
}

fn parse_event_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Offset-less ISO-8601; interpreted as UTC.
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ingested() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn decodes_full_payload_with_zulu_timestamp() {
        let payload = serde_json::json!({
            "post_id": "post_ab12",
            "source": "reddit",
            "content": "great stuff",
            "author": "alex_99",
            "created_at": "2025-01-15T10:30:00Z",
        });

        let post = decode_post(&payload, ingested()).unwrap();
        assert_eq!(post.post_id, "post_ab12");
        assert_eq!(post.source, "reddit");
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn decodes_offsetless_timestamp_as_utc() {
        let payload = serde_json::json!({
            "post_id": "p",
            "source": "twitter",
            "content": "c",
            "author": "a",
            "created_at": "2025-01-15T10:30:00",
        });

        let post = decode_post(&payload, ingested()).unwrap();
        assert_eq!(
            post.created_at,
            Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn missing_created_at_falls_back_to_ingestion_time() {
        let payload = serde_json::json!({
            "post_id": "p",
            "source": "twitter",
            "content": "c",
            "author": "a",
        });

        let post = decode_post(&payload, ingested()).unwrap();
        assert_eq!(post.created_at, ingested());
    }

    #[test]
    fn unparseable_created_at_falls_back_to_ingestion_time() {
        let payload = serde_json::json!({
            "post_id": "p",
            "source": "twitter",
            "content": "c",
            "author": "a",
            "created_at": "yesterday-ish",
        });

        let post = decode_post(&payload, ingested()).unwrap();
        assert_eq!(post.created_at, ingested());
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let payload = serde_json::json!({
            "source": "twitter",
            "content": "c",
            "author": "a",
        });

        assert!(decode_post(&payload, ingested()).is_err());
    }
}
