//! Remote inference backend with neutral fallback.
//!
//! Posts `{"text": ...}` to a configured endpoint and expects the analysis
//! fields back as JSON. Any transport, status, or decode failure degrades to
//! a neutral default result — the worker keeps flowing when the inference
//! service is down, it just stops adding signal.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{AnalysisOutcome, Analyzer, AnalyzerError};
use sentistream_core::SentimentLabel;

const FALLBACK_MODEL_NAME: &str = "remote-fallback";

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    sentiment_label: SentimentLabel,
    confidence_score: f64,
    emotion: Option<String>,
    model_name: String,
}

/// The remote-LLM analyzer variant.
pub struct RemoteAnalyzer {
    client: reqwest::Client,
    url: String,
}

impl RemoteAnalyzer {
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialised, which happens before
    /// the worker starts processing anything.
    #[must_use]
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            url: url.to_string(),
        }
    }

    async fn call_remote(&self, text: &str) -> Result<AnalyzeResponse, AnalyzerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AnalyzeRequest { text })
            .send()
            .await?
            .error_for_status()?;

        let parsed: AnalyzeResponse = response.json().await?;

        if !(0.0..=1.0).contains(&parsed.confidence_score) {
            return Err(AnalyzerError::InvalidResponse(format!(
                "confidence_score out of range: {}",
                parsed.confidence_score
            )));
        }

        Ok(parsed)
    }

    fn neutral_fallback() -> AnalysisOutcome {
        AnalysisOutcome {
            sentiment_label: SentimentLabel::Neutral,
            confidence_score: 0.0,
            emotion: None,
            model_name: FALLBACK_MODEL_NAME.to_string(),
        }
    }
}

#[async_trait]
impl Analyzer for RemoteAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Option<AnalysisOutcome>, AnalyzerError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        match self.call_remote(text).await {
            Ok(response) => Ok(Some(AnalysisOutcome {
                sentiment_label: response.sentiment_label,
                confidence_score: response.confidence_score,
                emotion: response.emotion,
                model_name: response.model_name,
            })),
            Err(e) => {
                tracing::warn!(error = %e, "remote analyzer failed; using neutral fallback");
                Ok(Some(Self::neutral_fallback()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn analyzer_for(server: &MockServer) -> RemoteAnalyzer {
        RemoteAnalyzer::new(
            &format!("{}/analyze", server.uri()),
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn successful_response_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .and(body_json(serde_json::json!({"text": "love it"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sentiment_label": "positive",
                "confidence_score": 0.93,
                "emotion": "joy",
                "model_name": "distilbert-base-uncased",
            })))
            .mount(&server)
            .await;

        let outcome = analyzer_for(&server)
            .analyze("love it")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.sentiment_label, SentimentLabel::Positive);
        assert!((outcome.confidence_score - 0.93).abs() < 1e-9);
        assert_eq!(outcome.emotion.as_deref(), Some("joy"));
        assert_eq!(outcome.model_name, "distilbert-base-uncased");
    }

    #[tokio::test]
    async fn server_error_falls_back_to_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let outcome = analyzer_for(&server)
            .analyze("anything")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.sentiment_label, SentimentLabel::Neutral);
        assert_eq!(outcome.confidence_score, 0.0);
        assert_eq!(outcome.model_name, FALLBACK_MODEL_NAME);
    }

    #[tokio::test]
    async fn undecodable_body_falls_back_to_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let outcome = analyzer_for(&server)
            .analyze("anything")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.sentiment_label, SentimentLabel::Neutral);
    }

    #[tokio::test]
    async fn out_of_range_confidence_falls_back_to_neutral() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/analyze"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sentiment_label": "positive",
                "confidence_score": 3.5,
                "emotion": null,
                "model_name": "m",
            })))
            .mount(&server)
            .await;

        let outcome = analyzer_for(&server)
            .analyze("anything")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.sentiment_label, SentimentLabel::Neutral);
    }

    #[tokio::test]
    async fn empty_text_skips_without_calling_remote() {
        // No mock mounted: a request would 404 and trip the fallback path,
        // but empty text must return None before any HTTP happens.
        let server = MockServer::start().await;
        let result = analyzer_for(&server).analyze("  ").await.unwrap();
        assert!(result.is_none());
    }
}
