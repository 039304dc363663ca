//! The analyzer capability consumed by the consumer worker.
//!
//! The pipeline never depends on a concrete inference backend: workers hold
//! an `Arc<dyn Analyzer>` and the backend is chosen from config at startup.
//! Two variants ship here — an in-process lexicon scorer and a remote
//! endpoint client that fails over to a neutral result.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sentistream_core::{AnalyzerBackend, SentimentLabel};

pub mod error;
pub mod lexicon;
pub mod remote;

pub use error::AnalyzerError;
pub use lexicon::LexiconAnalyzer;
pub use remote::RemoteAnalyzer;

/// The enrichment produced for one post.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub sentiment_label: SentimentLabel,
    /// In `[0.0, 1.0]`.
    pub confidence_score: f64,
    pub emotion: Option<String>,
    pub model_name: String,
}

/// Maps post content to a sentiment classification.
///
/// `Ok(None)` means "terminal skip": the content cannot be analyzed (empty
/// or invalid) and retrying would not change that. Callers must acknowledge
/// such entries rather than leave them for redelivery.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<Option<AnalysisOutcome>, AnalyzerError>;
}

/// Build the configured analyzer backend.
#[must_use]
pub fn build_analyzer(backend: &AnalyzerBackend, timeout: Duration) -> Arc<dyn Analyzer> {
    match backend {
        AnalyzerBackend::Lexicon => Arc::new(LexiconAnalyzer::new()),
        AnalyzerBackend::Remote { url } => Arc::new(RemoteAnalyzer::new(url, timeout)),
    }
}
