use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote analyzer returned invalid payload: {0}")]
    InvalidResponse(String),
}
