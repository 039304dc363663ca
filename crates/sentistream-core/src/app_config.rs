use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which analyzer backend the worker builds at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerBackend {
    /// In-process lexicon scorer.
    Lexicon,
    /// Remote inference endpoint with a neutral fallback result on failure.
    Remote { url: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,

    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Event stream / consumer group
    pub stream_name: String,
    pub consumer_group: String,
    pub stream_block_secs: u64,
    pub stream_batch_size: i64,
    pub stream_visibility_timeout_secs: u64,

    // Analyzer
    pub analyzer_backend: AnalyzerBackend,
    pub analyzer_timeout_secs: u64,

    // Broadcast hub
    pub hub_queue_capacity: usize,

    // Aggregation / alert monitor
    pub alert_interval_secs: u64,
    pub alert_window_minutes: i64,
    pub alert_negative_ratio_threshold: f64,
    pub alert_min_posts: i64,
    pub metrics_interval_secs: u64,

    // Synthetic ingester
    pub ingest_posts_per_minute: u32,
    pub ingest_duration_secs: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("stream_name", &self.stream_name)
            .field("consumer_group", &self.consumer_group)
            .field("stream_block_secs", &self.stream_block_secs)
            .field("stream_batch_size", &self.stream_batch_size)
            .field(
                "stream_visibility_timeout_secs",
                &self.stream_visibility_timeout_secs,
            )
            .field("analyzer_backend", &self.analyzer_backend)
            .field("analyzer_timeout_secs", &self.analyzer_timeout_secs)
            .field("hub_queue_capacity", &self.hub_queue_capacity)
            .field("alert_interval_secs", &self.alert_interval_secs)
            .field("alert_window_minutes", &self.alert_window_minutes)
            .field(
                "alert_negative_ratio_threshold",
                &self.alert_negative_ratio_threshold,
            )
            .field("alert_min_posts", &self.alert_min_posts)
            .field("metrics_interval_secs", &self.metrics_interval_secs)
            .field("ingest_posts_per_minute", &self.ingest_posts_per_minute)
            .field("ingest_duration_secs", &self.ingest_duration_secs)
            .finish()
    }
}
