//! Error type shared by the pipeline.
//!
//! Most of these never reach a caller of [`crate::ingest::FeedService::fetch_feed`]:
//! the extractor, the rewrite engine and the controller turn them into
//! fallbacks and a log line. They exist so the inner functions can use `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("response from {url} exceeds {limit} bytes")]
    PayloadTooLarge { url: String, limit: usize },

    #[error("feed parsing error: {0}")]
    FeedParse(String),

    #[error("malformed rewrite response: {0}")]
    MalformedResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, NewsError>;
