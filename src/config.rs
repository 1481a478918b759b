//! Runtime configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults ([`AppConfig::default`]),
//! 2. an optional YAML file (`--config path.yaml`),
//! 3. command-line flags and their environment variables ([`crate::cli::Cli`]).
//!
//! [`AppConfig::validated`] then clamps numeric settings into their legal ranges.
//!
//! # Example
//!
//! ```yaml
//! feed:
//!   url: https://news.example.com/gaming.xml
//!   refresh_minutes: 15
//!   max_articles_per_refresh: 10
//! rewrite:
//!   api_url: https://openrouter.ai/api/v1/chat/completions
//!   model: xai/grok-2-latest
//!   max_retries: 2
//! site:
//!   base_url: https://gamingtechware.com
//! output_dir: ./public
//! ```

use crate::error::{NewsError, Result};
use crate::extract::ExtractConfig;
use crate::rewrite::DEFAULT_SIMILARITY_THRESHOLD;
use crate::utils::{ensure_leading_slash, trim_base_url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

/// Which remote wire dialect to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DialectSetting {
    /// Chat for OpenRouter hosts, completion otherwise.
    #[default]
    Auto,
    Chat,
    Completion,
}

/// Upstream feed and refresh policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: Option<String>,
    /// Cached snapshots younger than this are served without polling.
    pub refresh_minutes: u64,
    pub max_articles_per_refresh: usize,
    /// Concurrent per-item workers. Defaults to `max_articles_per_refresh`.
    pub workers: Option<usize>,
    pub excerpt_min_words: usize,
    pub excerpt_max_words: usize,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            refresh_minutes: 15,
            max_articles_per_refresh: 10,
            workers: None,
            excerpt_min_words: 30,
            excerpt_max_words: 50,
            timeout_secs: 15,
        }
    }
}

impl FeedConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes.max(1) * 60)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .unwrap_or(self.max_articles_per_refresh)
            .max(1)
    }
}

/// Remote rewrite service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub dialect: DialectSetting,
    /// Sent as `HTTP-Referer` on chat requests.
    pub referrer: String,
    /// Sent as `X-Title` on chat requests.
    pub site_title: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub similarity_threshold: f64,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            model: "xai/grok-2-latest".to_string(),
            dialect: DialectSetting::Auto,
            referrer: "http://localhost:3000".to_string(),
            site_title: "gamingtechware.com".to_string(),
            timeout_secs: 15,
            max_retries: 0,
            retry_base_delay_ms: 1000,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Public site settings used by the RSS and sitemap writers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    pub feed_path: String,
    pub feed_limit: usize,
    pub description: String,
    pub language: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "gamingtechware.com".to_string(),
            base_url: "https://gamingtechware.com".to_string(),
            feed_path: "/feed.xml".to_string(),
            feed_limit: 30,
            description: "GamingTechWare curates and rewrites the latest gaming and tech stories with full context.".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Everything the binary needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub extract: ExtractConfig,
    pub rewrite: RewriteConfig,
    pub site: SiteConfig,
    /// Forced refresh cadence of the scheduler.
    pub schedule_minutes: u64,
    pub output_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            extract: ExtractConfig::default(),
            rewrite: RewriteConfig::default(),
            site: SiteConfig::default(),
            schedule_minutes: 360,
            output_dir: None,
        }
    }
}

impl AppConfig {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `path`, or the defaults when no path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path)
                    .map_err(|e| NewsError::Config(format!("cannot read {path}: {e}")))?;
                let config = Self::from_yaml_str(&yaml)?;
                info!("Loaded configuration file");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Clamp settings into their legal ranges and normalize URLs/paths.
    pub fn validated(mut self) -> Self {
        self.feed.refresh_minutes = self.feed.refresh_minutes.max(1);
        self.feed.max_articles_per_refresh = self.feed.max_articles_per_refresh.max(1);
        self.feed.workers = self.feed.workers.map(|workers| workers.max(1));
        self.feed.excerpt_min_words = self.feed.excerpt_min_words.max(5);
        self.feed.excerpt_max_words = self.feed.excerpt_max_words.max(self.feed.excerpt_min_words);
        self.feed.timeout_secs = self.feed.timeout_secs.max(1);
        self.feed.url = self.feed.url.filter(|url| !url.trim().is_empty());

        self.rewrite.timeout_secs = self.rewrite.timeout_secs.max(1);
        if !(0.0..=1.0).contains(&self.rewrite.similarity_threshold) {
            self.rewrite.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }

        self.site.base_url = trim_base_url(&self.site.base_url);
        self.site.feed_path = ensure_leading_slash(&self.site.feed_path);
        self.site.feed_limit = self.site.feed_limit.max(1);

        self.extract.timeout_secs = self.extract.timeout_secs.max(1);
        self.schedule_minutes = self.schedule_minutes.max(1);
        self
    }
}
