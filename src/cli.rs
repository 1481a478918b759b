//! Command-line interface definitions for Awful Game News.
//!
//! Every option can also be supplied through the environment variable named
//! next to it. Options left unset fall back to the YAML file given with
//! `--config`, then to the built-in defaults.

use crate::config::{AppConfig, DialectSetting};
use clap::Parser;

/// Command-line arguments for the Awful Game News service.
///
/// # Examples
///
/// ```sh
/// # One refresh, write outputs, exit
/// awful_game_news --feed-url https://news.example.com/rss --output-dir ./public --once
///
/// # Keep running, rewriting through OpenRouter
/// GROK_API_URL=https://openrouter.ai/api/v1/chat/completions GROK_API_KEY=sk-... \
///   awful_game_news -c config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a config.yaml file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Upstream RSS/Atom feed URL
    #[arg(long, env = "RSS_FEED_URL")]
    pub feed_url: Option<String>,

    /// Minutes a cached snapshot stays fresh
    #[arg(long, env = "FEED_REFRESH_MINUTES")]
    pub refresh_minutes: Option<u64>,

    /// Most new articles processed per refresh
    #[arg(long, env = "MAX_ARTICLES_PER_REFRESH")]
    pub max_articles: Option<usize>,

    /// Lower bound for excerpt length, in words
    #[arg(long, env = "EXCERPT_MIN_WORDS")]
    pub excerpt_min_words: Option<usize>,

    /// Upper bound for excerpt length, in words
    #[arg(long, env = "EXCERPT_MAX_WORDS")]
    pub excerpt_max_words: Option<usize>,

    /// Rewrite service endpoint
    #[arg(long, env = "GROK_API_URL")]
    pub api_url: Option<String>,

    /// Rewrite service API key
    #[arg(long, env = "GROK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Rewrite model name
    #[arg(long, env = "GROK_MODEL")]
    pub model: Option<String>,

    /// Rewrite wire dialect
    #[arg(long, env = "GROK_DIALECT", value_enum)]
    pub dialect: Option<DialectSetting>,

    /// `HTTP-Referer` sent to chat endpoints
    #[arg(long, env = "OPENROUTER_REFERRER")]
    pub referrer: Option<String>,

    /// `X-Title` sent to chat endpoints
    #[arg(long, env = "OPENROUTER_SITE_TITLE")]
    pub site_title: Option<String>,

    /// Minutes between forced refreshes
    #[arg(long, env = "FEED_SCHEDULE_MINUTES")]
    pub schedule_minutes: Option<u64>,

    /// Public base URL used in the RSS feed and sitemap
    #[arg(long, env = "SITE_BASE_URL")]
    pub site_base_url: Option<String>,

    /// Path of the published RSS feed
    #[arg(long, env = "SITE_FEED_PATH")]
    pub site_feed_path: Option<String>,

    /// Articles included in the published RSS feed
    #[arg(long, env = "SITE_FEED_LIMIT")]
    pub site_feed_limit: Option<usize>,

    /// Channel description of the published RSS feed
    #[arg(long, env = "SITE_DESCRIPTION")]
    pub site_description: Option<String>,

    /// Channel language of the published RSS feed
    #[arg(long, env = "SITE_FEED_LANGUAGE")]
    pub site_language: Option<String>,

    /// Directory receiving articles.json, feed.xml and sitemap.xml
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Refresh once, write outputs and exit
    #[arg(long)]
    pub once: bool,
}

fn set<T>(target: &mut T, value: &Option<T>)
where
    T: Clone,
{
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl Cli {
    /// Layer the flags that were given on top of `config`.
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if self.feed_url.is_some() {
            config.feed.url = self.feed_url.clone();
        }
        set(&mut config.feed.refresh_minutes, &self.refresh_minutes);
        set(&mut config.feed.max_articles_per_refresh, &self.max_articles);
        set(&mut config.feed.excerpt_min_words, &self.excerpt_min_words);
        set(&mut config.feed.excerpt_max_words, &self.excerpt_max_words);

        if self.api_url.is_some() {
            config.rewrite.api_url = self.api_url.clone();
        }
        if self.api_key.is_some() {
            config.rewrite.api_key = self.api_key.clone();
        }
        set(&mut config.rewrite.model, &self.model);
        set(&mut config.rewrite.dialect, &self.dialect);
        set(&mut config.rewrite.referrer, &self.referrer);
        set(&mut config.rewrite.site_title, &self.site_title);

        set(&mut config.schedule_minutes, &self.schedule_minutes);
        set(&mut config.site.base_url, &self.site_base_url);
        set(&mut config.site.feed_path, &self.site_feed_path);
        set(&mut config.site.feed_limit, &self.site_feed_limit);
        set(&mut config.site.description, &self.site_description);
        set(&mut config.site.language, &self.site_language);

        if self.output_dir.is_some() {
            config.output_dir = self.output_dir.clone();
        }
        config
    }
}
