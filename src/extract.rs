//! Full-article text extraction.
//!
//! Feed entries usually carry a teaser, not the story. [`ContentExtractor`]
//! follows the entry's link, strips page chrome and scores candidate
//! containers to find the article body.
//!
//! # Scoring
//!
//! For each element matched by one of the candidate selectors (tried in
//! order, `article` first), the `<p>` descendants of at least
//! `min_paragraph_chars` characters are collected. A container without such
//! paragraphs contributes its whole text when it is longer than
//! `min_container_chars`. The score is `words + 20 × paragraphs`; only
//! candidates with at least `min_candidate_words` words compete and the
//! first strictly best one wins.
//!
//! When nothing qualifies, every long-enough `<p>` on the page is used.
//!
//! # Failure Handling
//!
//! Extraction never fails: a missing link, a network error, an oversized
//! page or a thin result all degrade to the text already present in the feed.

use crate::error::{NewsError, Result};
use crate::models::FeedItem;
use crate::text::{condense_whitespace, strip_html};
use once_cell::sync::Lazy;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0 Safari/537.36";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

const CANDIDATE_SELECTORS: [&str; 20] = [
    "article",
    "main",
    "[role=\"main\"]",
    "#main",
    "#content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    ".story-body",
    ".post-body",
    ".blog-post",
    ".single-post",
    ".news-content",
    ".news-article",
    "div[class*=\"article\"]",
    "div[class*=\"content\"]",
    "section[class*=\"article\"]",
    "section[class*=\"content\"]",
];

static CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    CANDIDATE_SELECTORS
        .iter()
        .map(|selector| Selector::parse(selector).unwrap())
        .collect()
});

static NOISE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("script, style, noscript, svg, iframe, form, aside, header, footer, nav, video, audio")
        .unwrap()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Thresholds and limits for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Page fetch timeout.
    pub timeout_secs: u64,
    /// Largest page body accepted, in bytes.
    pub max_bytes: usize,
    /// Shortest `<p>` text kept.
    pub min_paragraph_chars: usize,
    /// A container without paragraphs must be longer than this.
    pub min_container_chars: usize,
    /// Fewest words for a candidate container to compete.
    pub min_candidate_words: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_bytes: 512 * 1024,
            min_paragraph_chars: 40,
            min_container_chars: 120,
            min_candidate_words: 80,
        }
    }
}

/// The body text the feed itself carries: first non-empty of
/// `content:encoded`, `content`, `summary`, `description`, `contentSnippet`,
/// stripped of markup and condensed.
pub fn extract_original_body(item: &FeedItem) -> String {
    let raw = [
        &item.content_encoded,
        &item.content,
        &item.summary,
        &item.description,
        &item.content_snippet,
    ]
    .into_iter()
    .filter_map(|field| field.as_deref())
    .find(|field| !field.trim().is_empty())
    .unwrap_or("");
    condense_whitespace(&strip_html(raw))
}

fn sanitize_text(text: &str) -> String {
    condense_whitespace(&text.replace('\u{a0}', " "))
}

fn element_text(element: &ElementRef<'_>) -> String {
    sanitize_text(&element.text().collect::<String>())
}

fn long_paragraphs<'a>(
    paragraphs: impl Iterator<Item = ElementRef<'a>>,
    min_chars: usize,
) -> Vec<String> {
    paragraphs
        .map(|paragraph| element_text(&paragraph))
        .filter(|text| text.chars().count() >= min_chars)
        .collect()
}

fn paragraphs_from_element(element: &ElementRef<'_>, config: &ExtractConfig) -> Vec<String> {
    let paragraphs = long_paragraphs(element.select(&PARAGRAPH), config.min_paragraph_chars);
    if !paragraphs.is_empty() {
        return paragraphs;
    }
    let whole = element_text(element);
    if whole.chars().count() > config.min_container_chars {
        vec![whole]
    } else {
        Vec::new()
    }
}

/// Recover the main article text from a full HTML page.
///
/// Returns paragraphs separated by blank lines, or an empty string when the
/// page has nothing worth keeping.
pub fn extract_main_content_from_html(html: &str, config: &ExtractConfig) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let mut document = Html::parse_document(html);
    let noise: Vec<_> = document.select(&NOISE).map(|element| element.id()).collect();
    for id in noise {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    // Detached nodes stay in the arena; only walk what is still under the root.
    let root = document.root_element();
    let mut best_content = String::new();
    let mut best_score = 0usize;

    for selector in CANDIDATES.iter() {
        for element in root.select(selector) {
            let paragraphs = paragraphs_from_element(&element, config);
            let combined = paragraphs.join("\n\n");
            let word_count = combined.split_whitespace().count();
            let score = word_count + paragraphs.len() * 20;

            if word_count >= config.min_candidate_words && score > best_score {
                best_score = score;
                best_content = combined;
            }
        }
    }

    if best_content.is_empty() {
        best_content =
            long_paragraphs(root.select(&PARAGRAPH), config.min_paragraph_chars).join("\n\n");
    }

    best_content
}

/// Fetches article pages and extracts their body text.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    config: ExtractConfig,
}

impl ContentExtractor {
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// GET `url` and return its body, refusing anything beyond `max_bytes`.
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let mut response = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let limit = self.config.max_bytes;
        let too_large = || NewsError::PayloadTooLarge {
            url: url.to_string(),
            limit,
        };

        if response.content_length().is_some_and(|length| length > limit as u64) {
            return Err(too_large());
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Best-effort full text for a feed entry. Never fails.
    ///
    /// # Returns
    ///
    /// The extracted page text when it is non-empty and longer than what the
    /// feed carried, otherwise the feed's own text.
    #[instrument(level = "info", skip_all, fields(link = item.link.as_deref().unwrap_or("")))]
    pub async fn fetch_full_article_body(&self, item: &FeedItem) -> String {
        let fallback = extract_original_body(item);
        let link = item.link.as_deref().map(str::trim).unwrap_or("");
        if link.is_empty() {
            debug!("No link; using feed text");
            return fallback;
        }

        let html = match self.fetch_html(link).await {
            Ok(html) => html,
            Err(e) => {
                warn!(error = %e, url = %link, "Failed to fetch full article; using feed text");
                return fallback;
            }
        };

        let extracted = extract_main_content_from_html(&html, &self.config);
        let extracted_len = extracted.chars().count();
        let fallback_len = fallback.chars().count();
        if !extracted.is_empty() && extracted_len > fallback_len {
            info!(chars = extracted_len, "Extracted full article");
            extracted
        } else {
            debug!(extracted_len, fallback_len, "Extraction not better than feed text");
            fallback
        }
    }
}
