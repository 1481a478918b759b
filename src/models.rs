//! Data models shared by the pipeline.
//!
//! - [`FeedItem`] / [`RawCategory`]: one upstream feed entry, as parsed
//! - [`Article`]: a rewritten, categorized article owned by the cache
//! - [`Category`]: an entry of the fixed [`TAXONOMY`]
//! - [`FeedSnapshot`]: the immutable corpus handed to readers
//!
//! Articles and snapshots serialize with camelCase field names so the JSON
//! output matches what page templates and feed consumers expect.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A taxonomy entry. Only the eight constants in [`TAXONOMY`] exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Category {
    pub name: &'static str,
    pub slug: &'static str,
}

pub const ARCADES: Category = Category { name: "Arcades", slug: "arcades" };
pub const RETRO_GAMES: Category = Category { name: "Retro Games", slug: "retro-games" };
pub const PC_GAMES: Category = Category { name: "PC Games", slug: "pc-games" };
pub const PS5_GAMES: Category = Category { name: "PS5 Games", slug: "ps5-games" };
pub const MOBILE_GAMES: Category = Category { name: "Mobile Games", slug: "mobile-games" };
pub const UPCOMING_RELEASES: Category = Category {
    name: "Upcoming Releases",
    slug: "upcoming-releases",
};
pub const TRENDING: Category = Category { name: "Trending", slug: "trending" };
pub const POPULAR: Category = Category { name: "Popular", slug: "popular" };

/// The fixed taxonomy, in display order.
pub const TAXONOMY: [Category; 8] = [
    ARCADES,
    RETRO_GAMES,
    PC_GAMES,
    PS5_GAMES,
    MOBILE_GAMES,
    UPCOMING_RELEASES,
    TRENDING,
    POPULAR,
];

impl Category {
    /// Look a taxonomy entry up by its slug.
    pub fn from_slug(slug: &str) -> Option<Category> {
        TAXONOMY.iter().copied().find(|category| category.slug == slug)
    }
}

/// A category as declared by the upstream feed, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCategory {
    /// Plain `<category>` text.
    Name(String),
    /// A structured category (Atom `term`/`label`, or richer feed formats).
    Object {
        name: Option<String>,
        label: Option<String>,
        title: Option<String>,
        slug: Option<String>,
    },
}

/// One entry of the upstream feed.
///
/// Every field is optional because real feeds are sloppy. The extractor picks
/// the first non-empty body field in the order `content_encoded`, `content`,
/// `summary`, `description`, `content_snippet`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub id: Option<String>,
    pub content_encoded: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub content_snippet: Option<String>,
    pub categories: Vec<RawCategory>,
    pub published_at: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Stable identity of the entry: guid, else entry id, else link.
    pub fn source_id(&self) -> Option<&str> {
        [&self.guid, &self.id, &self.link]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

/// A rewritten article as kept in the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub source_id: String,
    pub slug: String,
    pub title: String,
    pub original_title: String,
    pub link: Option<String>,
    pub original_content: String,
    pub content: String,
    pub paragraphs: Vec<String>,
    pub excerpt: String,
    pub rewritten_at: DateTime<Utc>,
    pub categories: Vec<Category>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: String,
}

impl Article {
    /// Host name of the source link, e.g. `"www.example.com"` for
    /// `"https://www.example.com/a/b"`. `None` for missing or non-http links.
    pub fn source_host(&self) -> Option<String> {
        let link = self.link.as_deref()?;
        let parsed = url::Url::parse(link).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        parsed.host_str().map(str::to_string)
    }

    /// Whether the source link is an absolute http(s) URL.
    pub fn has_http_link(&self) -> bool {
        self.link.as_deref().is_some_and(|link| {
            let lowered = link.to_ascii_lowercase();
            lowered.starts_with("http://") || lowered.starts_with("https://")
        })
    }
}

/// The published corpus. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub last_fetched: DateTime<Utc>,
    pub articles: Vec<Article>,
    pub categories: Vec<Category>,
}

impl FeedSnapshot {
    /// The state before the first refresh: no articles, stamped at the Unix epoch.
    pub fn empty() -> Self {
        Self {
            last_fetched: DateTime::<Utc>::UNIX_EPOCH,
            articles: Vec::new(),
            categories: Vec::new(),
        }
    }
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
