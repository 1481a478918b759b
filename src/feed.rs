//! Upstream feed polling and parsing.
//!
//! RSS 2.0 is tried first, Atom second. Both are flattened into
//! [`FeedItem`]s so the rest of the pipeline never sees the wire format.

use crate::error::{NewsError, Result};
use crate::models::{FeedItem, RawCategory};
use crate::text::{condense_whitespace, strip_html};
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument};

/// Anything that can produce the current list of feed entries.
pub trait FeedSource {
    /// Fetch and parse the feed, in feed order.
    async fn fetch_items(&self) -> Result<Vec<FeedItem>>;
}

/// Parse an RFC 2822 (RSS) or RFC 3339 (Atom) timestamp. Garbage yields `None`.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn snippet(html: Option<&str>) -> Option<String> {
    html.map(|html| condense_whitespace(&strip_html(html)))
        .filter(|text| !text.is_empty())
}

fn from_rss_item(item: &rss::Item) -> FeedItem {
    FeedItem {
        title: non_empty(item.title()),
        link: non_empty(item.link()),
        guid: non_empty(item.guid().map(|guid| guid.value())),
        id: None,
        content_encoded: item.content().map(str::to_string),
        content: None,
        summary: None,
        description: item.description().map(str::to_string),
        content_snippet: snippet(item.content().or(item.description())),
        categories: item
            .categories()
            .iter()
            .map(|category| RawCategory::Name(category.name().to_string()))
            .collect(),
        published_at: item.pub_date().and_then(parse_date),
    }
}

fn from_atom_entry(entry: &atom_syndication::Entry) -> FeedItem {
    let link = entry
        .links()
        .iter()
        .find(|link| link.rel() == "alternate")
        .or_else(|| entry.links().first())
        .map(|link| link.href());
    let content = entry.content().and_then(|content| content.value());
    let summary = entry.summary().map(|summary| summary.as_str());
    let published = entry
        .published()
        .or(Some(entry.updated()))
        .filter(|date| date.timestamp() != 0)
        .map(|date| date.with_timezone(&Utc));

    FeedItem {
        title: non_empty(Some(entry.title().as_str())),
        link: non_empty(link),
        guid: None,
        id: non_empty(Some(entry.id())),
        content_encoded: None,
        content: content.map(str::to_string),
        summary: summary.map(str::to_string),
        description: None,
        content_snippet: snippet(content.or(summary)),
        categories: entry
            .categories()
            .iter()
            .map(|category| RawCategory::Object {
                name: non_empty(Some(category.term())),
                label: non_empty(category.label()),
                title: None,
                slug: None,
            })
            .collect(),
        published_at: published,
    }
}

/// Parse a feed document.
///
/// # Errors
///
/// [`NewsError::FeedParse`] when the bytes are neither RSS nor Atom.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let rss_error = match rss::Channel::read_from(bytes) {
        Ok(channel) => return Ok(channel.items().iter().map(from_rss_item).collect()),
        Err(e) => e,
    };
    match atom_syndication::Feed::read_from(bytes) {
        Ok(feed) => Ok(feed.entries().iter().map(from_atom_entry).collect()),
        Err(atom_error) => Err(NewsError::FeedParse(format!(
            "not RSS ({rss_error}) and not Atom ({atom_error})"
        ))),
    }
}

/// Polls a feed URL over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        url::Url::parse(&url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch_items(&self) -> Result<Vec<FeedItem>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }
        let bytes = response.bytes().await?;
        let items = parse_feed(&bytes)?;
        info!(count = items.len(), "Fetched feed entries");
        Ok(items)
    }
}
