//! The ingestion controller.
//!
//! [`FeedService::fetch_feed`] is the one entry point readers and the
//! scheduler use. It owns the cached [`FeedSnapshot`] and decides when to
//! poll upstream.
//!
//! # Refresh Pipeline
//!
//! 1. **Freshness**: a non-empty snapshot younger than the refresh interval
//!    is returned as is, unless the caller forces a refresh.
//! 2. **Single flight**: refreshes are serialized; a caller that waited on
//!    another refresh gets that refresh's result instead of starting its own.
//! 3. **Poll** the [`FeedSource`]; failures keep the existing corpus.
//! 4. **Select** unseen entries by source identity, up to
//!    `max_articles_per_refresh`, assigning each a unique slug.
//! 5. **Process** entries concurrently (extract, rewrite, excerpt, declared
//!    categories), bounded by the worker count.
//! 6. **Merge** new before old, dedup by slug, sort newest first.
//! 7. **Publish** a new snapshot atomically.
//!
//! # Concurrency
//!
//! Readers clone an `Arc<FeedSnapshot>` out of a `RwLock` and never observe
//! a half-built corpus. The lock is only held for the pointer swap.

use crate::categorize::{build_category_map, normalize_declared};
use crate::config::{AppConfig, FeedConfig};
use crate::error::Result;
use crate::extract::ContentExtractor;
use crate::feed::{FeedSource, HttpFeedSource};
use crate::models::{Article, FeedItem, FeedSnapshot};
use crate::rewrite::remote::RemoteRewriter;
use crate::rewrite::retry::RetryRewrite;
use crate::rewrite::{RewriteBackend, RewriteEngine};
use crate::text::{
    condense_whitespace, create_article_slug_from_title, create_excerpt, ensure_unique_slug,
    split_into_paragraphs,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

/// Attribution stamped on every article.
pub const AUTHOR: &str = "Editorial Team";

/// A feed entry picked for processing, with its slug already reserved.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingItem {
    pub index: usize,
    pub item: FeedItem,
    pub title: String,
    pub slug: String,
    pub source_id: Option<String>,
}

fn article_identity(article: &Article) -> Option<&str> {
    [
        Some(article.source_id.as_str()),
        Some(article.id.as_str()),
        article.link.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|identity| !identity.is_empty())
}

/// Pick unseen feed entries in feed order.
///
/// Entries whose identity already exists in the store (or earlier in this
/// feed) are skipped. Each picked entry gets a slug unique against the store
/// and against the other picks. Scanning stops after `max_items` picks.
pub fn select_new_items(existing: &[Article], items: Vec<FeedItem>, max_items: usize) -> Vec<PendingItem> {
    let mut seen_sources: HashSet<String> = existing
        .iter()
        .filter_map(article_identity)
        .map(str::to_string)
        .collect();
    let mut used_slugs: HashSet<String> = existing.iter().map(|article| article.slug.clone()).collect();
    let mut pending = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        if pending.len() >= max_items {
            break;
        }

        let title = item
            .title
            .clone()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Untitled #{}", index + 1));
        let source_id = item.source_id().map(str::to_string);

        if let Some(source_id) = &source_id {
            if !seen_sources.insert(source_id.clone()) {
                debug!(%source_id, "Skipping already ingested entry");
                continue;
            }
        }

        let slug = ensure_unique_slug(&create_article_slug_from_title(&title), &mut used_slugs);
        pending.push(PendingItem {
            index,
            item,
            title,
            slug,
            source_id,
        });
    }

    pending
}

/// New articles first, first occurrence of each slug wins, newest publish
/// date first. Undated articles sort as if published at the Unix epoch.
pub fn merge_articles(existing: Vec<Article>, incoming: Vec<Article>) -> Vec<Article> {
    let mut merged: Vec<Article> = incoming
        .into_iter()
        .chain(existing)
        .unique_by(|article| article.slug.clone())
        .collect();
    let published = |article: &Article| {
        article
            .published_at
            .map(|date| date.timestamp_millis())
            .unwrap_or(0)
    };
    merged.sort_by(|a, b| published(b).cmp(&published(a)));
    merged
}

/// Owns the cached corpus and refreshes it from a [`FeedSource`].
pub struct FeedService<S, B> {
    source: Option<S>,
    extractor: ContentExtractor,
    engine: RewriteEngine<B>,
    config: FeedConfig,
    snapshot: RwLock<Arc<FeedSnapshot>>,
    refresh_guard: Mutex<()>,
}

/// The service as wired by the binary.
pub type LiveFeedService = FeedService<HttpFeedSource, RetryRewrite<RemoteRewriter>>;

impl LiveFeedService {
    /// Build the HTTP-backed service from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let source = match config.feed.url.as_deref() {
            Some(url) => Some(HttpFeedSource::new(
                url,
                Duration::from_secs(config.feed.timeout_secs),
            )?),
            None => None,
        };
        let extractor = ContentExtractor::new(config.extract.clone())?;
        let remote = RemoteRewriter::new(&config.rewrite)?;
        let backend = RetryRewrite::new(
            remote,
            config.rewrite.max_retries,
            Duration::from_millis(config.rewrite.retry_base_delay_ms),
        );
        let engine = RewriteEngine::new(backend, config.rewrite.similarity_threshold);
        Ok(Self::new(source, extractor, engine, config.feed.clone()))
    }
}

impl<S, B> FeedService<S, B>
where
    S: FeedSource,
    B: RewriteBackend,
{
    /// A service with an empty corpus. `source: None` means no feed is configured.
    pub fn new(
        source: Option<S>,
        extractor: ContentExtractor,
        engine: RewriteEngine<B>,
        config: FeedConfig,
    ) -> Self {
        Self {
            source,
            extractor,
            engine,
            config,
            snapshot: RwLock::new(Arc::new(FeedSnapshot::empty())),
            refresh_guard: Mutex::new(()),
        }
    }

    /// The current snapshot, without any refresh.
    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn publish(&self, snapshot: Arc<FeedSnapshot>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    fn is_fresh(&self, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(snapshot.last_fetched);
        !snapshot.articles.is_empty()
            && age
                .to_std()
                .map(|age| age < self.config.refresh_interval())
                .unwrap_or(true)
    }

    /// Return the corpus, refreshing it first when stale or when forced.
    ///
    /// # Arguments
    ///
    /// * `force_refresh` - Skip the freshness check
    ///
    /// # Returns
    ///
    /// Always a valid snapshot; upstream failures keep the previous corpus.
    #[instrument(level = "info", skip_all, fields(force_refresh = force_refresh))]
    pub async fn fetch_feed(&self, force_refresh: bool) -> Arc<FeedSnapshot> {
        let current = self.snapshot();
        if !force_refresh && self.is_fresh(&current, Utc::now()) {
            debug!("Serving cached snapshot");
            return current;
        }
        let observed = current.last_fetched;

        let _guard = self.refresh_guard.lock().await;
        let latest = self.snapshot();
        if latest.last_fetched != observed {
            debug!("Another refresh completed while waiting; reusing its snapshot");
            return latest;
        }

        let t0 = Instant::now();
        let next = Arc::new(self.refresh(&latest).await);
        self.publish(Arc::clone(&next));
        info!(
            articles = next.articles.len(),
            categories = next.categories.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Published feed snapshot"
        );
        next
    }

    fn restamp(&self, current: &FeedSnapshot, now: DateTime<Utc>) -> FeedSnapshot {
        let mut articles = current.articles.clone();
        let categories = build_category_map(
            &mut articles,
            self.config.excerpt_min_words,
            self.config.excerpt_max_words,
        );
        FeedSnapshot {
            last_fetched: now,
            articles,
            categories,
        }
    }

    async fn refresh(&self, current: &FeedSnapshot) -> FeedSnapshot {
        let now = Utc::now();

        let Some(source) = &self.source else {
            info!("No feed URL configured; publishing an empty corpus");
            return FeedSnapshot {
                last_fetched: now,
                articles: Vec::new(),
                categories: Vec::new(),
            };
        };

        let items = match source.fetch_items().await {
            Ok(items) => items,
            Err(e) => {
                error!(error = %e, "Failed to fetch upstream feed; keeping existing articles");
                return self.restamp(current, now);
            }
        };

        let total = items.len();
        let pending = select_new_items(&current.articles, items, self.config.max_articles_per_refresh);
        info!(entries = total, new = pending.len(), "Scanned feed entries");
        if pending.is_empty() {
            return self.restamp(current, now);
        }

        let mut processed: Vec<(usize, Article)> = stream::iter(pending)
            .map(|pending| async move {
                let index = pending.index;
                (index, self.process_item(pending, now).await)
            })
            .buffer_unordered(self.config.worker_count())
            .collect()
            .await;
        processed.sort_by_key(|(index, _)| *index);
        let incoming: Vec<Article> = processed.into_iter().map(|(_, article)| article).collect();

        let mut merged = merge_articles(current.articles.clone(), incoming);
        let categories = build_category_map(
            &mut merged,
            self.config.excerpt_min_words,
            self.config.excerpt_max_words,
        );
        FeedSnapshot {
            last_fetched: now,
            articles: merged,
            categories,
        }
    }

    #[instrument(level = "info", skip_all, fields(slug = %pending.slug))]
    async fn process_item(&self, pending: PendingItem, now: DateTime<Utc>) -> Article {
        let PendingItem {
            item,
            title,
            slug,
            source_id,
            ..
        } = pending;

        let original_body = self.extractor.fetch_full_article_body(&item).await;
        let rewrite = self.engine.ensure_unique_rewrite(&title, &original_body).await;

        let paragraphs = if rewrite.paragraphs.is_empty() {
            split_into_paragraphs(&rewrite.body)
        } else {
            rewrite.paragraphs
        };
        let content = if paragraphs.is_empty() {
            let body = if rewrite.body.is_empty() {
                &original_body
            } else {
                &rewrite.body
            };
            condense_whitespace(body)
        } else {
            paragraphs.join("\n\n")
        };
        let final_title = if rewrite.title.trim().is_empty() {
            title.clone()
        } else {
            rewrite.title
        };
        let excerpt = create_excerpt(
            &paragraphs,
            &content,
            &original_body,
            self.config.excerpt_min_words,
            self.config.excerpt_max_words,
        );
        let identity = source_id.unwrap_or_else(|| slug.clone());

        debug!(paragraphs = paragraphs.len(), "Processed article");
        Article {
            id: identity.clone(),
            source_id: identity,
            slug,
            title: final_title,
            original_title: title,
            link: item.link,
            original_content: original_body,
            content,
            paragraphs,
            excerpt,
            rewritten_at: now,
            categories: normalize_declared(&item.categories),
            published_at: item.published_at,
            author: AUTHOR.to_string(),
        }
    }
}
