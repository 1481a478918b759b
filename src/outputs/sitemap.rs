//! `sitemap.xml` rendering.

use crate::config::SiteConfig;
use crate::models::{Article, Category};
use crate::utils::ensure_leading_slash;
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use std::collections::HashSet;

fn iso(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn article_lastmod(article: &Article) -> String {
    iso(article.published_at.unwrap_or(article.rewritten_at))
}

struct UrlSet<'a> {
    base_url: &'a str,
    seen: HashSet<String>,
    entries: Vec<String>,
}

impl<'a> UrlSet<'a> {
    fn new(base_url: &'a str) -> Self {
        Self {
            base_url,
            seen: HashSet::new(),
            entries: Vec::new(),
        }
    }

    /// Add a page; later entries with an already listed path are dropped.
    fn push(&mut self, path: &str, lastmod: &str, priority: f32) {
        let path = ensure_leading_slash(path);
        if !self.seen.insert(path.clone()) {
            return;
        }
        let loc = format!("{}{}", self.base_url, path);
        self.entries.push(format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>hourly</changefreq>\n    <priority>{:.1}</priority>\n  </url>",
            escape(loc.as_str()),
            escape(lastmod),
            priority
        ));
    }
}

/// Sitemap listing the home page, the feed, every category page and every
/// article page.
///
/// Category pages carry the date of their newest article (articles are
/// expected newest first). Pages without a better date use `last_fetched`.
pub fn build_sitemap_xml(
    articles: &[Article],
    categories: &[Category],
    last_fetched: DateTime<Utc>,
    site: &SiteConfig,
) -> String {
    let default_lastmod = iso(last_fetched);
    let mut urls = UrlSet::new(&site.base_url);

    urls.push("/", &default_lastmod, 1.0);
    urls.push(&site.feed_path, &default_lastmod, 0.6);

    for category in categories {
        let lastmod = articles
            .iter()
            .find(|article| article.categories.contains(category))
            .map(article_lastmod)
            .unwrap_or_else(|| default_lastmod.clone());
        urls.push(&format!("/category/{}", category.slug), &lastmod, 0.8);
    }

    for article in articles.iter().filter(|article| !article.slug.is_empty()) {
        urls.push(&format!("/news/{}", article.slug), &article_lastmod(article), 0.9);
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}\n</urlset>",
        urls.entries.join("\n")
    )
}
