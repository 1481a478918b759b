//! RSS 2.0 rendering of the rewritten corpus.
//!
//! Item links point at the site's own article pages (`{base}/news/{slug}`),
//! the upstream link is credited through `<source>`. Article bodies go out as
//! `<p>` HTML inside `content:encoded`.

use crate::config::SiteConfig;
use crate::models::Article;
use crate::text::{condense_whitespace, split_into_paragraphs};
use chrono::{DateTime, Utc};
use quick_xml::escape::escape;

const FALLBACK_TITLE: &str = "Latest update";

/// `Tue, 14 Oct 2025 07:30:00 GMT`
pub fn format_rfc822(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Wrap `value` in a CDATA section, splitting any `]]>` it contains.
pub fn wrap_cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

/// Public URL of an article page.
pub fn article_url(article: &Article, site: &SiteConfig) -> String {
    if !article.slug.is_empty() {
        return format!("{}/news/{}", site.base_url, article.slug);
    }
    match article.link.as_deref() {
        Some(link) if article.has_http_link() => link.to_string(),
        _ => site.base_url.clone(),
    }
}

fn resolve_paragraphs(article: &Article) -> Vec<String> {
    if !article.paragraphs.is_empty() {
        return article.paragraphs.clone();
    }
    split_into_paragraphs(fallback_text(article))
}

fn fallback_text(article: &Article) -> &str {
    if article.content.is_empty() {
        &article.original_content
    } else {
        &article.content
    }
}

fn render_paragraphs(paragraphs: &[String], fallback: &str) -> String {
    if !paragraphs.is_empty() {
        return paragraphs
            .iter()
            .map(|paragraph| format!("<p>{}</p>", escape(paragraph.as_str())))
            .collect::<Vec<_>>()
            .join("\n");
    }
    let fallback = condense_whitespace(fallback);
    if fallback.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape(fallback.as_str()))
    }
}

/// First two paragraphs, or the first 400 characters of the fallback text.
fn describe(paragraphs: &[String], fallback: &str) -> String {
    if !paragraphs.is_empty() {
        let lead: Vec<&str> = paragraphs.iter().take(2).map(String::as_str).collect();
        return condense_whitespace(&lead.join(" "));
    }
    condense_whitespace(fallback).chars().take(400).collect()
}

fn render_item(article: &Article, site: &SiteConfig) -> String {
    let paragraphs = resolve_paragraphs(article);
    let fallback = fallback_text(article);
    let url = article_url(article, site);
    let title = [article.title.as_str(), article.original_title.as_str()]
        .into_iter()
        .find(|title| !title.is_empty())
        .unwrap_or(FALLBACK_TITLE);
    let published = article.published_at.unwrap_or(article.rewritten_at);

    let mut lines = vec![
        "    <item>".to_string(),
        format!("      <title>{}</title>", escape(title)),
        format!("      <link>{}</link>", escape(url.as_str())),
        format!("      <guid isPermaLink=\"true\">{}</guid>", escape(url.as_str())),
        format!("      <pubDate>{}</pubDate>", format_rfc822(published)),
    ];

    if !article.author.is_empty() {
        lines.push(format!("      <author>{}</author>", escape(article.author.as_str())));
    }
    for category in &article.categories {
        lines.push(format!("      <category>{}</category>", escape(category.name)));
    }
    if let Some(link) = article.link.as_deref().filter(|_| article.has_http_link()) {
        let label = article.source_host().unwrap_or_else(|| link.to_string());
        lines.push(format!(
            "      <source url=\"{}\">{}</source>",
            escape(link),
            escape(label.as_str())
        ));
    }

    lines.push(format!(
        "      <description>{}</description>",
        wrap_cdata(&describe(&paragraphs, fallback))
    ));
    lines.push(format!(
        "      <content:encoded>{}</content:encoded>",
        wrap_cdata(&render_paragraphs(&paragraphs, fallback))
    ));
    lines.push("    </item>".to_string());
    lines.join("\n")
}

/// Render the first `site.feed_limit` articles as an RSS 2.0 document.
///
/// # Arguments
///
/// * `articles` - Articles in publication order, newest first
/// * `site` - Channel metadata and public base URL
/// * `now` - Used for `lastBuildDate`
pub fn build_rss_feed_xml(articles: &[Article], site: &SiteConfig, now: DateTime<Utc>) -> String {
    let items: Vec<String> = articles
        .iter()
        .take(site.feed_limit)
        .map(|article| render_item(article, site))
        .collect();

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\">\n  <channel>\n",
    );
    xml.push_str(&format!("    <title>{}</title>\n", escape(site.name.as_str())));
    xml.push_str(&format!("    <link>{}</link>\n", escape(site.base_url.as_str())));
    xml.push_str(&format!(
        "    <description>{}</description>\n",
        escape(site.description.as_str())
    ));
    xml.push_str(&format!("    <language>{}</language>\n", escape(site.language.as_str())));
    xml.push_str(&format!("    <lastBuildDate>{}</lastBuildDate>\n", format_rfc822(now)));
    if !items.is_empty() {
        xml.push_str(&items.join("\n"));
        xml.push('\n');
    }
    xml.push_str("  </channel>\n</rss>");
    xml
}
