//! Published artifacts.
//!
//! After each refresh the binary writes three files into the output
//! directory:
//!
//! ```text
//! output_dir/
//! ├── articles.json   # the full snapshot
//! ├── feed.xml        # RSS 2.0, newest `feed_limit` articles
//! └── sitemap.xml
//! ```
//!
//! The feed file name follows `site.feed_path`.

pub mod json;
pub mod rss;
pub mod sitemap;

use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::FeedSnapshot;
use crate::utils::ensure_writable_dir;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const SITEMAP_FILE: &str = "sitemap.xml";

/// Write the JSON snapshot, the RSS feed and the sitemap.
///
/// # Returns
///
/// The paths written, in that order.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_all(snapshot: &FeedSnapshot, site: &SiteConfig, output_dir: &str) -> Result<Vec<PathBuf>> {
    ensure_writable_dir(output_dir).await?;
    let dir = Path::new(output_dir);

    let json_path = json::write_snapshot(snapshot, output_dir).await?;

    let feed_name = site.feed_path.trim_start_matches('/');
    let feed_name = if feed_name.is_empty() { "feed.xml" } else { feed_name };
    let feed_path = dir.join(feed_name);
    if let Some(parent) = feed_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&feed_path, rss::build_rss_feed_xml(&snapshot.articles, site, Utc::now())).await?;

    let sitemap_path = dir.join(SITEMAP_FILE);
    let sitemap = sitemap::build_sitemap_xml(
        &snapshot.articles,
        &snapshot.categories,
        snapshot.last_fetched,
        site,
    );
    fs::write(&sitemap_path, sitemap).await?;

    info!(feed = %feed_path.display(), sitemap = %sitemap_path.display(), "Wrote site artifacts");
    Ok(vec![json_path, feed_path, sitemap_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::sample_article;
    use crate::models::PC_GAMES;

    #[tokio::test]
    async fn test_write_all() {
        let dir = std::env::temp_dir().join(format!("agn-outputs-{}", std::process::id()));
        let snapshot = FeedSnapshot {
            last_fetched: Utc::now(),
            articles: vec![sample_article()],
            categories: vec![PC_GAMES],
        };

        let paths = write_all(&snapshot, &SiteConfig::default(), dir.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(paths.len(), 3);
        assert!(paths[1].ends_with("feed.xml"));
        let feed = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(feed.contains("/news/big-news"));
        let sitemap = std::fs::read_to_string(&paths[2]).unwrap();
        assert!(sitemap.contains("/category/pc-games"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
