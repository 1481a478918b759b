use awful_game_news::config::AppConfig;
use awful_game_news::ingest::{AUTHOR, LiveFeedService};
use awful_game_news::models::{PS5_GAMES, RETRO_GAMES};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn story_page() -> String {
    let paragraphs: String = (0..5)
        .map(|i| {
            format!(
                "<p>Section {i} walks through the remastered retro collection, its emulation work and the classic arcade cabinets it recreates.</p>"
            )
        })
        .collect();
    format!("<html><body><main><article>{paragraphs}</article></main></body></html>")
}

fn sample_feed(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Upstream</title>
    <link>{base}/</link>
    <description>Upstream gaming news</description>
    <item>
      <title>Patch notes arrive</title>
      <guid>guid-a</guid>
      <description>The studio shipped a patch that fixes crashes and improves loading times.</description>
      <pubDate>Mon, 13 Oct 2025 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Patch notes arrive!</title>
      <guid>guid-b</guid>
      <description>A second patch landed for the handheld edition with controller fixes.</description>
      <category>PS5</category>
      <pubDate>Tue, 14 Oct 2025 08:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Retro collection announced</title>
      <link>{base}/story/retro</link>
      <guid>guid-c</guid>
      <description>Short teaser.</description>
    </item>
  </channel>
</rss>"#
    )
}

async fn mount_upstream(server: &MockServer, expected_polls: u64) {
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(sample_feed(&server.uri())),
        )
        .expect(expected_polls)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/story/retro"))
        .respond_with(ResponseTemplate::new(200).set_body_string(story_page()))
        .expect(1)
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.feed.url = Some(format!("{}/feed.xml", server.uri()));
    config.validated()
}

#[tokio::test]
async fn refresh_builds_ordered_deduplicated_corpus() {
    let server = MockServer::start().await;
    mount_upstream(&server, 2).await;

    let service = LiveFeedService::from_config(&config_for(&server)).unwrap();
    let first = service.fetch_feed(true).await;

    let slugs: Vec<_> = first.articles.iter().map(|a| a.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec!["patch-notes-arrive-2", "patch-notes-arrive", "retro-collection-announced"]
    );

    let ps5 = &first.articles[0];
    assert_eq!(ps5.source_id, "guid-b");
    assert_eq!(ps5.id, "guid-b");
    assert_eq!(ps5.categories.first(), Some(&PS5_GAMES));
    assert_eq!(ps5.author, AUTHOR);
    assert_ne!(ps5.title, ps5.original_title);

    let retro = &first.articles[2];
    assert!(retro.published_at.is_none());
    assert!(retro.original_content.starts_with("Section 0 walks through"));
    assert!(retro.categories.contains(&RETRO_GAMES));
    assert!(!retro.excerpt.is_empty());

    for article in first.articles.iter() {
        assert!(!article.categories.is_empty() && article.categories.len() <= 4);
        for category in &article.categories {
            assert!(first.categories.contains(category));
        }
    }

    // Nothing new upstream: same corpus, new timestamp.
    let second = service.fetch_feed(true).await;
    assert_eq!(second.articles, first.articles);
    assert_eq!(second.categories, first.categories);
    assert!(second.last_fetched >= first.last_fetched);
}

#[tokio::test]
async fn fresh_snapshot_skips_polling() {
    let server = MockServer::start().await;
    mount_upstream(&server, 1).await;

    let service = LiveFeedService::from_config(&config_for(&server)).unwrap();
    let first = service.fetch_feed(false).await;
    let second = service.fetch_feed(false).await;

    assert_eq!(first.articles.len(), 3);
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn upstream_failure_keeps_previous_corpus() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let service = LiveFeedService::from_config(&config_for(&server)).unwrap();
    let snapshot = service.fetch_feed(true).await;

    assert!(snapshot.articles.is_empty());
    assert!(snapshot.categories.is_empty());
    assert!(snapshot.last_fetched.timestamp() > 0);
}
