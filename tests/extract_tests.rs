use awful_game_news::extract::{ContentExtractor, ExtractConfig};
use awful_game_news::models::FeedItem;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn story_page() -> String {
    let paragraphs: String = (0..6)
        .map(|i| {
            format!(
                "<p>Paragraph {i} covers the studio roadmap, the hardware refresh and what players can expect next season.</p>"
            )
        })
        .collect();
    format!(
        "<html><head><script>var tracking = true;</script></head><body>\
         <nav>Home | News | Reviews</nav>\
         <article>{paragraphs}</article>\
         <footer>Copyright notice for the whole site goes here.</footer>\
         </body></html>"
    )
}

fn item_for(server: &MockServer, route: &str) -> FeedItem {
    FeedItem {
        title: Some("Roadmap revealed".to_string()),
        link: Some(format!("{}{}", server.uri(), route)),
        description: Some("<p>Short teaser.</p>".to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn extracts_article_body_from_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .and(header_exists("user-agent"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(story_page()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let extractor = ContentExtractor::new(ExtractConfig::default()).unwrap();
    let body = extractor
        .fetch_full_article_body(&item_for(&server, "/story"))
        .await;

    assert!(body.starts_with("Paragraph 0 covers the studio roadmap"));
    assert_eq!(body.split("\n\n").count(), 6);
    assert!(!body.contains("tracking"));
    assert!(!body.contains("Copyright"));
}

#[tokio::test]
async fn error_status_falls_back_to_feed_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let extractor = ContentExtractor::new(ExtractConfig::default()).unwrap();
    let body = extractor
        .fetch_full_article_body(&item_for(&server, "/missing"))
        .await;

    assert_eq!(body, "Short teaser.");
}

#[tokio::test]
async fn oversized_page_falls_back_to_feed_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(ResponseTemplate::new(200).set_body_string(story_page()))
        .mount(&server)
        .await;

    let config = ExtractConfig {
        max_bytes: 64,
        ..ExtractConfig::default()
    };
    let extractor = ContentExtractor::new(config).unwrap();
    let body = extractor
        .fetch_full_article_body(&item_for(&server, "/huge"))
        .await;

    assert_eq!(body, "Short teaser.");
}

#[tokio::test]
async fn thin_page_does_not_replace_longer_feed_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thin"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body><p>Tiny.</p></body></html>"),
        )
        .mount(&server)
        .await;

    let extractor = ContentExtractor::new(ExtractConfig::default()).unwrap();
    let body = extractor
        .fetch_full_article_body(&item_for(&server, "/thin"))
        .await;

    assert_eq!(body, "Short teaser.");
}
