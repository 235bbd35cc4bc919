//! The reqwest collaborator against wiremock servers

use crawl_ledger::config::Config;
use crawl_ledger::crawler::{CollaboratorError, CrawlCollaborator};
use crawl_ledger::storage::SqliteStorage;
use crawl_ledger::{resolve, Coordinator, HttpCollaborator, Indexability, RetryPolicy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn collaborator() -> HttpCollaborator {
    let mut config = Config::default();
    config.crawl.request_timeout_secs = 5;
    HttpCollaborator::new(&config).unwrap()
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_get(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_status() {
    let server = MockServer::start().await;
    mount_get(&server, "/ok", html("<p>hi</p>")).await;
    mount_get(&server, "/gone", ResponseTemplate::new(410)).await;

    let collaborator = collaborator();
    let ok = collaborator
        .fetch_status(&format!("{}/ok", server.uri()))
        .await
        .unwrap();
    let gone = collaborator
        .fetch_status(&format!("{}/gone", server.uri()))
        .await
        .unwrap();
    let missing = collaborator
        .fetch_status(&format!("{}/missing", server.uri()))
        .await
        .unwrap();

    assert_eq!(ok, Some(200));
    assert_eq!(gone, Some(410));
    assert_eq!(missing, Some(404));
}

#[tokio::test]
async fn test_fetch_status_connection_refused_is_transient() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = format!("http://127.0.0.1:{}/ok", port);

    let result = collaborator().fetch_status(&url).await;
    assert!(matches!(result, Err(CollaboratorError::Unavailable(_))));
}

#[tokio::test]
async fn test_extract_internal_links() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_get(
        &server,
        "/docs/",
        html(&format!(
            r#"<html><body>
            <a href="/a">A</a>
            <a href="b">B</a>
            <a href="{base}/c#section">C</a>
            <a href="https://other.org/d">D</a>
            <a href="mailto:me@example.com">mail</a>
            </body></html>"#
        )),
    )
    .await;

    let links = collaborator()
        .extract_internal_links(&format!("{}/docs/", base))
        .await
        .unwrap();
    assert_eq!(
        links,
        vec![
            format!("{}/a", base),
            format!("{}/docs/b", base),
            format!("{}/c#section", base),
        ]
    );
}

#[tokio::test]
async fn test_probe_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/page.cgi"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let content_type = collaborator()
        .probe_content_type(&format!("{}/page.cgi", server.uri()))
        .await
        .unwrap();
    assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
}

#[tokio::test]
async fn test_fetch_robots_rules() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_string("User-agent: *\nDisallow: /private/\nAllow: /private/open\n"),
    )
    .await;

    let rules = collaborator()
        .fetch_robots_rules(&server.uri())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(resolve("/private/x", Some(&rules)), Some(Indexability::DENY));
    assert_eq!(resolve("/public/x", Some(&rules)), Some(Indexability::ALLOW));
}

#[tokio::test]
async fn test_missing_robots_is_none() {
    let server = MockServer::start().await;
    let rules = collaborator().fetch_robots_rules(&server.uri()).await.unwrap();
    assert!(rules.is_none());
}

#[tokio::test]
async fn test_robots_server_error_is_transient() {
    let server = MockServer::start().await;
    mount_get(&server, "/robots.txt", ResponseTemplate::new(503)).await;

    let result = collaborator().fetch_robots_rules(&server.uri()).await;
    assert!(matches!(result, Err(CollaboratorError::Unavailable(_))));
}

#[tokio::test]
async fn test_sitemap_urls_from_robots_and_index() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_get(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nDisallow:\nSitemap: {}/sitemap_index.xml\n",
            base
        )),
    )
    .await;
    mount_get(
        &server,
        "/sitemap_index.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/pages.xml</loc></sitemap>
</sitemapindex>"#
        )),
    )
    .await;
    mount_get(
        &server,
        "/pages.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/a</loc></url>
  <url><loc>{base}/b</loc></url>
  <url><loc>https://other.org/c</loc></url>
</urlset>"#
        )),
    )
    .await;

    let pairs = collaborator().sitemap_urls(&base).await.unwrap();
    let pages_xml = format!("{}/pages.xml", base);
    assert_eq!(
        pairs,
        vec![
            (format!("{}/a", base), pages_xml.clone()),
            (format!("{}/b", base), pages_xml),
        ]
    );
}

#[tokio::test]
async fn test_sitemap_fallback_location() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_get(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/only</loc></url>
</urlset>"#
        )),
    )
    .await;

    let pairs = collaborator().sitemap_urls(&base).await.unwrap();
    assert_eq!(
        pairs,
        vec![(format!("{}/only", base), format!("{}/sitemap.xml", base))]
    );
}

#[tokio::test]
async fn test_no_sitemap_at_all() {
    let server = MockServer::start().await;
    let pairs = collaborator().sitemap_urls(&server.uri()).await.unwrap();
    assert!(pairs.is_empty());
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_get(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /page1\n"),
    )
    .await;
    mount_get(
        &server,
        "/",
        html(&format!(
            r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2/">Page 2</a>
            <a href="https://other.org/">Elsewhere</a>
            </body></html>"#
        )),
    )
    .await;
    mount_get(&server, "/page1", html(r#"<a href="/">Home</a>"#)).await;
    mount_get(&server, "/page2", ResponseTemplate::new(404)).await;

    let store = SqliteStorage::new_in_memory().unwrap();
    let mut coordinator = Coordinator::new(store, collaborator(), RetryPolicy::none());

    let report = coordinator.crawl(&base, 30).await.unwrap();
    assert_eq!(report.pages_crawled, 2);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.indexability_resolved, 3);

    let pages = coordinator.get_domain_pages(&base).unwrap();
    assert_eq!(pages.len(), 3);

    let root = coordinator.get_page(&base).unwrap().unwrap();
    assert_eq!(root.status_code, Some(200));
    assert!(root.referring_pages.contains(&format!("{}/page1", base)));
    assert_eq!(root.robots_index, Some(true));

    let page1 = coordinator
        .get_page(&format!("{}/page1", base))
        .unwrap()
        .unwrap();
    assert!(page1.fetch_succeeded);
    assert_eq!(page1.robots_index, Some(false));
    assert_eq!(page1.robots_follow, Some(false));

    let page2 = coordinator
        .get_page(&format!("{}/page2", base))
        .unwrap()
        .unwrap();
    assert!(!page2.fetch_succeeded);
    assert_eq!(page2.status_code, Some(404));
}
