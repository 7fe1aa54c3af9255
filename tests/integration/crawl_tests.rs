//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up both the crawled site and the
//! classifier endpoint, and run the full crawl cycle end-to-end.

use async_trait::async_trait;
use bid_scout::classifier::{parse_verdict, ClassificationVerdict, Classifier, Confidence, LlmClassifier};
use bid_scout::config::{load_config, ClassifierConfig, CrawlerConfig, FetchConfig};
use bid_scout::crawler::{crawl, Crawler, StaticFetcher};
use bid_scout::output::{write_artifacts, CrawlRunResult, DASHBOARD_FILE, RESULTS_FILE};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILLER: &str = "The board of education publishes notices, agendas and purchasing news here.";

/// Builds an HTML page with enough text to clear the extraction floor
fn html_page(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{}">Read more</a></li>"#, href))
        .collect();
    format!(
        r#"<html><head><title>{}</title></head><body>
        <nav><a href="/">Home</a></nav>
        <main><h1>{}</h1><p>{} {}</p><ul>{}</ul></main>
        <footer>Copyright</footer>
        </body></html>"#,
        title, title, body, FILLER, anchors
    )
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, route: &str, html: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

/// A messages-API reply wrapping `text`
fn model_reply(text: &str) -> Value {
    json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "test-model",
        "content": [{ "type": "text", "text": text }],
        "stop_reason": "end_turn",
    })
}

async fn mount_verdict(server: &MockServer, verdict: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(verdict)))
        .mount(server)
        .await;
}

fn classifier_config(server: &MockServer) -> ClassifierConfig {
    ClassifierConfig {
        endpoint: format!("{}/v1/messages", server.uri()),
        ..ClassifierConfig::default()
    }
}

fn llm_classifier(server: &MockServer) -> Arc<dyn Classifier> {
    Arc::new(LlmClassifier::new(&classifier_config(server), "test-key").unwrap())
}

fn crawler_config() -> CrawlerConfig {
    CrawlerConfig {
        max_depth: 2,
        max_pages: 10,
        request_delay_ms: 0,
        concurrency: 2,
        priority_paths: Vec::new(),
        run_timeout_secs: 30,
        ..CrawlerConfig::default()
    }
}

fn create_crawler(config: CrawlerConfig, classifier: Arc<dyn Classifier>) -> Crawler {
    let fetch = FetchConfig {
        timeout_secs: 5,
        ..FetchConfig::default()
    };
    Crawler::new(config, Arc::new(StaticFetcher::new(&fetch).unwrap()), classifier)
}

/// (path, depth) of every record, in order
fn visited(result: &CrawlRunResult) -> Vec<(String, u32)> {
    result
        .records
        .iter()
        .map(|r| (url::Url::parse(&r.url).unwrap().path().to_string(), r.depth))
        .collect()
}

/// Records every URL it is asked about and never matches
#[derive(Default)]
struct CountingClassifier {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Classifier for CountingClassifier {
    async fn classify(&self, _text: &str, source_url: &str) -> ClassificationVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(source_url.to_string());
        parse_verdict(r#"{"is_rfp": false, "summary": "counted"}"#).unwrap()
    }
}

#[tokio::test]
async fn test_breadth_first_crawl_with_cycle() {
    let site = MockServer::start().await;
    let model = MockServer::start().await;

    // A -> B, C; B -> A, D. Every page must be fetched exactly once.
    mount_page(&site, "/", html_page("A", "District home", &["/b", "/c"]), 1).await;
    mount_page(&site, "/b", html_page("B", "Board meetings", &["/", "/d"]), 1).await;
    mount_page(&site, "/c", html_page("C", "Calendar of events", &[]), 1).await;
    mount_page(&site, "/d", html_page("D", "Directory of schools", &[]), 1).await;
    mount_verdict(&model, r#"{"is_rfp": false, "summary": "General page", "confidence": "High"}"#).await;

    let crawler = create_crawler(crawler_config(), llm_classifier(&model));
    let result = crawler.run(&site.uri(), 2, 10).await.unwrap();

    assert_eq!(
        visited(&result),
        vec![
            ("/".to_string(), 0),
            ("/b".to_string(), 1),
            ("/c".to_string(), 1),
            ("/d".to_string(), 2),
        ]
    );
    assert_eq!(result.pages_crawled, 4);
    assert_eq!(result.districts_attempted, 1);
    assert_eq!(result.records[1].title, "B");
    assert!(result.records.iter().all(|r| !r.classification.is_failure()));
}

#[tokio::test]
async fn test_malformed_classifier_reply_degrades_one_page() {
    let site = MockServer::start().await;
    let model = MockServer::start().await;

    mount_page(&site, "/", html_page("A", "District home", &["/b", "/c"]), 1).await;
    mount_page(&site, "/b", html_page("B", "Bus transportation services", &["/", "/d"]), 1).await;
    mount_page(&site, "/c", html_page("C", "Cafeteria menus", &[]), 1).await;
    mount_page(&site, "/d", html_page("D", "Data network upgrade", &[]), 1).await;

    // The prompt names the page URL followed by a colon
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("/c:"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(model_reply("I am not able to classify this page.")),
        )
        .mount(&model)
        .await;
    mount_verdict(
        &model,
        r#"{"is_rfp": true, "category": "Technology", "summary": "Open RFP", "confidence": "High"}"#,
    )
    .await;

    let crawler = create_crawler(crawler_config(), llm_classifier(&model));
    let result = crawler.run(&site.uri(), 2, 10).await.unwrap();

    assert_eq!(result.pages_crawled, 4);

    let c = result
        .records
        .iter()
        .find(|r| r.url.ends_with("/c"))
        .unwrap();
    assert!(!c.classification.is_match);
    assert_eq!(c.classification.confidence, Confidence::Low);
    assert!(c.classification.is_failure());
    assert!(c.classification.summary.starts_with("classification failed"));

    for record in result.records.iter().filter(|r| !r.url.ends_with("/c")) {
        assert!(record.classification.is_match, "{} should match", record.url);
        assert_eq!(record.classification.confidence, Confidence::High);
    }
    assert_eq!(result.category_counts.get("Technology"), Some(&3));

    let dir = tempdir().unwrap();
    let paths = write_artifacts(&result, dir.path()).unwrap();
    let results: Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.results).unwrap()).unwrap();
    assert_eq!(results["metadata"]["total_rfps_found"], 3);
    assert_eq!(results["raw_results"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_page_budget_and_depth_limits() {
    let site = MockServer::start().await;

    let links: Vec<String> = (0..10).map(|i| format!("/notice-{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&site, "/", html_page("Home", "Notices", &link_refs), 1).await;

    for link in &links {
        Mock::given(method("GET"))
            .and(path(link.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(html_page("Notice", "A public notice", &["/deeper"]), "text/html"),
            )
            .mount(&site)
            .await;
    }
    // Beyond max depth 1, so never fetched
    mount_page(&site, "/deeper", html_page("Deeper", "Too deep", &[]), 0).await;

    let classifier = Arc::new(CountingClassifier::default());
    let crawler = create_crawler(crawler_config(), classifier.clone());
    let result = crawler.run(&site.uri(), 1, 4).await.unwrap();

    assert_eq!(result.pages_crawled, 4);
    assert!(result.records.iter().all(|r| r.depth <= 1));
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_links_to_other_sites_are_not_followed() {
    let site = MockServer::start().await;
    let foreign = MockServer::start().await;

    // Same loopback address, different host name: a different site
    let foreign_url = format!("http://localhost:{}/rfp", foreign.address().port());
    mount_page(
        &site,
        "/",
        html_page("Home", "Links page", &[foreign_url.as_str(), "/local"]),
        1,
    )
    .await;
    mount_page(&site, "/local", html_page("Local", "Local page", &[]), 1).await;
    mount_page(&foreign, "/rfp", html_page("Foreign", "Not ours", &[]), 0).await;

    let crawler = create_crawler(crawler_config(), Arc::new(CountingClassifier::default()));
    let result = crawler.run(&site.uri(), 2, 10).await.unwrap();

    assert_eq!(
        visited(&result),
        vec![("/".to_string(), 0), ("/local".to_string(), 1)]
    );
}

#[tokio::test]
async fn test_short_pages_never_reach_classifier() {
    let site = MockServer::start().await;

    mount_page(&site, "/", html_page("Home", "Welcome", &["/stub", "/full"]), 1).await;
    mount_page(
        &site,
        "/stub",
        "<html><body><nav>Menu</nav><p>Coming soon</p><a href=\"/hidden\">x</a></body></html>"
            .to_string(),
        1,
    )
    .await;
    mount_page(&site, "/full", html_page("Full", "Bid tabulations", &[]), 1).await;
    mount_page(&site, "/hidden", html_page("Hidden", "Never reached", &[]), 0).await;

    let classifier = Arc::new(CountingClassifier::default());
    let crawler = create_crawler(crawler_config(), classifier.clone());
    let result = crawler.run(&site.uri(), 2, 10).await.unwrap();

    assert_eq!(result.pages_crawled, 2);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    assert!(!classifier
        .seen
        .lock()
        .unwrap()
        .iter()
        .any(|u| u.ends_with("/stub")));
}

#[tokio::test]
async fn test_failed_and_binary_pages_are_skipped() {
    let site = MockServer::start().await;

    mount_page(
        &site,
        "/",
        html_page("Home", "Documents", &["/packet.pdf", "/gone", "/feed", "/ok"]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/packet.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x25u8, 0x50, 0x44, 0x46], "application/pdf"))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("Request for proposals: HVAC maintenance. {}", FILLER),
            "text/plain",
        ))
        .expect(1)
        .mount(&site)
        .await;
    mount_page(&site, "/ok", html_page("Ok", "Still crawled", &[]), 1).await;

    let crawler = create_crawler(crawler_config(), Arc::new(CountingClassifier::default()));
    let result = crawler.run(&site.uri(), 1, 10).await.unwrap();

    assert_eq!(
        visited(&result),
        vec![
            ("/".to_string(), 0),
            ("/feed".to_string(), 1),
            ("/ok".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn test_unreachable_seed_still_writes_empty_artifacts() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&site)
        .await;

    let crawler = create_crawler(crawler_config(), Arc::new(CountingClassifier::default()));
    let result = crawler.crawl_all(&[site.uri()]).await.unwrap();
    assert_eq!(result.pages_crawled, 0);
    assert_eq!(result.districts_attempted, 1);

    let dir = tempdir().unwrap();
    write_artifacts(&result, dir.path()).unwrap();

    let results: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(RESULTS_FILE)).unwrap())
            .unwrap();
    assert_eq!(results["metadata"]["total_pages_crawled"], 0);
    assert_eq!(results["metadata"]["total_districts_crawled"], 1);

    let dashboard: Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join(DASHBOARD_FILE)).unwrap())
            .unwrap();
    assert_eq!(dashboard["total_rfps"], 0);
    assert_eq!(dashboard["active_rfps"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_config_file_driven_run() {
    let site = MockServer::start().await;
    let model = MockServer::start().await;

    mount_page(&site, "/", html_page("Home", "District home", &["/about"]), 1).await;
    mount_page(
        &site,
        "/purchasing",
        html_page("Purchasing", "Request for proposals: student transportation", &[]),
        1,
    )
    .await;
    mount_page(&site, "/about", html_page("About", "About the district", &[]), 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_string_contains("/purchasing:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(
            r#"{"is_rfp": true, "category": "Transportation", "summary": "Bus RFP", "submission_deadline": "June 1"}"#,
        )))
        .mount(&model)
        .await;
    mount_verdict(&model, r#"{"is_rfp": false}"#).await;

    std::env::set_var("BID_SCOUT_INTEGRATION_KEY", "test-key");

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("shared");
    let config_path = dir.path().join("scout.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
seeds = ["{site}"]

[crawler]
max-depth = 1
max-pages = 10
request-delay-ms = 100
concurrency = 2
priority-paths = ["/purchasing"]

[fetch]
timeout-secs = 5

[classifier]
endpoint = "{model}/v1/messages"
api-key-env = "BID_SCOUT_INTEGRATION_KEY"

[output]
directory = "{out}"
"#,
            site = site.uri(),
            model = model.uri(),
            out = out_dir.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let result = crawl(&config).await.unwrap();

    assert_eq!(
        visited(&result),
        vec![
            ("/".to_string(), 0),
            ("/purchasing".to_string(), 1),
            ("/about".to_string(), 1),
        ]
    );
    assert_eq!(result.rfps_found(), 1);

    let paths = write_artifacts(&result, std::path::Path::new(&config.output.directory)).unwrap();
    let dashboard: Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.dashboard).unwrap()).unwrap();
    assert_eq!(dashboard["total_rfps"], 1);
    assert_eq!(dashboard["active_rfps"][0]["category"], "Transportation");
    assert_eq!(dashboard["active_rfps"][0]["deadline"], "June 1");
    assert_eq!(dashboard["active_rfps"][0]["title"], "Purchasing");
}

#[tokio::test]
async fn test_trailing_slash_links_fetched_as_written() {
    let site = MockServer::start().await;

    mount_page(&site, "/", html_page("Home", "District home", &["/bids/"]), 1).await;
    // Only the slash form exists; relative links resolve beneath it
    mount_page(&site, "/bids/", html_page("Bids", "Open solicitations", &["rfp-1"]), 1).await;
    mount_page(&site, "/bids/rfp-1", html_page("RFP 1", "Roof replacement", &[]), 1).await;

    let crawler = create_crawler(crawler_config(), Arc::new(CountingClassifier::default()));
    let result = crawler.run(&site.uri(), 2, 10).await.unwrap();

    assert_eq!(
        visited(&result),
        vec![
            ("/".to_string(), 0),
            ("/bids/".to_string(), 1),
            ("/bids/rfp-1".to_string(), 2),
        ]
    );

    let requested: Vec<String> = site
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert!(!requested.contains(&"/bids".to_string()));
}

#[tokio::test]
async fn test_run_timeout_returns_partial_results() {
    let site = MockServer::start().await;

    mount_page(&site, "/", html_page("Home", "District home", &["/slow"]), 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html_page("Slow", "Never arrives", &[]), "text/html")
                .set_delay(std::time::Duration::from_secs(20)),
        )
        .mount(&site)
        .await;

    let config = CrawlerConfig {
        concurrency: 1,
        run_timeout_secs: 1,
        ..crawler_config()
    };
    let crawler = create_crawler(config, Arc::new(CountingClassifier::default()));

    let started = std::time::Instant::now();
    let result = crawler.run(&site.uri(), 1, 10).await.unwrap();

    assert!(started.elapsed() < std::time::Duration::from_secs(4));
    assert_eq!(visited(&result), vec![("/".to_string(), 0)]);
    assert_eq!(result.pages_crawled, 1);
}
