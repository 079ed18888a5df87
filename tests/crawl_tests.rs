//! End-to-end crawl runs against a mocked catalog site.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bookwatch::error::{AppError, Result};
use bookwatch::models::{ChangeKind, Config};
use bookwatch::pipeline::run_crawl_with;
use bookwatch::services::{MailMessage, Mailer};
use bookwatch::storage::{CatalogStore, JsonStore};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    fn messages(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

fn test_config(root: &str, data_dir: &std::path::Path) -> Arc<Config> {
    let mut config = Config::default();
    config.site.root_url = root.to_string();
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config.crawler.retry_count = 3;
    config.crawler.backoff_base_ms = 0;
    Arc::new(config)
}

fn index_page(category_hrefs: &[&str]) -> String {
    let items: String = category_hrefs
        .iter()
        .map(|href| format!("<li><a href=\"{href}\">Category</a></li>"))
        .collect();
    format!(
        r#"<html><body><div class="side_categories">
        <ul><li><a href="all.html">Books</a><ul>{items}</ul></li></ul>
        </div></body></html>"#
    )
}

fn listing_page(book_hrefs: &[&str], next: Option<&str>) -> String {
    let items: String = book_hrefs
        .iter()
        .map(|href| format!("<article><h3><a href=\"{href}\">a book</a></h3></article>"))
        .collect();
    let pager = next
        .map(|href| {
            format!(r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#)
        })
        .unwrap_or_default();
    format!("<html><body>{items}{pager}</body></html>")
}

fn book_page(title: &str, price_incl: &str, stock: &str) -> String {
    format!(
        r#"<html><body>
        <ul class="breadcrumb">
            <li><a href="/">Home</a></li>
            <li><a href="/books">Books</a></li>
            <li><a href="/travel">Travel</a></li>
            <li class="active">{title}</li>
        </ul>
        <h1>{title}</h1>
        <p class="star-rating Four"></p>
        <div id="product_description"></div>
        <p>Description of {title}.</p>
        <table class="table table-striped">
            <tr><th>UPC</th><td>x</td></tr>
            <tr><th>Type</th><td>Books</td></tr>
            <tr><th>Price (excl. tax)</th><td>£10.00</td></tr>
            <tr><th>Price (incl. tax)</th><td>{price_incl}</td></tr>
            <tr><th>Tax</th><td>£0.00</td></tr>
            <tr><th>Availability</th><td>{stock}</td></tr>
            <tr><th>Number of reviews</th><td>0</td></tr>
        </table>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Mock site with two categories: travel holds b1 and b2 on one page,
/// mystery holds b3 and pages over to b4. b1's body is caller-supplied
/// so tests can change it between runs.
async fn mount_catalog(server: &MockServer, b1_body: String) {
    mount_page(
        server,
        "/index.html",
        index_page(&["/cat/travel.html", "/cat/mystery.html"]),
    )
    .await;
    mount_page(
        server,
        "/cat/travel.html",
        listing_page(&["/books/b1.html", "/books/b2.html"], None),
    )
    .await;
    mount_page(
        server,
        "/cat/mystery.html",
        listing_page(&["/books/b3.html"], Some("/cat/mystery-2.html")),
    )
    .await;
    mount_page(
        server,
        "/cat/mystery-2.html",
        listing_page(&["/books/b4.html"], None),
    )
    .await;
    mount_page(server, "/books/b1.html", b1_body).await;
    for (p, title) in [
        ("/books/b2.html", "Book Two"),
        ("/books/b3.html", "Book Three"),
        ("/books/b4.html", "Book Four"),
    ] {
        mount_page(server, p, book_page(title, "£10.00", "In stock (5 available)")).await;
    }
}

async fn mount_small_catalog(server: &MockServer) {
    mount_catalog(
        server,
        book_page("Book One", "£10.00", "In stock (5 available)"),
    )
    .await;
}

struct Harness {
    server: MockServer,
    _tmp: TempDir,
    config: Arc<Config>,
    store: Arc<JsonStore>,
}

impl Harness {
    async fn new() -> Self {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let config = test_config(&server.uri(), tmp.path());
        let store = Arc::new(JsonStore::open(tmp.path()).await.unwrap());
        Self {
            server,
            _tmp: tmp,
            config,
            store,
        }
    }

    async fn run(&self, resume: bool) -> (bookwatch::services::CrawlOutcome, Vec<MailMessage>) {
        let mailer = Arc::new(RecordingMailer::default());
        let outcome = run_crawl_with(
            Arc::clone(&self.config),
            self.store.clone(),
            mailer.clone(),
            resume,
        )
        .await
        .unwrap();
        (outcome, mailer.messages())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }
}

#[tokio::test]
async fn test_first_crawl_creates_every_book() {
    let harness = Harness::new().await;
    mount_small_catalog(&harness.server).await;

    let (outcome, messages) = harness.run(false).await;

    assert_eq!(outcome.categories, 2);
    assert_eq!(outcome.listing_pages, 3);
    assert_eq!(outcome.created, 4);
    assert_eq!(outcome.failed, 0);

    let record = harness
        .store
        .find_record(&harness.url("/books/b1.html"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.book.title, "Book One");
    assert_eq!(record.book.category, "Travel");
    assert_eq!(record.book.price_incl_tax, 10.0);

    let since = Utc::now() - Duration::hours(1);
    let changes = harness.store.changes_since(since).await.unwrap();
    assert_eq!(changes.len(), 4);
    assert!(changes.iter().all(|c| c.kind == ChangeKind::Created));

    // One grouped new-books message plus the run summary.
    assert_eq!(messages.len(), 2);
    assert!(messages[0].subject.contains("4 new book(s)"));
    assert_eq!(messages[0].body.matches("<li>").count(), 4);
    assert!(messages[1].subject.starts_with("Daily report"));
    assert!(messages[1].body.contains("<b>New books:</b> 4"));
}

#[tokio::test]
async fn test_recrawl_of_identical_site_records_nothing() {
    let harness = Harness::new().await;
    mount_small_catalog(&harness.server).await;

    harness.run(false).await;
    let (outcome, messages) = harness.run(false).await;

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.unchanged, 4);

    let since = Utc::now() - Duration::hours(1);
    assert_eq!(harness.store.changes_since(since).await.unwrap().len(), 4);

    // Nothing changed during the second run, so only the summary goes out.
    assert_eq!(messages.len(), 1);
    assert!(messages[0].subject.starts_with("Daily report"));
    assert!(messages[0].body.contains("<b>New books:</b> 0"));
}

#[tokio::test]
async fn test_price_change_is_detected_and_notified() {
    let harness = Harness::new().await;
    mount_small_catalog(&harness.server).await;
    harness.run(false).await;

    // Same site, except b1 got more expensive.
    harness.server.reset().await;
    mount_catalog(
        &harness.server,
        book_page("Book One", "£12.00", "In stock (5 available)"),
    )
    .await;

    let run_start = Utc::now();
    let (outcome, messages) = harness.run(false).await;

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.unchanged, 3);

    let changes = harness.store.changes_since(run_start).await.unwrap();
    assert_eq!(changes.len(), 1);
    let entry = &changes[0];
    assert_eq!(entry.kind, ChangeKind::Updated);
    assert_eq!(entry.url, harness.url("/books/b1.html"));
    assert_eq!(entry.changed_fields.len(), 1);
    let change = entry.changed_fields.get("price_incl_tax").unwrap();
    assert_eq!(change.old.as_f64(), Some(10.0));
    assert_eq!(change.new.as_f64(), Some(12.0));

    assert_eq!(messages.len(), 2);
    assert!(messages[0].subject.contains("1 book price change(s)"));
    assert!(messages[0].body.contains("Book One"));
    assert!(messages[0].body.contains("£10.00 → £12.00"));
}

#[tokio::test]
async fn test_pagination_is_sequential_and_stops_at_last_page() {
    let harness = Harness::new().await;
    mount_page(&harness.server, "/index.html", index_page(&["/cat/a-1.html"])).await;
    mount_page(
        &harness.server,
        "/cat/a-1.html",
        listing_page(&["/books/b1.html"], Some("/cat/a-2.html")),
    )
    .await;
    mount_page(
        &harness.server,
        "/cat/a-2.html",
        listing_page(&["/books/b2.html"], Some("/cat/a-3.html")),
    )
    .await;
    mount_page(
        &harness.server,
        "/cat/a-3.html",
        listing_page(&["/books/b3.html"], None),
    )
    .await;
    for p in ["/books/b1.html", "/books/b2.html", "/books/b3.html"] {
        mount_page(
            &harness.server,
            p,
            book_page("Paged Book", "£10.00", "In stock (5 available)"),
        )
        .await;
    }

    let (outcome, _messages) = harness.run(false).await;
    assert_eq!(outcome.listing_pages, 3);
    assert_eq!(outcome.created, 3);

    let paths: Vec<String> = harness
        .server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(
        paths,
        vec![
            "/index.html",
            "/cat/a-1.html",
            "/books/b1.html",
            "/cat/a-2.html",
            "/books/b2.html",
            "/cat/a-3.html",
            "/books/b3.html",
        ]
    );
}

#[tokio::test]
async fn test_persistent_item_failure_skips_only_that_book() {
    let harness = Harness::new().await;
    mount_page(&harness.server, "/index.html", index_page(&["/cat/a.html"])).await;
    mount_page(
        &harness.server,
        "/cat/a.html",
        listing_page(&["/books/good.html", "/books/broken.html"], None),
    )
    .await;
    mount_page(
        &harness.server,
        "/books/good.html",
        book_page("Good Book", "£10.00", "In stock (5 available)"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/books/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&harness.server)
        .await;

    let (outcome, _messages) = harness.run(false).await;

    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.failed, 1);
    assert!(
        harness
            .store
            .find_record(&harness.url("/books/broken.html"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_resume_skips_already_processed_books() {
    let harness = Harness::new().await;
    mount_small_catalog(&harness.server).await;
    harness.run(false).await;

    let before_resume = harness.server.received_requests().await.unwrap().len();
    let (outcome, _messages) = harness.run(true).await;

    assert_eq!(outcome.skipped, 4);
    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.unchanged, 0);

    // The resumed run touches listings but never refetches the books.
    let requests = harness.server.received_requests().await.unwrap();
    let book_requests = requests[before_resume..]
        .iter()
        .filter(|r| r.url.path().starts_with("/books/"))
        .count();
    assert_eq!(book_requests, 0);
}

#[tokio::test]
async fn test_fresh_run_clears_session_and_resume_degrades() {
    let harness = Harness::new().await;
    mount_small_catalog(&harness.server).await;

    harness.run(false).await;
    let session_id = harness.store.latest_session_id().await.unwrap().unwrap();
    assert_eq!(
        harness.store.session_urls(&session_id).await.unwrap().len(),
        4
    );

    // A fresh run wipes the log; unchanged items never write activity.
    let (outcome, _messages) = harness.run(false).await;
    assert_eq!(outcome.unchanged, 4);
    assert_eq!(harness.store.latest_session_id().await.unwrap(), None);

    // Resuming with an empty log behaves like a fresh run.
    let (outcome, _messages) = harness.run(true).await;
    assert_eq!(outcome.skipped, 0);
    assert_eq!(outcome.unchanged, 4);
}

#[tokio::test]
async fn test_duplicate_listing_link_creates_one_record() {
    let harness = Harness::new().await;
    mount_page(&harness.server, "/index.html", index_page(&["/cat/a.html"])).await;
    mount_page(
        &harness.server,
        "/cat/a.html",
        listing_page(&["/books/b1.html", "/books/b1.html"], None),
    )
    .await;
    mount_page(
        &harness.server,
        "/books/b1.html",
        book_page("Book One", "£10.00", "In stock (5 available)"),
    )
    .await;

    let (outcome, _messages) = harness.run(false).await;

    assert_eq!(outcome.created, 1);
    let since = Utc::now() - Duration::hours(1);
    assert_eq!(harness.store.count_new_since(since).await.unwrap(), 1);
    assert_eq!(harness.store.changes_since(since).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_index_aborts_without_report() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&harness.server)
        .await;

    let mailer = Arc::new(RecordingMailer::default());
    let result = run_crawl_with(
        Arc::clone(&harness.config),
        harness.store.clone(),
        mailer.clone(),
        false,
    )
    .await;

    assert!(matches!(result, Err(AppError::Crawl { .. })));
    assert!(mailer.messages().is_empty());
    let since = Utc::now() - Duration::hours(1);
    assert_eq!(harness.store.count_new_since(since).await.unwrap(), 0);
}
