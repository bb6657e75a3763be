//! Integration tests for the crawl engine
//!
//! These tests use wiremock to stand up a mock comic site and drive it with
//! the real HTTP page driver, end to end.

use comicer::config::{Config, DriverConfig, LedgerPolicy, Secret, SourceConfig};
use comicer::crawler::{run_sources, CrawlEngine};
use comicer::driver::HttpDriver;
use comicer::storage::DownloadLedger;
use comicer::ComicerError;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION_COOKIE: &str = "session=abc";

/// Creates a test configuration for one source on the mock server
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    let source = SourceConfig {
        name: "mock".to_string(),
        start_url: Url::parse(&format!("{}/favorites", base_url)).unwrap(),
        login_url: Url::parse(&format!("{}/login", base_url)).unwrap(),
        username: Some("reader".to_string()),
        password: Some(Secret::new("hunter2")),
        username_selector: "#user".to_string(),
        password_selector: "#pass".to_string(),
        login_submit_selector: "#submit".to_string(),
        favorite_url_selector: "a.fav".to_string(),
        download_url_selector: "a.dl".to_string(),
        download_url_text: vec![],
        title_selector: "h1".to_string(),
        save_path: None,
    };

    Config {
        save_path: dir.join("comic"),
        state_path: dir.join("state"),
        driver: DriverConfig {
            navigation_delay_ms: 0, // No pacing in tests
            ledger_policy: LedgerPolicy::OnAttempt,
            ..DriverConfig::default()
        },
        sources: vec![source],
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

fn attachment(filename: &str, content: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(content.to_vec(), "application/octet-stream")
        .insert_header(
            "content-disposition",
            format!(r#"attachment; filename="{}""#, filename).as_str(),
        )
}

/// Mounts a site whose favorites page requires the session cookie
///
/// The login form is expected to be submitted `logins` times and each
/// download fetched `downloads` times.
async fn mount_site(server: &MockServer, logins: u64, downloads: u64) {
    // Cookie-matched routes are mounted first so they take precedence
    Mock::given(method("GET"))
        .and(path("/favorites"))
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(html(
            r#"<a class="fav" href="/item/1">Ch1</a>
               <a class="fav" href="/item/1">Ch1 again</a>
               <a class="fav">no href</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(
            r#"<form method="post" action="/login">
                 <input type="hidden" name="csrf" value="t0k3n">
                 <input id="user" name="username">
                 <input id="pass" name="password" type="password">
                 <button id="submit" type="submit">Sign in</button>
               </form>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("username=reader"))
        .and(body_string_contains("password=hunter2"))
        .and(body_string_contains("csrf=t0k3n"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/favorites")
                .insert_header("set-cookie", "session=abc; Path=/; HttpOnly"),
        )
        .expect(logins)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(html(
            r#"<h1>Ch1</h1>
               <a class="dl" href="/dl/1">VOL 1</a>
               <a class="dl" href="/dl/2">VOL 2</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dl/1"))
        .respond_with(attachment("vol1.zip", b"first volume"))
        .expect(downloads)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dl/2"))
        .respond_with(attachment("vol2.zip", b"second volume"))
        .expect(downloads)
        .mount(server)
        .await;
}

async fn run_once(config: &Config) -> Result<(), ComicerError> {
    let driver = HttpDriver::new(&config.driver)?;
    CrawlEngine::new(config, &config.sources[0], driver)?
        .run()
        .await
}

#[tokio::test]
async fn test_full_run_then_idempotent_rerun() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    // One login and one fetch per file across both runs
    mount_site(&mock_server, 1, 1).await;

    run_once(&config).await.expect("first run failed");

    let item_dir = dir.path().join("comic/127.0.0.1/Ch1");
    assert_eq!(
        std::fs::read(item_dir.join("vol1.zip")).unwrap(),
        b"first volume"
    );
    assert_eq!(
        std::fs::read(item_dir.join("vol2.zip")).unwrap(),
        b"second volume"
    );
    assert!(dir.path().join("state/127.0.0.1.json").exists());

    let ledger = DownloadLedger::new(dir.path().join("comic"));
    let expected: BTreeSet<String> = [
        format!("{}/dl/1", base_url),
        format!("{}/dl/2", base_url),
    ]
    .into_iter()
    .collect();
    assert_eq!(ledger.load("127.0.0.1", "Ch1").unwrap(), expected);

    // A fresh driver reuses the saved session and finds nothing new
    run_once(&config).await.expect("second run failed");
    assert_eq!(ledger.load("127.0.0.1", "Ch1").unwrap(), expected);

    // Wiremock verifies the expect() counts when the server drops
}

#[tokio::test]
async fn test_rejected_login_fails_source() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    // The site never accepts the credentials
    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html(
            r#"<form method="post" action="/login">
                 <input id="user" name="username">
                 <input id="pass" name="password" type="password">
                 <input id="submit" type="submit" value="Sign in">
               </form>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(html("<h1>Ch1</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = run_once(&config).await;
    assert!(matches!(result, Err(ComicerError::LoginFailed { .. })));
    assert!(!dir.path().join("state/127.0.0.1.json").exists());
    assert!(!dir.path().join("comic/127.0.0.1").exists());
}

#[tokio::test]
async fn test_run_sources_reports_each_outcome() {
    let good_server = MockServer::start().await;
    let bad_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_site(&good_server, 1, 1).await;

    // The broken site always bounces to its login page
    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/login"))
        .mount(&bad_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(html("<p>Sign in</p>"))
        .mount(&bad_server)
        .await;

    let good = create_test_config(&good_server.uri(), dir.path());
    let bad = create_test_config(&bad_server.uri(), dir.path());

    // No credentials, so the login cannot even be attempted
    let mut bad_source = bad.sources[0].clone();
    bad_source.name = "broken".to_string();
    bad_source.username = None;
    bad_source.password = None;

    let config = Config {
        sources: vec![good.sources[0].clone(), bad_source],
        ..good
    };

    let names = vec!["broken".to_string(), "mock".to_string()];
    let outcomes = run_sources(&config, &names).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].name, "broken");
    assert!(matches!(
        outcomes[0].result,
        Err(ComicerError::MissingCredentials { .. })
    ));
    assert_eq!(outcomes[1].name, "mock");
    assert!(outcomes[1].is_success());
}

/// Mounts an open site (no login) with one item linking to `/dl/1` and `/dl/2`
async fn mount_open_item(server: &MockServer, first: ResponseTemplate, second: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/favorites"))
        .respond_with(html(r#"<a class="fav" href="/item/1">Ch1</a>"#))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(html(
            r#"<h1>Ch1</h1>
               <a class="dl" href="/dl/1">VOL 1</a>
               <a class="dl" href="/dl/2">VOL 2</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dl/1"))
        .respond_with(first)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dl/2"))
        .respond_with(second)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_error_response_is_not_saved() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path());
    config.driver.ledger_policy = LedgerPolicy::OnSave;

    mount_open_item(
        &mock_server,
        ResponseTemplate::new(503).set_body_raw("Service Unavailable", "text/plain"),
        attachment("two.zip", b"second volume"),
    )
    .await;

    run_once(&config).await.expect("run failed");

    let item_dir = dir.path().join("comic/127.0.0.1/Ch1");
    let mut files: Vec<String> = std::fs::read_dir(&item_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["two.zip".to_string(), "url.json".to_string()]);

    // Only the saved file is recorded, so the next run retries /dl/1
    let ledger = DownloadLedger::new(dir.path().join("comic"));
    let expected: BTreeSet<String> = [format!("{}/dl/2", base_url)].into_iter().collect();
    assert_eq!(ledger.load("127.0.0.1", "Ch1").unwrap(), expected);
}

#[tokio::test]
async fn test_large_download_written_intact() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path());

    let big: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    mount_open_item(
        &mock_server,
        attachment("big.cbz", &big),
        attachment("url.json", b"not a ledger"),
    )
    .await;

    run_once(&config).await.expect("run failed");

    let item_dir = dir.path().join("comic/127.0.0.1/Ch1");
    assert_eq!(std::fs::read(item_dir.join("big.cbz")).unwrap(), big);
    assert!(!item_dir.join("big.cbz.part").exists());

    // A download named like the ledger does not replace it
    assert_eq!(
        std::fs::read(item_dir.join("_url.json")).unwrap(),
        b"not a ledger"
    );
    let ledger = DownloadLedger::new(dir.path().join("comic"));
    assert_eq!(ledger.load("127.0.0.1", "Ch1").unwrap().len(), 2);
}
