//! End-to-end tests against a real listener.
//!
//! Each test builds a scratch web root, starts the content router (or the
//! upgrade router) on an ephemeral port and talks to it over HTTP.
//!
//! Run with: cargo test --test http_tests
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{
    CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH, LOCATION, PRAGMA,
    X_FRAME_OPTIONS,
};
use reqwest::{Client, StatusCode};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use staticd::config::AppConfig;
use staticd::files::Validator;
use staticd::http::{security_headers, upgrade_router, ShutdownSignal};
use staticd::middleware::RequestLimiter;
use staticd::routes::create_router;
use staticd::state::AppState;

const UPGRADE_INSECURE_REQUESTS: &str = "upgrade-insecure-requests";

/// A running content server over a temporary web root.
struct TestServer {
    dir: TempDir,
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    limiter: RequestLimiter,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(stop_word: &str, setup: impl FnOnce(&Path)) -> Self {
        Self::start_with(stop_word, AppConfig::default().max_requests, setup).await
    }

    async fn start_with(stop_word: &str, max_requests: usize, setup: impl FnOnce(&Path)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        setup(dir.path());

        let config = AppConfig {
            web_dir: dir.path().to_path_buf(),
            stop_word: stop_word.to_string(),
            max_requests,
            ..AppConfig::default()
        };

        let shutdown = ShutdownSignal::new();
        let state = AppState::new(config, shutdown.clone()).unwrap();
        let limiter = state.limiter.clone();
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.wait().await })
                .await
                .unwrap();
        });

        Self {
            dir,
            addr,
            shutdown,
            limiter,
            task,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn etag_of(&self, name: &str) -> String {
        let meta = std::fs::metadata(self.dir.path().join(name)).unwrap();
        Validator::new(meta.modified().unwrap(), meta.len()).to_string()
    }
}

fn client() -> Client {
    Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

fn site(root: &Path) {
    std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
    std::fs::write(root.join("style.css"), "body{a:b}\n").unwrap();
    std::fs::create_dir(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/index.html"), "<h1>docs</h1>").unwrap();
    std::fs::write(root.join("notes.unknownext"), "plain").unwrap();
    std::fs::write(
        root.join("redirects.json"),
        r#"{"/old.html": "https://example.com/new.html"}"#,
    )
    .unwrap();
}

fn assert_hardened(response: &reqwest::Response) {
    for (name, value) in security_headers("/csp-report") {
        let values: Vec<_> = response.headers().get_all(name.as_str()).iter().collect();
        assert_eq!(values, vec![&value], "header {name}");
    }
}

#[tokio::test]
async fn test_serves_file_with_validator_and_metadata() {
    let server = TestServer::start("", site).await;

    let response = client().get(server.url("/style.css")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/css");
    assert_eq!(response.headers()[CONTENT_LENGTH], "10");
    assert_eq!(response.headers()[CACHE_CONTROL], "public, max-age=86400");
    assert_eq!(response.headers()[ETAG], server.etag_of("style.css").as_str());
    assert!(server.etag_of("style.css").ends_with("L10"));
    assert_hardened(&response);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"body{a:b}\n");
}

#[tokio::test]
async fn test_root_and_directories_serve_index() {
    let server = TestServer::start("", site).await;

    let response = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    assert!(response.headers().get(CACHE_CONTROL).is_none());
    assert_eq!(response.text().await.unwrap(), "<h1>home</h1>");

    let response = client().get(server.url("/docs/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "<h1>docs</h1>");
}

#[tokio::test]
async fn test_unknown_extension_defaults_to_html() {
    let server = TestServer::start("", site).await;

    let response = client().get(server.url("/notes.unknownext")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
}

#[tokio::test]
async fn test_matching_etag_returns_not_modified() {
    let server = TestServer::start("", site).await;
    let client = client();

    let first = client.get(server.url("/style.css")).send().await.unwrap();
    let etag = first.headers()[ETAG].clone();

    let second = client
        .get(server.url("/style.css"))
        .header(IF_NONE_MATCH, etag.clone())
        .send()
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(second.headers()[ETAG], etag);
    assert!(second.headers().get(CONTENT_TYPE).is_none());
    assert!(second.headers().get(X_FRAME_OPTIONS).is_none());
    assert!(second.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_etag_comparison_ignores_case() {
    let server = TestServer::start("", site).await;
    let etag = server.etag_of("style.css").to_lowercase();

    let response = client()
        .get(server.url("/style.css"))
        .header(IF_NONE_MATCH, etag)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
}

#[tokio::test]
async fn test_cache_disabling_headers_force_full_response() {
    let server = TestServer::start("", site).await;
    let etag = server.etag_of("style.css");

    for (name, value) in [
        (CACHE_CONTROL, "no-cache"),
        (CACHE_CONTROL, "max-age=0"),
        (PRAGMA, "no-cache"),
    ] {
        let response = client()
            .get(server.url("/style.css"))
            .header(IF_NONE_MATCH, etag.as_str())
            .header(name, value)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{value}");
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"body{a:b}\n");
    }
}

#[tokio::test]
async fn test_modified_file_gets_new_validator() {
    let server = TestServer::start("", site).await;
    let old = server.etag_of("style.css");

    std::fs::write(server.dir.path().join("style.css"), "body{a:bc}\n").unwrap();

    let response = client()
        .get(server.url("/style.css"))
        .header(IF_NONE_MATCH, old.as_str())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(response.headers()[ETAG], old.as_str());
}

#[tokio::test]
async fn test_large_file_is_streamed_intact() {
    let body: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let expected = body.clone();
    let server = TestServer::start("", move |root| {
        std::fs::write(root.join("blob.bin"), &body).unwrap();
    })
    .await;

    let response = client().get(server.url("/blob.bin")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_LENGTH], "100000");
    assert_eq!(response.bytes().await.unwrap().as_ref(), expected.as_slice());
}

#[tokio::test]
async fn test_head_sends_headers_without_body() {
    let server = TestServer::start("", site).await;

    let response = client().head(server.url("/style.css")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_LENGTH], "10");
    assert_eq!(response.headers()[CONTENT_TYPE], "text/css");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_post_sends_headers_without_body() {
    let server = TestServer::start("", site).await;

    let response = client().post(server.url("/style.css")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(ETAG));
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_redirect_table_match() {
    let server = TestServer::start("", site).await;

    let response = client()
        .get(server.url("/old.html?from=feed"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()[LOCATION], "https://example.com/new.html");
    assert_hardened(&response);
}

#[tokio::test]
async fn test_redirect_table_is_forbidden() {
    let server = TestServer::start("", site).await;

    for path in ["/redirects.json", "/redirects.json?download=1", "/Redirects.JSON"] {
        let response = client().get(server.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
        assert!(response.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_redirect_table_forbidden_when_absent() {
    let server = TestServer::start("", |root| {
        std::fs::write(root.join("index.html"), "home").unwrap();
    })
    .await;

    let response = client().get(server.url("/redirects.json")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_resource() {
    let server = TestServer::start("", site).await;

    let response = client().get(server.url("/missing.html")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[UPGRADE_INSECURE_REQUESTS], "1");
    assert!(response.headers().get(X_FRAME_OPTIONS).is_none());
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_with_wrong_key_keeps_serving() {
    let server = TestServer::start("s3cret", site).await;

    let response = client().get(server.url("/stop?key=guess")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!server.shutdown.is_triggered());

    let response = client().get(server.url("/style.css")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_stop_disabled_without_stop_word() {
    let server = TestServer::start("", site).await;

    let response = client().get(server.url("/stop?key=")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!server.shutdown.is_triggered());
}

#[tokio::test]
async fn test_stop_with_matching_key_drains_server() {
    let server = TestServer::start("s3cret", site).await;

    let response = client()
        .post(server.url("/stop?key=s3cret"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(server.shutdown.is_triggered());

    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("server should stop after the stop command")
        .unwrap();
}

#[tokio::test]
async fn test_upgrade_router_redirects_to_https() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upgrade_router("example.com", "/csp-report"))
            .await
            .unwrap();
    });

    for method in [reqwest::Method::GET, reqwest::Method::POST] {
        let response = client()
            .request(method, format!("http://{addr}/docs/page.html?lang=en"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers()[LOCATION],
            "https://example.com/docs/page.html?lang=en"
        );
        assert_eq!(response.headers()[UPGRADE_INSECURE_REQUESTS], "1");
        assert_hardened(&response);
    }
}

#[tokio::test]
async fn test_requests_over_limit_get_503_without_hardening() {
    let server = TestServer::start_with("", 1, |root| {
        std::fs::write(root.join("index.html"), "<h1>home</h1>").unwrap();
    })
    .await;

    let slot = server.limiter.try_admit().unwrap();
    let response = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    for (name, _) in security_headers("/csp-report") {
        assert!(response.headers().get(&name).is_none(), "{name}");
    }

    drop(slot);
    let response = client().get(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_FRAME_OPTIONS));
}
