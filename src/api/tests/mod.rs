use super::*;
use crate::store::memory::MemoryStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One author, one category, one tag, one post with a comment, one page
/// and one URL-less attachment, so a run touches every phase without
/// any network traffic.
const EXPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
    xmlns:content="http://purl.org/rss/1.0/modules/content/"
    xmlns:dc="http://purl.org/dc/elements/1.1/"
    xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>API Export</title>
    <wp:author>
      <wp:author_login><![CDATA[erin]]></wp:author_login>
      <wp:author_email><![CDATA[erin@example.com]]></wp:author_email>
      <wp:author_display_name><![CDATA[Erin]]></wp:author_display_name>
    </wp:author>
    <wp:category>
      <wp:cat_name><![CDATA[News]]></wp:cat_name>
      <wp:category_nicename><![CDATA[news]]></wp:category_nicename>
    </wp:category>
    <wp:tag>
      <wp:tag_slug><![CDATA[rust]]></wp:tag_slug>
      <wp:tag_name><![CDATA[Rust]]></wp:tag_name>
    </wp:tag>
    <item>
      <title>Alpha</title>
      <dc:creator><![CDATA[erin]]></dc:creator>
      <content:encoded><![CDATA[<p>Alpha body</p>]]></content:encoded>
      <category domain="category" nicename="news"><![CDATA[News]]></category>
      <wp:post_id>11</wp:post_id>
      <wp:post_type><![CDATA[post]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
      <wp:post_date_gmt><![CDATA[2022-05-01 09:30:00]]></wp:post_date_gmt>
      <wp:comment>
        <wp:comment_id>21</wp:comment_id>
        <wp:comment_author><![CDATA[Reader]]></wp:comment_author>
        <wp:comment_author_email><![CDATA[reader@example.com]]></wp:comment_author_email>
        <wp:comment_content><![CDATA[Nice one]]></wp:comment_content>
        <wp:comment_approved><![CDATA[1]]></wp:comment_approved>
        <wp:comment_parent>0</wp:comment_parent>
      </wp:comment>
    </item>
    <item>
      <title>About</title>
      <wp:post_id>12</wp:post_id>
      <wp:post_type><![CDATA[page]]></wp:post_type>
      <wp:status><![CDATA[publish]]></wp:status>
    </item>
    <item>
      <title>Unfetched</title>
      <wp:post_id>13</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
    </item>
  </channel>
</rss>
"#;

/// A single attachment pointing at the mock media host, used to hold a
/// run open long enough for concurrency assertions.
fn slow_export(base: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:wp="http://wordpress.org/export/1.2/">
  <channel>
    <title>Slow Export</title>
    <item>
      <title>Big Photo</title>
      <wp:post_id>7</wp:post_id>
      <wp:post_type><![CDATA[attachment]]></wp:post_type>
      <wp:attachment_url><![CDATA[{base}/slow/photo.png]]></wp:attachment_url>
    </item>
  </channel>
</rss>
"#
    )
}

fn png_bytes() -> Vec<u8> {
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    let image = RgbImage::from_pixel(2, 2, image::Rgb([80, 90, 100]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn test_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.upload.root_dir = dir.join("uploads");
    config.media.max_concurrent_downloads = 2;
    config.media.download_timeout = Duration::from_secs(5);
    config.media.retry.max_attempts = 1;
    config.media.retry.initial_delay = Duration::from_millis(10);
    config.media.disk_space.enabled = false;
    config
}

/// Build a router over a fresh in-memory store. The TempDir must outlive
/// the test so the upload root stays valid.
fn test_app_with(config: Config) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = config;
    config.upload.root_dir = dir.path().join("uploads");
    let manager =
        Arc::new(ImportManager::new(Arc::new(MemoryStore::new()), config.clone()).unwrap());
    let app = create_router(manager, Arc::new(config));
    (app, dir)
}

fn test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let manager =
        Arc::new(ImportManager::new(Arc::new(MemoryStore::new()), config.clone()).unwrap());
    let app = create_router(manager, Arc::new(config));
    (app, dir)
}

fn write_export(dir: &TempDir, name: &str, xml: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, xml).unwrap();
    path
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Poll GET /import/status until the reported state leaves "running".
async fn wait_terminal(app: &Router) -> serde_json::Value {
    for _ in 0..500 {
        let response = app
            .clone()
            .oneshot(get_request("/api/v1/import/status"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let snapshot = json_body(response).await;
        if snapshot["state"] != "running" {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("import did not reach a terminal state in time");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(get_request("/api/v1/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_before_any_import_is_404() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(get_request("/api/v1/import/status"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_cancel_without_a_job_is_404() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(post_json(
            "/api/v1/import/cancel",
            serde_json::json!({"initiator": "admin"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_trigger_import_runs_to_completion() {
    let (app, dir) = test_app();
    let source = write_export(&dir, "export.xml", EXPORT_XML);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import",
            serde_json::json!({
                "initiator": "admin",
                "source_path": source,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let admitted = json_body(response).await;
    assert_eq!(admitted["state"], "running");
    assert_eq!(admitted["initiator"], "admin");

    let done = wait_terminal(&app).await;
    assert_eq!(done["state"], "completed");
    assert!(done["ended_at"].is_string());

    let stats = &done["stats"];
    assert_eq!(stats["authors"]["imported"], 1);
    assert_eq!(stats["categories"]["imported"], 1);
    assert_eq!(stats["tags"]["imported"], 1);
    assert_eq!(stats["media"]["total"], 0);
    assert_eq!(stats["posts"]["imported"], 1);
    assert_eq!(stats["pages"]["imported"], 1);
    assert_eq!(stats["comments"]["imported"], 1);

    // The source file is consumed by the run
    assert!(!source.exists(), "source file should be removed");
}

#[tokio::test]
async fn test_trigger_with_missing_file_is_422_and_keeps_the_slot_free() {
    let (app, dir) = test_app();
    let missing = dir.path().join("nope.xml");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import",
            serde_json::json!({
                "initiator": "admin",
                "source_path": missing,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "source_missing");

    // The rejected trigger never occupied the job slot
    let response = app
        .oneshot(get_request("/api/v1/import/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_request_body_is_a_client_error() {
    let (app, _dir) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/import")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status().is_client_error(),
        "malformed JSON should be rejected with a 4xx, got {}",
        response.status()
    );
}

#[tokio::test]
async fn test_concurrent_trigger_conflicts_and_cancel_frees_the_slot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/photo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes())
                .insert_header("content-type", "image/png")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let (app, dir) = test_app();
    let slow = write_export(&dir, "slow.xml", &slow_export(&server.uri()));
    let other = write_export(&dir, "other.xml", EXPORT_XML);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import",
            serde_json::json!({
                "initiator": "admin",
                "source_path": slow,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // A second trigger is refused while the first run holds the slot,
    // regardless of which file it references
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import",
            serde_json::json!({
                "initiator": "editor",
                "source_path": other,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "import_in_progress");
    assert_eq!(body["error"]["details"]["initiator"], "admin");

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import/cancel",
            serde_json::json!({"initiator": "ops"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cancelled = json_body(response).await;
    assert_eq!(cancelled["state"], "cancelled");
    assert!(
        cancelled["error"]
            .as_str()
            .unwrap()
            .contains("cancelled by ops")
    );

    let done = wait_terminal(&app).await;
    assert_eq!(done["state"], "cancelled");
}

#[tokio::test]
async fn test_preview_reports_counts_and_leaves_the_file() {
    let (app, dir) = test_app();
    let source = write_export(&dir, "export.xml", EXPORT_XML);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/import/preview",
            serde_json::json!({"source_path": source}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let counts = json_body(response).await;
    assert_eq!(counts["authors"], 1);
    assert_eq!(counts["categories"], 1);
    assert_eq!(counts["tags"], 1);
    assert_eq!(counts["attachments"], 1);
    assert_eq!(counts["posts"], 1);
    assert_eq!(counts["pages"], 1);
    assert_eq!(counts["comments"], 1);

    // A preview is not a job and does not consume the document
    assert!(source.exists(), "preview must leave the source in place");

    let response = app
        .oneshot(get_request("/api/v1/import/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preview_with_missing_file_is_422() {
    let (app, dir) = test_app();
    let missing = dir.path().join("gone.xml");

    let response = app
        .oneshot(post_json(
            "/api/v1/import/preview",
            serde_json::json!({"source_path": missing}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "source_missing");
}

#[tokio::test]
async fn test_cors_enabled() {
    let mut config = Config::default();
    config.media.disk_space.enabled = false;
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let (app, _dir) = test_app_with(config);

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_openapi_json_endpoint() {
    let (app, _dir) = test_app();

    let response = app
        .oneshot(get_request("/api/v1/openapi.json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let spec = json_body(response).await;
    assert!(spec.get("openapi").is_some(), "Should have 'openapi' field");
    assert!(spec.get("info").is_some(), "Should have 'info' field");
    assert!(spec.get("paths").is_some(), "Should have 'paths' field");

    assert_eq!(spec["info"]["title"], "wxr-import REST API");
    assert!(
        spec["paths"]["/api/v1/import"]["post"].is_object(),
        "POST /api/v1/import should be documented"
    );
    assert!(
        spec["paths"]["/api/v1/import/status"]["get"].is_object(),
        "GET /api/v1/import/status should be documented"
    );
}

#[tokio::test]
async fn test_swagger_ui_enabled() {
    let mut config = Config::default();
    config.media.disk_space.enabled = false;
    config.server.api.swagger_ui = true;
    let (app, _dir) = test_app_with(config);

    let response = app.oneshot(get_request("/swagger-ui/")).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Swagger UI should be accessible when enabled"
    );
}

#[tokio::test]
async fn test_swagger_ui_disabled_keeps_the_spec_route() {
    let mut config = Config::default();
    config.media.disk_space.enabled = false;
    config.server.api.swagger_ui = false;
    let (app, _dir) = test_app_with(config);

    let response = app
        .clone()
        .oneshot(get_request("/swagger-ui/"))
        .await
        .unwrap();
    assert_eq!(
        response.status(),
        StatusCode::NOT_FOUND,
        "Swagger UI should not be accessible when disabled"
    );

    // The raw spec stays reachable through the plain handler route
    let response = app
        .oneshot(get_request("/api/v1/openapi.json"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let spec = json_body(response).await;
    assert!(spec.get("paths").is_some());
}

#[tokio::test]
async fn test_api_server_spawns() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let manager = Arc::new(
        ImportManager::new(Arc::new(MemoryStore::new()), (*config).clone()).unwrap(),
    );

    let api_handle = tokio::spawn({
        let manager = manager.clone();
        let config = config.clone();
        async move { start_api_server(manager, config).await }
    });

    // Give it a moment to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    api_handle.abort();
}

#[tokio::test]
async fn test_server_starts_and_responds_to_health() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let manager = Arc::new(
        ImportManager::new(Arc::new(MemoryStore::new()), config.clone()).unwrap(),
    );

    // Bind to a random available port (port 0)
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = create_router(manager, Arc::new(config));
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/health");
    let response = client.get(url).send().await.unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    server_handle.abort();
}
