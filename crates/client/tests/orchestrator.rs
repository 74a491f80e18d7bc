//! Integration tests for the orchestrator over a real HTTP client.
//!
//! Uses wiremock as the shell's origin. Dropping an unpooled mock server
//! (`MockServer::builder().start()`) stands in for losing connectivity; a
//! pooled one would keep listening after the drop.

use std::sync::Arc;
use std::time::Duration;

use hearth_client::{AuthContext, FetchClient, FetchConfig, Orchestrator, OrchestratorSettings, Request, Source};
use hearth_core::{AppConfig, CacheDb};
use reqwest::{Method, StatusCode, Url};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_shell(server: &MockServer) {
    for (route, body) in [
        ("/", "<html>shell</html>"),
        ("/offline.html", "<html>you are offline</html>"),
        ("/js/app.js", "console.log('app')"),
        ("/icons/icon-192.png", "png"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }
}

fn test_config(server: &MockServer, version: &str) -> AppConfig {
    AppConfig {
        origin: server.uri(),
        cache_version: version.to_string(),
        core_urls: vec!["/".into(), "/offline.html".into(), "/js/app.js".into()],
        asset_urls: vec!["/icons/icon-192.png".into()],
        ..AppConfig::default()
    }
}

fn create_orchestrator(db: &CacheDb, config: &AppConfig) -> Orchestrator {
    let fetcher = FetchClient::new(FetchConfig { timeout: Duration::from_secs(2), ..FetchConfig::default() })
        .expect("failed to create client");
    let settings = OrchestratorSettings::from_config(config).expect("invalid settings");
    Orchestrator::new(db.clone(), Arc::new(fetcher), settings)
}

fn at(server_uri: &str, route: &str) -> Url {
    Url::parse(server_uri).unwrap().join(route).unwrap()
}

#[tokio::test]
async fn test_navigation_survives_going_offline() {
    let server = MockServer::builder().start().await;
    mount_shell(&server).await;
    Mock::given(method("GET"))
        .and(path("/app/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Tasks</h1>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let db = CacheDb::open_in_memory().await.unwrap();
    let orch = create_orchestrator(&db, &test_config(&server, "v1"));
    orch.start().await.expect("install failed");

    let online = orch.route(Request::navigate(at(&uri, "/app/tasks"))).await.unwrap();
    assert_eq!(online.source, Source::Network);

    drop(server);

    let offline = orch.route(Request::navigate(at(&uri, "/app/tasks"))).await.unwrap();
    assert_eq!(offline.source, Source::Cache);
    assert_eq!(offline.response.status, StatusCode::OK);
    assert_eq!(offline.response.bytes, online.response.bytes);

    let unknown = orch.route(Request::navigate(at(&uri, "/app/never-visited"))).await.unwrap();
    assert_eq!(unknown.source, Source::OfflineDocument);
    assert_eq!(unknown.response.bytes.as_ref(), b"<html>you are offline</html>");
}

#[tokio::test]
async fn test_precached_asset_served_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/css/app.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
        .expect(1)
        .mount(&server)
        .await;
    mount_shell(&server).await;

    let db = CacheDb::open_in_memory().await.unwrap();
    let mut config = test_config(&server, "v1");
    config.asset_urls.push("/css/app.css".into());
    let orch = create_orchestrator(&db, &config);
    orch.start().await.unwrap();

    for _ in 0..3 {
        let served = orch.route(Request::get(at(&server.uri(), "/css/app.css"))).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.bytes.as_ref(), b"body{}");
    }
}

#[tokio::test]
async fn test_install_fails_on_missing_shell_file() {
    let server = MockServer::start().await;
    mount_shell(&server).await;

    let db = CacheDb::open_in_memory().await.unwrap();
    let mut config = test_config(&server, "v1");
    config.core_urls.push("/js/views/missing.js".into());
    let orch = create_orchestrator(&db, &config);

    let err = orch.start().await.unwrap_err();
    assert!(err.to_string().starts_with("PRECACHE_FAILED"));
    assert!(db.partition_names().await.unwrap().is_empty());

    let served = orch.route(Request::get(at(&server.uri(), "/js/app.js"))).await.unwrap();
    assert_eq!(served.source, Source::Passthrough);
}

#[tokio::test]
async fn test_version_bump_replaces_generation() {
    let server = MockServer::start().await;
    mount_shell(&server).await;
    let db = CacheDb::open_in_memory().await.unwrap();

    create_orchestrator(&db, &test_config(&server, "v1")).start().await.unwrap();
    let report = create_orchestrator(&db, &test_config(&server, "v2")).start().await.unwrap();

    let mut deleted = report.activation.expect("expected activation").deleted;
    deleted.sort();
    assert_eq!(deleted, vec!["hearth-api-v1", "hearth-assets-v1", "hearth-core-v1", "hearth-pages-v1"]);
    assert!(db.partition_names().await.unwrap().iter().all(|name| name.ends_with("-v2")));
}

#[tokio::test]
async fn test_api_write_through_and_sign_out() {
    let server = MockServer::builder().start().await;
    mount_shell(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[{\"id\":1}]"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let uri = server.uri();
    let db = CacheDb::open_in_memory().await.unwrap();
    let session = Arc::new(AuthContext::new());
    let orch = create_orchestrator(&db, &test_config(&server, "v1")).with_session(Arc::clone(&session));
    orch.start().await.unwrap();
    orch.sign_in("test-token", Some("user-1".into())).await.unwrap();

    let created = orch.route(Request::new(Method::POST, at(&uri, "/api/tasks"))).await.unwrap();
    assert_eq!(created.source, Source::Passthrough);
    assert_eq!(created.response.status, StatusCode::CREATED);

    let listed = orch.route(Request::get(at(&uri, "/api/tasks"))).await.unwrap();
    assert_eq!(listed.source, Source::Network);
    assert_eq!(db.entry_urls("hearth-api-v1").await.unwrap(), vec![format!("{uri}/api/tasks")]);

    drop(server);
    let cached = orch.route(Request::get(at(&uri, "/api/tasks"))).await.unwrap();
    assert_eq!(cached.source, Source::Cache);
    assert_eq!(cached.response.bytes.as_ref(), b"[{\"id\":1}]");

    orch.sign_out().await.unwrap();
    assert!(!session.is_authenticated());
    assert!(db.entry_urls("hearth-api-v1").await.unwrap().is_empty());
    assert!(orch.route(Request::get(at(&uri, "/api/tasks"))).await.is_err());
}
