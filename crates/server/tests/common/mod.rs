//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock download clients and metadata injected, so scans and events
//! can be driven over HTTP without external infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use seedsort_core::{
    testing::{MockDownloadClient, MockMediaMetadata},
    ClientBackend, Config, DatabaseConfig, DownloadClient, ScanService, ServerConfig,
    SqliteHistoryStore, Tagger, TaggerConfig,
};

/// Re-export fixtures for test convenience
pub use seedsort_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_scan() {
///     let fixture = TestFixture::new().await;
///     fixture.client.add_torrent(fixtures::torrent("abc", "Show", 1, 1)).await;
///
///     let response = fixture.post("/api/v1/scan", json!({})).await;
///
///     assert_eq!(response.status, StatusCode::OK);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock download client, registered as "qb"
    pub client: Arc<MockDownloadClient>,
    /// Mock metadata source
    pub metadata: Arc<MockMediaMetadata>,
    /// History store backing the tagger
    pub history: Arc<SqliteHistoryStore>,
    /// Scan service shared with the router
    pub scans: Arc<ScanService>,
    /// Temporary directory for the history database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with tagging enabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("history.db");

        let tagger_config = TaggerConfig {
            enabled: !test_config.disable_tagger,
            enable_site_tag: true,
            enable_media_title_tag: true,
            enable_category: true,
            ..Default::default()
        };

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            tagger: tagger_config.clone(),
            clients: vec![fixtures::client_config("qb", ClientBackend::QBittorrent)],
            sites: fixtures::sites(),
            ..Default::default()
        };

        // Create mocks
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        let metadata = Arc::new(MockMediaMetadata::new());
        let history = Arc::new(
            SqliteHistoryStore::new(&db_path).expect("Failed to create history store"),
        );

        let tagger = Tagger::new(tagger_config, fixtures::resolver(), history.clone())
            .with_metadata(metadata.clone());
        let scans = Arc::new(ScanService::new(
            Arc::new(tagger),
            vec![Arc::clone(&client) as Arc<dyn DownloadClient>],
        ));

        let state = Arc::new(seedsort_server::state::AppState::new(
            config,
            Arc::clone(&scans),
        ));
        let router = seedsort_server::api::create_router(state);

        Self {
            router,
            client,
            metadata,
            history,
            scans,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Start with `tagger.enabled = false`
    pub disable_tagger: bool,
}

impl TestConfig {
    /// Create config with the tagger switched off.
    pub fn with_tagger_disabled() -> Self {
        Self {
            disable_tagger: true,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
