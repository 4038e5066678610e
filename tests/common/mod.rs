//! Common test utilities.

use std::io::{Cursor, Write};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use fabric_server::config::{AuthConfig, Config, StorageConfig};
use fabric_server::routes::create_router;
use fabric_server::state::AppState;
use fabric_server::storage::BlobStore;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const TOKEN: &str = "test-token";

/// A router over a temporary database and blob directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

/// Status, headers and raw body of a response
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[allow(dead_code)]
impl TestServer {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut Config),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let blob_path = temp_dir.path().join("blobs");

        let mut config = Config {
            auth: AuthConfig {
                token: Some(TOKEN.to_string()),
            },
            storage: StorageConfig::Local {
                path: blob_path.clone(),
            },
            ..Config::default()
        };
        modifier(&mut config);

        let blobs = BlobStore::from_config(&config.storage)
            .await
            .expect("Failed to create blob store");
        let db_url = format!("sqlite:{}", temp_dir.path().join("fabric.db").display());
        let db = fabric_server::db::create_pool(&db_url)
            .await
            .expect("Failed to create database");

        let state = AppState::new(config, blobs, db);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request, optionally authenticated with `token`
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        headers: &[(&str, &str)],
        body: Body,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();

        TestResponse { status, headers, body }
    }

    /// Authenticated JSON request
    pub async fn json(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (headers, body) = match body {
            Some(v) => (
                vec![("Content-Type", "application/json")],
                Body::from(serde_json::to_vec(&v).unwrap()),
            ),
            None => (vec![], Body::empty()),
        };
        let response = self.send(method, uri, Some(TOKEN), &headers, body).await;
        (response.status, response.json())
    }

    /// Authenticated GET
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri, Some(TOKEN), &[], Body::empty()).await
    }

    /// Authenticated zip upload
    pub async fn upload_zip(&self, uri: &str, zip: Vec<u8>) -> (StatusCode, Value) {
        let response = self
            .send("POST", uri, Some(TOKEN), &[("Content-Type", "application/zip")], Body::from(zip))
            .await;
        (response.status, response.json())
    }

    /// Create a session and return its id
    pub async fn create_session(&self, app_name: &str) -> String {
        let (status, body) = self
            .json("POST", "/sessions", Some(serde_json::json!({ "appName": app_name })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["sessionId"].as_str().unwrap().to_string()
    }
}

/// Build a zip archive from `(name, bytes)` pairs
#[allow(dead_code)]
pub fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Entry names and bytes of a zip archive
#[allow(dead_code)]
pub fn unzip(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();
            (file.name().to_string(), data)
        })
        .collect()
}

/// Single stored entry whose headers declare `declared` uncompressed bytes
#[allow(dead_code)]
pub fn zip_with_declared_size(name: &str, data: &[u8], declared: u32) -> Vec<u8> {
    use zip::CompressionMethod;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file(name, options).unwrap();
    writer.write_all(data).unwrap();
    let mut bytes = writer.finish().unwrap().into_inner();

    // Uncompressed size field of the local header (offset 22) and central header (offset 24)
    for (signature, offset) in [([0x50u8, 0x4b, 0x03, 0x04], 22), ([0x50, 0x4b, 0x01, 0x02], 24)] {
        let start = bytes.windows(4).position(|w| w == signature).unwrap();
        bytes[start + offset..start + offset + 4].copy_from_slice(&declared.to_le_bytes());
    }
    bytes
}
