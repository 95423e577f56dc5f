//! Shared helpers for upload integration tests
//!
//! - Mock asset API setup
//! - Uploader construction against a mock server
//! - Test file generation

#![allow(dead_code)]

use asset_uploadr::client::HttpRequestSender;
use asset_uploadr::upload::Uploader;
use rand::RngCore;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// File id handed out by the mock prepare endpoint
pub const FILE_ID: &str = "6a1f3c2e-8b4d-4e7a-9c10-2f5d8e7b3a61";

/// Bearer token configured on test senders
pub const TOKEN: &str = "test-permanent-token";

pub const MIB: usize = 1024 * 1024;

pub fn prepare_path() -> String {
    "/v7/file_cmds/upload/prepare".to_string()
}

pub fn chunk_path(index: u64) -> String {
    format!("/v7/file_cmds/upload/{}/chunk/{}", FILE_ID, index)
}

pub fn finalize_path() -> String {
    format!("/v7/file_cmds/upload/{}/finalise_api", FILE_ID)
}

pub fn save_new_path() -> String {
    format!("/api/v4/media/save/{}", FILE_ID)
}

pub fn save_version_path(media_id: &str) -> String {
    format!("/api/v4/media/{}/save/{}", media_id, FILE_ID)
}

/// Uploader whose sender points at the mock server
pub fn uploader_for(server: &MockServer) -> Uploader<HttpRequestSender> {
    let sender = HttpRequestSender::builder()
        .base_url(&server.uri())
        .token(TOKEN)
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    Uploader::new(sender)
}

pub fn save_response(media_id: &str) -> serde_json::Value {
    json!({
        "success": true,
        "mediaitems": [
            { "original": "original", "destination": "destination", "type": "original" }
        ],
        "batchId": "batch-42",
        "mediaid": media_id
    })
}

/// Mount prepare, chunk and finalize endpoints that always succeed
pub async fn mount_transfer_endpoints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(prepare_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": FILE_ID })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/v7/file_cmds/upload/[^/]+/chunk/\d+$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(finalize_path()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "correlationId": "corr-1" })),
        )
        .mount(server)
        .await;
}

/// Write `size` random bytes to `name` inside `dir`
pub fn random_file(dir: &tempfile::TempDir, name: &str, size: usize) -> (PathBuf, Vec<u8>) {
    let mut data = vec![0u8; size];
    rand::rng().fill_bytes(&mut data);
    let file_path = dir.path().join(name);
    std::fs::write(&file_path, &data).unwrap();
    (file_path, data)
}

/// Requests received by the server whose path matches `predicate`, in arrival order
pub async fn requests_where(server: &MockServer, predicate: impl Fn(&str) -> bool) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| predicate(r.url.path()))
        .collect()
}

pub fn body_text(request: &Request) -> String {
    String::from_utf8_lossy(&request.body).into_owned()
}
