//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the necessary mock endpoints on a wiremock server.
//! The mock serves both the metadata API (`/drive/v3`) and the upload API
//! (`/upload/drive/v3`) so one server covers a whole sync round-trip.

use pawsync_core::domain::AccessToken;
use pawsync_drive::client::DriveClient;
use pawsync_drive::provider::GoogleDriveProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_PREFIX: &str = "/drive/v3";
pub const UPLOAD_PREFIX: &str = "/upload/drive/v3";

/// Starts a mock server and returns a provider pointing at it.
pub async fn setup_drive_mock() -> (MockServer, GoogleDriveProvider) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_urls(
        format!("{}{}", server.uri(), API_PREFIX),
        format!("{}{}", server.uri(), UPLOAD_PREFIX),
    );
    (server, GoogleDriveProvider::new(client))
}

pub fn token() -> AccessToken {
    AccessToken::new("test-access-token").unwrap()
}

/// Mounts `GET /files` answering with the given file list.
pub async fn mount_file_list(server: &MockServer, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": files })),
        )
        .mount(server)
        .await;
}

/// Mounts `POST /files` (folder creation) returning `folder_id`.
pub async fn mount_folder_create(server: &MockServer, folder_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": folder_id,
            "name": "PawSync_Data",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /files/{id}?alt=media` returning `content`.
pub async fn mount_download(server: &MockServer, file_id: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files/{file_id}")))
        .and(query_param("alt", "media"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(content)
                .append_header("Content-Type", "text/csv"),
        )
        .mount(server)
        .await;
}
