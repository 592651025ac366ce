//! Integration tests for folder and file lookup

use pawsync_core::domain::FolderId;
use pawsync_core::ports::{IRemoteDirectory, RemoteError};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, API_PREFIX};

// ============================================================================
// find_or_create_folder
// ============================================================================

#[tokio::test]
async fn test_find_folder_returns_first_match() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_list(
        &server,
        serde_json::json!([
            { "id": "folder-001", "name": "PawSync_Data" },
            { "id": "folder-002", "name": "PawSync_Data" }
        ]),
    )
    .await;

    let folder = provider
        .find_or_create_folder(&common::token(), "PawSync_Data")
        .await
        .expect("folder lookup failed");

    assert_eq!(folder.as_str(), "folder-001");
}

#[tokio::test]
async fn test_find_folder_sends_query_and_bearer() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files")))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param(
            "q",
            "name='Rex\\'s data' and mimeType='application/vnd.google-apps.folder' and trashed=false",
        ))
        .and(query_param("fields", "files(id,name)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "folder-rex", "name": "Rex's data" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = provider
        .find_or_create_folder(&common::token(), "Rex's data")
        .await
        .unwrap();
    assert_eq!(folder.as_str(), "folder-rex");
}

#[tokio::test]
async fn test_create_folder_when_none_found() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_list(&server, serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/files")))
        .and(body_partial_json(serde_json::json!({
            "name": "PawSync_Data",
            "mimeType": "application/vnd.google-apps.folder"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "folder-new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = provider
        .find_or_create_folder(&common::token(), "PawSync_Data")
        .await
        .unwrap();

    assert_eq!(folder.as_str(), "folder-new");
}

#[tokio::test]
async fn test_folder_search_error_carries_status_and_body() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = provider
        .find_or_create_folder(&common::token(), "PawSync_Data")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Folder search failed (500): backend error");
    assert!(!err.is_credential_rejected());
}

#[tokio::test]
async fn test_folder_creation_error() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_list(&server, serde_json::json!([])).await;
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient permissions"))
        .mount(&server)
        .await;

    let err = provider
        .find_or_create_folder(&common::token(), "PawSync_Data")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().starts_with("Folder creation failed (403)"));
}

// ============================================================================
// find_file
// ============================================================================

#[tokio::test]
async fn test_find_file_absent() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_list(&server, serde_json::json!([])).await;

    let folder = FolderId::new("folder-001").unwrap();
    let found = provider
        .find_file(&common::token(), &folder, "pawsync_sessions.csv")
        .await
        .unwrap();

    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_file_returns_metadata() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files")))
        .and(query_param(
            "q",
            "name='pawsync_sessions.csv' and 'folder-001' in parents and trashed=false",
        ))
        .and(query_param("fields", "files(id,name,modifiedTime)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{
                "id": "file-001",
                "name": "pawsync_sessions.csv",
                "modifiedTime": "2024-06-15T09:30:00.000Z"
            }]
        })))
        .mount(&server)
        .await;

    let folder = FolderId::new("folder-001").unwrap();
    let meta = provider
        .find_file(&common::token(), &folder, "pawsync_sessions.csv")
        .await
        .unwrap()
        .expect("file should be found");

    assert_eq!(meta.id.as_str(), "file-001");
    assert_eq!(meta.modified_at.to_rfc3339(), "2024-06-15T09:30:00+00:00");
}

#[tokio::test]
async fn test_find_file_unauthorized_is_credential_rejection() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .mount(&server)
        .await;

    let folder = FolderId::new("folder-001").unwrap();
    let err = provider
        .find_file(&common::token(), &folder, "pawsync_sessions.csv")
        .await
        .unwrap_err();

    assert!(err.is_credential_rejected());
    assert!(matches!(err, RemoteError::Status { status: 401, .. }));
}

#[tokio::test]
async fn test_find_file_without_modified_time_is_invalid_response() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_file_list(
        &server,
        serde_json::json!([{ "id": "file-001", "name": "pawsync_sessions.csv" }]),
    )
    .await;

    let folder = FolderId::new("folder-001").unwrap();
    let err = provider
        .find_file(&common::token(), &folder, "pawsync_sessions.csv")
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::InvalidResponse { .. }));
}
