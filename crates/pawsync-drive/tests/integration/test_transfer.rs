//! Integration tests for upload and download of the backup file

use chrono::{TimeZone, Utc};
use pawsync_core::domain::{AnxietyScore, FolderId, RemoteId, Step, TrainingSession};
use pawsync_core::exchange::{decode_sessions, encode_sessions};
use pawsync_core::ports::{IRemoteDirectory, IRemoteTransfer};
use wiremock::matchers::{header_regex, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, API_PREFIX, UPLOAD_PREFIX};

/// Extracts the CSV part of a multipart/related body
fn csv_part(body: &str) -> String {
    let start = body
        .find("Content-Type: text/csv\r\n\r\n")
        .expect("csv part header")
        + "Content-Type: text/csv\r\n\r\n".len();
    let end = body[start..].rfind("\r\n--").expect("closing boundary") + start;
    body[start..end].to_string()
}

// ============================================================================
// Upload tests
// ============================================================================

#[tokio::test]
async fn test_upload_creates_file_in_folder() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("{UPLOAD_PREFIX}/files")))
        .and(query_param("uploadType", "multipart"))
        .and(header_regex(
            "content-type",
            r#"^multipart/related; boundary="pawsync_[0-9a-f]{32}"$"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = FolderId::new("folder-001").unwrap();
    let id = provider
        .upload(&common::token(), &folder, None, "pawsync_sessions.csv", "Date\n")
        .await
        .expect("upload failed");
    assert_eq!(id.as_str(), "file-new");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains(r#""parents":["folder-001"]"#));
    assert!(body.contains(r#""mimeType":"text/csv""#));
    assert_eq!(csv_part(&body), "Date\n");
}

#[tokio::test]
async fn test_upload_with_id_overwrites_in_place() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{UPLOAD_PREFIX}/files/file-001")))
        .and(query_param("uploadType", "multipart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-001"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = FolderId::new("folder-001").unwrap();
    let existing = RemoteId::new("file-001").unwrap();
    let id = provider
        .upload(
            &common::token(),
            &folder,
            Some(&existing),
            "pawsync_sessions.csv",
            "content",
        )
        .await
        .unwrap();
    assert_eq!(id, existing);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(!body.contains("parents"));
}

#[tokio::test]
async fn test_upload_error_carries_status() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("{UPLOAD_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(507).set_body_string("storage quota exceeded"))
        .mount(&server)
        .await;

    let folder = FolderId::new("folder-001").unwrap();
    let err = provider
        .upload(&common::token(), &folder, None, "pawsync_sessions.csv", "x")
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "File upload failed (507): storage quota exceeded"
    );
}

// ============================================================================
// Download tests
// ============================================================================

#[tokio::test]
async fn test_download_returns_content() {
    let (server, provider) = common::setup_drive_mock().await;
    common::mount_download(&server, "file-001", "Date,Notes\n").await;

    let id = RemoteId::new("file-001").unwrap();
    let content = provider.download(&common::token(), &id).await.unwrap();

    assert_eq!(content, "Date,Notes\n");
}

#[tokio::test]
async fn test_download_returns_error_on_404() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/files/missing")))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: missing."))
        .mount(&server)
        .await;

    let id = RemoteId::new("missing").unwrap();
    let err = provider.download(&common::token(), &id).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().starts_with("File download failed (404)"));
}

// ============================================================================
// Round trip
// ============================================================================

#[tokio::test]
async fn test_uploaded_content_downloads_to_same_sessions() {
    let (server, provider) = common::setup_drive_mock().await;
    Mock::given(method("POST"))
        .and(path(format!("{UPLOAD_PREFIX}/files")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "file-rt"
        })))
        .mount(&server)
        .await;

    let date = Utc.with_ymd_and_hms(2024, 6, 15, 9, 30, 0).unwrap();
    let sessions = vec![
        TrainingSession::new(date, vec![Step::new(30, true), Step::new(60, true)])
            .with_anxiety_score(AnxietyScore::Calm)
            .with_notes("He said \"good boy\", twice"),
        TrainingSession::new(date, vec![Step::new(120, false)])
            .with_anxiety_score(AnxietyScore::Panicking),
    ];
    let content = encode_sessions(&sessions).unwrap();

    let folder = FolderId::new("folder-001").unwrap();
    let id = provider
        .upload(&common::token(), &folder, None, "pawsync_sessions.csv", &content)
        .await
        .unwrap();

    // Serve back exactly what was uploaded
    let requests = server.received_requests().await.unwrap();
    let uploaded = csv_part(&String::from_utf8(requests[0].body.clone()).unwrap());
    common::mount_file_list(
        &server,
        serde_json::json!([{
            "id": "file-rt",
            "name": "pawsync_sessions.csv",
            "modifiedTime": "2024-06-15T10:00:00Z"
        }]),
    )
    .await;
    common::mount_download(&server, id.as_str(), &uploaded).await;

    let meta = provider
        .find_file(&common::token(), &folder, "pawsync_sessions.csv")
        .await
        .unwrap()
        .unwrap();
    let downloaded = provider.download(&common::token(), &meta.id).await.unwrap();
    let restored = decode_sessions(&downloaded).unwrap();

    assert_eq!(restored.len(), 2);
    for (restored, original) in restored.iter().zip(&sessions) {
        assert_eq!(restored.date, original.date);
        assert_eq!(restored.steps.len(), original.steps.len());
        assert_eq!(restored.anxiety_score, original.anxiety_score);
        assert_eq!(restored.notes, original.notes);
        assert_eq!(restored.completed, original.completed);
        assert_eq!(
            restored.total_duration_seconds,
            original.total_duration_seconds
        );
    }
}
