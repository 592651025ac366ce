//! Upload and download of the backup file
//!
//! Uploads use the `multipart/related` upload type: a JSON metadata part
//! followed by the CSV content, sent in a single request. With a known file
//! id the content is overwritten in place (`PATCH`), otherwise a new file is
//! created inside the backup folder (`POST`).

use pawsync_core::domain::{AccessToken, FolderId, RemoteId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{send_checked, DriveClient};
use crate::DriveError;

/// MIME type of the uploaded backup content
pub const CONTENT_MIME_TYPE: &str = "text/csv";

const UPLOAD: &str = "File upload";
const DOWNLOAD: &str = "File download";

/// Metadata part of a multipart upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
    /// Only sent on create; Drive rejects `parents` on a PATCH
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<Vec<&'a str>>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

/// Picks a boundary token that does not occur inside `content`
pub fn choose_boundary(content: &str) -> String {
    loop {
        let boundary = format!("pawsync_{}", Uuid::new_v4().simple());
        if !content.contains(&boundary) {
            return boundary;
        }
    }
}

/// Builds a `multipart/related` body from a JSON metadata part and the content
pub fn build_multipart_body(boundary: &str, metadata_json: &str, content: &str) -> String {
    format!(
        "\r\n--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata_json}\r\n\
         --{boundary}\r\n\
         Content-Type: {CONTENT_MIME_TYPE}\r\n\r\n\
         {content}\r\n\
         --{boundary}--"
    )
}

impl DriveClient {
    /// Uploads `content` as `name`, overwriting `file_id` or creating a new file in `folder`
    ///
    /// # Returns
    /// The id of the written file
    pub async fn upload_file(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        file_id: Option<&RemoteId>,
        name: &str,
        content: &str,
    ) -> Result<RemoteId, DriveError> {
        let metadata = UploadMetadata {
            name,
            mime_type: CONTENT_MIME_TYPE,
            parents: file_id.is_none().then(|| vec![folder.as_str()]),
        };
        let metadata_json =
            serde_json::to_string(&metadata).map_err(|e| DriveError::invalid(UPLOAD, e.to_string()))?;

        let boundary = choose_boundary(content);
        let body = build_multipart_body(&boundary, &metadata_json, content);

        let request = match file_id {
            Some(id) => {
                debug!(file_id = %id, bytes = content.len(), "Overwriting backup file");
                self.upload_request(Method::PATCH, &format!("/files/{}", id.as_str()), token)
            }
            None => {
                debug!(folder_id = %folder, bytes = content.len(), "Creating backup file");
                self.upload_request(Method::POST, "/files", token)
            }
        };

        let response: UploadResponse = send_checked(
            request
                .query(&[("uploadType", "multipart"), ("fields", "id")])
                .header(
                    reqwest::header::CONTENT_TYPE,
                    format!("multipart/related; boundary=\"{boundary}\""),
                )
                .body(body),
            UPLOAD,
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::invalid(UPLOAD, e.to_string()))?;

        let id = RemoteId::new(response.id).map_err(|e| DriveError::invalid(UPLOAD, e.to_string()))?;
        info!(file_id = %id, created = file_id.is_none(), "Uploaded backup file");
        Ok(id)
    }

    /// Downloads the full content of a file as text
    ///
    /// Makes `GET /files/{id}?alt=media`.
    pub async fn download_file(
        &self,
        token: &AccessToken,
        file_id: &RemoteId,
    ) -> Result<String, DriveError> {
        let text = send_checked(
            self.request(Method::GET, &format!("/files/{}", file_id.as_str()), token)
                .query(&[("alt", "media")]),
            DOWNLOAD,
        )
        .await?
        .text()
        .await
        .map_err(|e| DriveError::network(DOWNLOAD, e))?;

        debug!(file_id = %file_id, bytes = text.len(), "Downloaded backup file");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_format() {
        let boundary = choose_boundary("");
        assert!(boundary.starts_with("pawsync_"));
        assert_eq!(boundary.len(), "pawsync_".len() + 32);
    }

    #[test]
    fn test_boundary_is_not_in_content() {
        let content = "Date,Notes\n2024-01-01 00:00:00,pawsync_\n";
        let boundary = choose_boundary(content);
        assert!(!content.contains(&boundary));
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = build_multipart_body("b1", r#"{"name":"x.csv"}"#, "a,b\n1,2");
        assert!(body.starts_with("\r\n--b1\r\nContent-Type: application/json"));
        assert!(body.contains("\r\n\r\n{\"name\":\"x.csv\"}\r\n--b1\r\n"));
        assert!(body.contains("Content-Type: text/csv\r\n\r\na,b\n1,2\r\n"));
        assert!(body.ends_with("\r\n--b1--"));
    }

    #[test]
    fn test_create_metadata_has_parents() {
        let metadata = UploadMetadata {
            name: "x.csv",
            mime_type: CONTENT_MIME_TYPE,
            parents: Some(vec!["folder1"]),
        };
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["mimeType"], "text/csv");
        assert_eq!(json["parents"][0], "folder1");
    }

    #[test]
    fn test_update_metadata_omits_parents() {
        let metadata = UploadMetadata {
            name: "x.csv",
            mime_type: CONTENT_MIME_TYPE,
            parents: None,
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("parents"));
    }
}
