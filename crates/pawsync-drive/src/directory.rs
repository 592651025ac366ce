//! Folder and file lookup
//!
//! Searches use the Drive `q` query language. Names are user-configurable,
//! so they are escaped before being embedded in a query literal.

use chrono::{DateTime, Utc};
use pawsync_core::domain::{AccessToken, FolderId, RemoteFileMetadata, RemoteId};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{send_checked, DriveClient};
use crate::DriveError;

/// MIME type Google Drive uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// ============================================================================
// Drive API response types
// ============================================================================

/// Response of `GET /files`
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// A single entry of a file list or a create response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[allow(dead_code)]
    name: Option<String>,
    modified_time: Option<DateTime<Utc>>,
}

/// Escapes a value for use inside a single-quoted Drive query literal
pub fn escape_query_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl DriveClient {
    /// Returns the first non-trashed folder named `name`, creating it if none exists
    ///
    /// Makes `GET /files?q=...` and, when nothing matched, `POST /files`.
    pub async fn find_or_create_folder(
        &self,
        token: &AccessToken,
        name: &str,
    ) -> Result<FolderId, DriveError> {
        const SEARCH: &str = "Folder search";
        const CREATE: &str = "Folder creation";

        let query = format!(
            "name='{}' and mimeType='{}' and trashed=false",
            escape_query_value(name),
            FOLDER_MIME_TYPE
        );
        debug!(folder = name, "Searching for backup folder");

        let list: FileList = send_checked(
            self.request(Method::GET, "/files", token)
                .query(&[("q", query.as_str()), ("fields", "files(id,name)")]),
            SEARCH,
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::invalid(SEARCH, e.to_string()))?;

        if let Some(existing) = list.files.into_iter().next() {
            debug!(folder_id = %existing.id, "Found existing folder");
            return FolderId::new(existing.id).map_err(|e| DriveError::invalid(SEARCH, e.to_string()));
        }

        let created: DriveFile = send_checked(
            self.request(Method::POST, "/files", token)
                .query(&[("fields", "id")])
                .json(&serde_json::json!({
                    "name": name,
                    "mimeType": FOLDER_MIME_TYPE,
                })),
            CREATE,
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::invalid(CREATE, e.to_string()))?;

        info!(folder = name, folder_id = %created.id, "Created backup folder");
        FolderId::new(created.id).map_err(|e| DriveError::invalid(CREATE, e.to_string()))
    }

    /// Looks up a non-trashed file named `name` directly inside `folder`
    pub async fn find_file(
        &self,
        token: &AccessToken,
        folder: &FolderId,
        name: &str,
    ) -> Result<Option<RemoteFileMetadata>, DriveError> {
        const SEARCH: &str = "File search";

        let query = format!(
            "name='{}' and '{}' in parents and trashed=false",
            escape_query_value(name),
            escape_query_value(folder.as_str())
        );

        let list: FileList = send_checked(
            self.request(Method::GET, "/files", token).query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name,modifiedTime)"),
            ]),
            SEARCH,
        )
        .await?
        .json()
        .await
        .map_err(|e| DriveError::invalid(SEARCH, e.to_string()))?;

        let Some(file) = list.files.into_iter().next() else {
            debug!(file = name, "Backup file not found");
            return Ok(None);
        };

        let modified_at = file
            .modified_time
            .ok_or_else(|| DriveError::invalid(SEARCH, "file entry has no modifiedTime"))?;
        let id = RemoteId::new(file.id).map_err(|e| DriveError::invalid(SEARCH, e.to_string()))?;

        debug!(file_id = %id, %modified_at, "Found backup file");
        Ok(Some(RemoteFileMetadata::new(id, modified_at)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("PawSync_Data"), "PawSync_Data");
        assert_eq!(escape_query_value("Rex's data"), "Rex\\'s data");
        assert_eq!(escape_query_value(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_file_list_deserialization() {
        let json = r#"{"files":[{"id":"f1","name":"x.csv","modifiedTime":"2024-06-15T09:30:00.000Z"}]}"#;
        let list: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].id, "f1");
        assert!(list.files[0].modified_time.is_some());
    }

    #[test]
    fn test_file_list_missing_files_is_empty() {
        let list: FileList = serde_json::from_str("{}").unwrap();
        assert!(list.files.is_empty());
    }
}
