//! Integration tests for pawsync-drive
//!
//! Uses wiremock to simulate the Google Drive v3 API and verifies
//! end-to-end behavior of folder/file lookup, uploads and downloads.

mod common;

mod test_directory;
mod test_transfer;
