//! Request/response envelope for out-of-band catalog backups.
//!
//! The envelope is a plain serde struct; the transport that carries it is not
//! part of this workspace. Defaults are constructed explicitly at the call site.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options that control how a backup is taken.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOptions {
    /// Write the backup to the local file system of the serving node rather
    /// than the shared store.
    #[serde(default)]
    pub local_file_system: bool,

    /// Skip tables whose reconciliation is in flight instead of waiting for it.
    #[serde(default)]
    pub skip_in_flight: bool,
}

/// Request to snapshot the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRequest {
    /// Backup options. Absent means [`BackupOptions::default`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BackupOptions>,

    /// Directory to write the backup under. Absent means the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_directory: Option<String>,
}

impl BackupRequest {
    /// Creates a request targeting the given directory.
    #[must_use]
    pub fn to_directory(target_directory: impl Into<String>) -> Self {
        Self {
            options: None,
            target_directory: Some(target_directory.into()),
        }
    }

    /// Sets the backup options.
    #[must_use]
    pub fn with_options(mut self, options: BackupOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Returns the effective options.
    #[must_use]
    pub fn effective_options(&self) -> BackupOptions {
        self.options.clone().unwrap_or_default()
    }

    /// Encodes the request as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a request from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the bytes are not a valid request.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Response confirming where a backup was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    /// Location of the backup (directory prefix on the backup store).
    pub backup_uri: String,

    /// Number of table records written.
    pub entry_count: usize,

    /// Tables skipped because a reconciliation was in flight (`db.table`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_tables: Vec<String>,
}

impl BackupResponse {
    /// Encodes the response as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a response from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the bytes are not a valid response.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_encodes_to_empty_object() {
        let bytes = BackupRequest::default().encode().unwrap();
        assert_eq!(bytes, b"{}");
        let decoded = BackupRequest::decode(b"{}").unwrap();
        assert_eq!(decoded.effective_options(), BackupOptions::default());
        assert!(decoded.target_directory.is_none());
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let request = BackupRequest::to_directory("/backups").with_options(BackupOptions {
            local_file_system: true,
            skip_in_flight: false,
        });
        let json = String::from_utf8(request.encode().unwrap()).unwrap();
        assert!(json.contains("\"targetDirectory\":\"/backups\""));
        assert!(json.contains("\"localFileSystem\":true"));
        assert_eq!(BackupRequest::decode(json.as_bytes()).unwrap(), request);
    }

    #[test]
    fn malformed_request_is_serialization_error() {
        let err = BackupRequest::decode(b"{\"targetDirectory\": 7}").unwrap_err();
        assert!(matches!(err, crate::Error::Serialization { .. }));
    }
}
