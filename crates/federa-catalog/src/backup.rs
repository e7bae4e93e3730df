//! Catalog backups.
//!
//! A backup copies every committed [`TableRecord`](crate::store::TableRecord)
//! to `{target}/backup-{id}/{db}/{table}.json` and finishes with a
//! `_manifest.json` listing what was written. Each record is read while its
//! table lock is held, so a backup never captures a record mid-commit and
//! never races a running reconciliation of that table.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use federa_core::observability::backup_span;
use federa_core::{
    BackupId, BackupRequest, BackupResponse, StorageBackend, TableId, WritePrecondition,
    WriteResult,
};

use crate::config::SyncConfig;
use crate::error::{CatalogError, Result};
use crate::lock::TableLocks;
use crate::metrics;
use crate::store::CatalogStore;

/// Name of the manifest object written last in every backup directory.
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Summary written alongside the table records of a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupManifest {
    /// Backup id.
    pub backup_id: BackupId,
    /// When the backup started.
    pub created_at: DateTime<Utc>,
    /// Tables written, with the record version captured.
    pub tables: Vec<BackupEntry>,
    /// Tables skipped because a reconciliation held them.
    #[serde(default)]
    pub skipped: Vec<TableId>,
}

/// One table record captured by a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// Table id.
    pub table_id: TableId,
    /// Record version at backup time.
    pub version: u64,
    /// Object path of the record copy.
    pub path: String,
}

/// Takes backups of a catalog store.
pub struct BackupCoordinator {
    store: Arc<dyn CatalogStore>,
    locks: TableLocks,
    storage: Arc<dyn StorageBackend>,
    local_storage: Option<Arc<dyn StorageBackend>>,
    config: SyncConfig,
}

impl std::fmt::Debug for BackupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupCoordinator")
            .field("has_local_storage", &self.local_storage.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackupCoordinator {
    /// Creates a coordinator.
    ///
    /// `locks` must be the registry used by the sync services writing to `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        locks: TableLocks,
        storage: Arc<dyn StorageBackend>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            locks,
            storage,
            local_storage: None,
            config,
        }
    }

    /// Sets the storage used for requests with `local_file_system` set.
    #[must_use]
    pub fn with_local_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.local_storage = Some(storage);
        self
    }

    /// Snapshots every table of the catalog.
    ///
    /// Without `skip_in_flight` the backup waits for each in-flight
    /// reconciliation to finish; with it, those tables are left out and
    /// listed in the response.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidInput`] if the request names no directory and
    ///   none is configured, or asks for local storage that is not configured
    /// - storage errors from reading the catalog or writing the backup
    pub async fn take_backup(&self, request: &BackupRequest) -> Result<BackupResponse> {
        let options = request.effective_options();
        let target = request
            .target_directory
            .as_deref()
            .or(self.config.default_backup_dir.as_deref())
            .map(|dir| dir.trim_end_matches('/'))
            .filter(|dir| !dir.is_empty())
            .ok_or_else(|| CatalogError::InvalidInput {
                message: "backup request has no target directory and no default is configured"
                    .to_string(),
            })?;

        let storage = if options.local_file_system {
            self.local_storage
                .as_ref()
                .ok_or_else(|| CatalogError::InvalidInput {
                    message: "local file system backup requested but no local storage is configured"
                        .to_string(),
                })?
        } else {
            &self.storage
        };

        let backup_id = BackupId::generate();
        let prefix = format!("{target}/backup-{backup_id}");
        let span = backup_span(&backup_id.to_string(), &prefix);

        async {
            let mut manifest = BackupManifest {
                backup_id,
                created_at: Utc::now(),
                tables: Vec::new(),
                skipped: Vec::new(),
            };

            for table in self.store.list_tables().await? {
                let guard = if options.skip_in_flight {
                    match self.locks.try_acquire(&table) {
                        Some(guard) => guard,
                        None => {
                            tracing::info!(table = %table, "skipping table with sync in flight");
                            manifest.skipped.push(table);
                            continue;
                        }
                    }
                } else {
                    self.locks.acquire(&table).await
                };

                // Dropped by a sync between listing and locking.
                let Some(record) = self.store.load_table(&table).await? else {
                    continue;
                };
                drop(guard);

                let path = format!("{prefix}/{}/{}.json", table.db_name(), table.table_name());
                let bytes = Bytes::from(serde_json::to_vec(&record)?);
                write_new(storage.as_ref(), &path, bytes).await?;
                manifest.tables.push(BackupEntry {
                    table_id: table,
                    version: record.version,
                    path,
                });
            }

            let manifest_bytes = Bytes::from(serde_json::to_vec(&manifest)?);
            write_new(storage.as_ref(), &format!("{prefix}/{MANIFEST_FILE}"), manifest_bytes)
                .await?;

            metrics::record_backup(manifest.tables.len(), manifest.skipped.len());
            tracing::info!(
                entries = manifest.tables.len(),
                skipped = manifest.skipped.len(),
                "backup complete"
            );

            Ok(BackupResponse {
                backup_uri: prefix.clone(),
                entry_count: manifest.tables.len(),
                skipped_tables: manifest.skipped.iter().map(ToString::to_string).collect(),
            })
        }
        .instrument(span)
        .await
    }
}

async fn write_new(storage: &dyn StorageBackend, path: &str, bytes: Bytes) -> Result<()> {
    match storage.put(path, bytes, WritePrecondition::DoesNotExist).await? {
        WriteResult::Success { .. } => Ok(()),
        WriteResult::PreconditionFailed { .. } => Err(CatalogError::Storage {
            message: format!("backup object '{path}' already exists"),
        }),
    }
}
