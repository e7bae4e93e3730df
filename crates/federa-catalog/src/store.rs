//! Durable catalog state and the atomic commit boundary.
//!
//! A [`CatalogStore`] keeps one [`TableRecord`] per table and replaces it as a
//! whole on every commit: readers observe the record before a sync or the
//! record after it, never a mixture. Commits carry the version the reconciler
//! read; a store that has moved on rejects the commit with
//! [`CatalogError::Commit`] and keeps its current record.
//!
//! Two implementations are provided:
//! - [`MemoryCatalogStore`]: copy-on-write map, for tests and embedded use
//! - [`ObjectCatalogStore`]: one JSON object per table on a [`StorageBackend`],
//!   committed with conditional writes

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use federa_core::storage::{StorageBackend, WritePrecondition, WriteResult};
use federa_core::TableId;

use crate::error::{CatalogError, Result};
use crate::partition::PartitionMap;
use crate::reconciler::TableChange;
use crate::table::TableDefinition;

/// The catalog's persisted state of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    /// Table the record describes.
    pub table_id: TableId,
    /// Table-level attributes.
    pub definition: TableDefinition,
    /// Partitions keyed by spec.
    #[serde(with = "sorted_partitions")]
    pub partitions: PartitionMap,
    /// Commit counter, starting at 1.
    pub version: u64,
    /// When the record was committed.
    pub committed_at: DateTime<Utc>,
}

impl TableRecord {
    /// Builds the record that results from committing `change` on top of `previous`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Commit`] when there is no previous record and
    /// the change carries no definition to create one from.
    pub fn apply(
        previous: Option<&TableRecord>,
        table_id: &TableId,
        change: TableChange,
    ) -> Result<TableRecord> {
        let TableChange {
            definition,
            partitions: changes,
        } = change;

        let (definition, mut partitions, version) = match (previous, definition) {
            (Some(prev), def) => (
                def.unwrap_or_else(|| prev.definition.clone()),
                prev.partitions.clone(),
                prev.version + 1,
            ),
            (None, Some(def)) => (def, PartitionMap::new(), 1),
            (None, None) => {
                return Err(CatalogError::commit(format!(
                    "table {table_id} does not exist and the change has no definition"
                )));
            }
        };

        for spec in &changes.removed {
            partitions.remove(spec);
        }
        for partition in changes.added.into_iter().chain(changes.updated) {
            partitions.insert(partition.spec().to_string(), partition);
        }

        Ok(TableRecord {
            table_id: table_id.clone(),
            definition,
            partitions,
            version,
            committed_at: Utc::now(),
        })
    }
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Version of the newly committed record.
    pub version: u64,
    /// When the record was committed.
    pub committed_at: DateTime<Utc>,
}

/// Durable catalog storage with atomic per-table commits.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Loads the committed record of a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn load_table(&self, table: &TableId) -> Result<Option<TableRecord>>;

    /// Atomically commits a change on top of the record at `expected_version`
    /// (`None` when the table is expected not to exist yet).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Commit`] if the stored version differs or the
    /// write is rejected. Nothing is written in that case.
    async fn apply_change_set(
        &self,
        table: &TableId,
        expected_version: Option<u64>,
        change: TableChange,
    ) -> Result<CommitOutcome>;

    /// Removes a table. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn drop_table(&self, table: &TableId) -> Result<bool>;

    /// Lists the tables with a committed record, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    async fn list_tables(&self) -> Result<Vec<TableId>>;
}

fn check_version(table: &TableId, stored: Option<u64>, expected: Option<u64>) -> Result<()> {
    if stored == expected {
        return Ok(());
    }
    let show = |v: Option<u64>| v.map_or_else(|| "absent".to_string(), |v| format!("v{v}"));
    Err(CatalogError::commit(format!(
        "table {table} is at {} but the change was computed against {}",
        show(stored),
        show(expected)
    )))
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory catalog store.
///
/// The next record is built in full and swapped in under the write lock.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalogStore {
    tables: Arc<RwLock<HashMap<TableId, Arc<TableRecord>>>>,
}

impl MemoryCatalogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> CatalogError {
    CatalogError::Storage {
        message: "catalog store lock poisoned".to_string(),
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn load_table(&self, table: &TableId) -> Result<Option<TableRecord>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(tables.get(table).map(|record| record.as_ref().clone()))
    }

    async fn apply_change_set(
        &self,
        table: &TableId,
        expected_version: Option<u64>,
        change: TableChange,
    ) -> Result<CommitOutcome> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let previous = tables.get(table).cloned();
        check_version(table, previous.as_ref().map(|r| r.version), expected_version)?;

        let next = TableRecord::apply(previous.as_deref(), table, change)?;
        let outcome = CommitOutcome {
            version: next.version,
            committed_at: next.committed_at,
        };
        tables.insert(table.clone(), Arc::new(next));
        Ok(outcome)
    }

    async fn drop_table(&self, table: &TableId) -> Result<bool> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        Ok(tables.remove(table).is_some())
    }

    async fn list_tables(&self) -> Result<Vec<TableId>> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let mut ids: Vec<TableId> = tables.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

// ============================================================================
// Object storage store
// ============================================================================

/// Prefix under which table records are stored.
pub const TABLES_PREFIX: &str = "tables/";

/// Catalog store backed by object storage.
///
/// Each table is one JSON object at `tables/{db}/{table}.json`. A commit is a
/// single conditional put against the storage version read at commit time.
pub struct ObjectCatalogStore<S: StorageBackend + ?Sized> {
    storage: Arc<S>,
}

impl<S: StorageBackend + ?Sized> Clone for ObjectCatalogStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: StorageBackend + ?Sized> std::fmt::Debug for ObjectCatalogStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCatalogStore")
            .field("storage", &"StorageBackend")
            .finish()
    }
}

impl<S: StorageBackend + ?Sized> ObjectCatalogStore<S> {
    /// Creates a store on top of a storage backend.
    #[must_use]
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Returns the object path of a table record.
    #[must_use]
    pub fn table_path(table: &TableId) -> String {
        format!(
            "{TABLES_PREFIX}{}/{}.json",
            table.db_name(),
            table.table_name()
        )
    }

    fn parse_table_path(path: &str) -> Option<TableId> {
        let rest = path.strip_prefix(TABLES_PREFIX)?.strip_suffix(".json")?;
        let (db, table) = rest.split_once('/')?;
        TableId::new(db, table).ok()
    }

    async fn read_record(&self, path: &str) -> Result<Option<(TableRecord, String)>> {
        let Some(meta) = self.storage.head(path).await? else {
            return Ok(None);
        };
        let bytes = match self.storage.get(path).await {
            Ok(bytes) => bytes,
            Err(federa_core::Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&bytes).map_err(|e| CatalogError::Serialization {
            message: format!("failed to parse table record at '{path}': {e}"),
        })?;
        Ok(Some((record, meta.version)))
    }
}

#[async_trait]
impl<S: StorageBackend + ?Sized> CatalogStore for ObjectCatalogStore<S> {
    async fn load_table(&self, table: &TableId) -> Result<Option<TableRecord>> {
        Ok(self
            .read_record(&Self::table_path(table))
            .await?
            .map(|(record, _)| record))
    }

    async fn apply_change_set(
        &self,
        table: &TableId,
        expected_version: Option<u64>,
        change: TableChange,
    ) -> Result<CommitOutcome> {
        let path = Self::table_path(table);
        let current = self.read_record(&path).await?;
        check_version(
            table,
            current.as_ref().map(|(r, _)| r.version),
            expected_version,
        )?;

        let (previous, precondition) = match current {
            Some((record, storage_version)) => (
                Some(record),
                WritePrecondition::MatchesVersion(storage_version),
            ),
            None => (None, WritePrecondition::DoesNotExist),
        };

        let next = TableRecord::apply(previous.as_ref(), table, change)?;
        let bytes = Bytes::from(serde_json::to_vec(&next)?);

        match self.storage.put(&path, bytes, precondition).await? {
            WriteResult::Success { .. } => Ok(CommitOutcome {
                version: next.version,
                committed_at: next.committed_at,
            }),
            WriteResult::PreconditionFailed { current_version } => {
                Err(CatalogError::commit(format!(
                    "concurrent write to {path} (storage version now {current_version})"
                )))
            }
        }
    }

    async fn drop_table(&self, table: &TableId) -> Result<bool> {
        let path = Self::table_path(table);
        if self.storage.head(&path).await?.is_none() {
            return Ok(false);
        }
        self.storage.delete(&path).await?;
        Ok(true)
    }

    async fn list_tables(&self) -> Result<Vec<TableId>> {
        let mut ids: Vec<TableId> = self
            .storage
            .list(TABLES_PREFIX)
            .await?
            .iter()
            .filter_map(|meta| Self::parse_table_path(&meta.path))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Serializes partitions as a spec-sorted list so equal records encode to equal bytes.
mod sorted_partitions {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::partition::{partition_map, PartitionMap, UdbPartition};

    pub(super) fn serialize<S: Serializer>(map: &PartitionMap, s: S) -> Result<S::Ok, S::Error> {
        let mut partitions: Vec<&UdbPartition> = map.values().collect();
        partitions.sort_unstable_by(|a, b| a.spec().cmp(b.spec()));
        partitions.serialize(s)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<PartitionMap, D::Error> {
        let partitions = Vec::<UdbPartition>::deserialize(d)?;
        partition_map(partitions).map_err(serde::de::Error::custom)
    }
}
