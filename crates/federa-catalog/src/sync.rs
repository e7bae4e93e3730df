//! Sync service: drives reconciliation of one database's tables.
//!
//! A table sync runs under that table's lock:
//!
//! 1. fetch a fresh snapshot from the connector, bounded by the fetch timeout
//! 2. load the catalog's record of the table
//! 3. diff the two (see [`crate::reconciler`])
//! 4. commit the change as one atomic transaction, unless it is a no-op
//!
//! Any failure aborts only the table it concerns and leaves the catalog as it
//! was. Failed tables are not retried here; the next scheduled cycle picks
//! them up.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::Instrument;

use federa_core::observability::sync_span;
use federa_core::TableId;

use crate::config::SyncConfig;
use crate::error::{CatalogError, Result};
use crate::lock::{TableLockGuard, TableLocks};
use crate::metrics;
use crate::reconciler::{diff_table, ChangeCounts};
use crate::store::CatalogStore;
use crate::udb::UnderDatabase;

/// What a table sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A change was committed, producing this record version.
    Committed {
        /// Version of the committed record.
        version: u64,
    },
    /// The snapshot matched the catalog; nothing was written.
    Unchanged,
    /// The table no longer exists upstream and was dropped from the catalog.
    TableRemoved,
    /// Another reconciliation of the table was in flight.
    Skipped,
}

impl SyncOutcome {
    /// Short label used for metrics and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Committed { .. } => "committed",
            Self::Unchanged => "unchanged",
            Self::TableRemoved => "removed",
            Self::Skipped => "skipped",
        }
    }
}

/// Result of one successful table sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Synced table.
    pub table: TableId,
    /// What the sync did.
    pub outcome: SyncOutcome,
    /// Partition classification of the diff.
    pub changes: ChangeCounts,
    /// Wall time of the sync, including lock wait.
    pub duration: Duration,
}

/// A table whose sync failed.
#[derive(Debug)]
pub struct TableSyncFailure {
    /// Table name within the database.
    pub table_name: String,
    /// Why the sync failed.
    pub error: CatalogError,
}

/// Per-table results of a database sync, each list sorted by table name.
#[derive(Debug, Default)]
pub struct DatabaseSyncReport {
    /// Tables that synced.
    pub succeeded: Vec<SyncReport>,
    /// Tables that failed.
    pub failed: Vec<TableSyncFailure>,
}

impl DatabaseSyncReport {
    /// Returns true when every table synced.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of tables with a committed change.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.succeeded
            .iter()
            .filter(|r| matches!(r.outcome, SyncOutcome::Committed { .. }))
            .count()
    }
}

/// Reconciles the tables of one connector's database into a catalog store.
pub struct SyncService {
    udb: Arc<dyn UnderDatabase>,
    store: Arc<dyn CatalogStore>,
    locks: TableLocks,
    config: SyncConfig,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("udb_type", &self.udb.udb_type())
            .field("database", &self.udb.database_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SyncService {
    /// Creates a service with its own lock registry.
    #[must_use]
    pub fn new(
        udb: Arc<dyn UnderDatabase>,
        store: Arc<dyn CatalogStore>,
        config: SyncConfig,
    ) -> Self {
        Self::with_locks(udb, store, config, TableLocks::new())
    }

    /// Creates a service sharing an existing lock registry, so that other
    /// services and backups on the same store serialize with it.
    #[must_use]
    pub fn with_locks(
        udb: Arc<dyn UnderDatabase>,
        store: Arc<dyn CatalogStore>,
        config: SyncConfig,
        locks: TableLocks,
    ) -> Self {
        Self {
            udb,
            store,
            locks,
            config,
        }
    }

    /// Returns the lock registry.
    #[must_use]
    pub fn locks(&self) -> &TableLocks {
        &self.locks
    }

    /// Returns the catalog store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn table_id(&self, table_name: &str) -> Result<TableId> {
        Ok(TableId::new(self.udb.database_name(), table_name)?)
    }

    /// Syncs one table, waiting for any reconciliation of it already in flight.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the sync. The catalog is unchanged.
    pub async fn sync_table(&self, table_name: &str) -> Result<SyncReport> {
        let table = self.table_id(table_name)?;
        let span = sync_span("sync_table", table.db_name(), table.table_name());
        async {
            let started = Instant::now();
            let guard = self.locks.acquire(&table).await;
            let result = self.sync_locked(&guard, started).await;
            drop(guard);
            self.finish(&table, started, result)
        }
        .instrument(span)
        .await
    }

    /// Syncs one table unless a reconciliation of it is already in flight,
    /// in which case the outcome is [`SyncOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the sync. The catalog is unchanged.
    pub async fn try_sync_table(&self, table_name: &str) -> Result<SyncReport> {
        let table = self.table_id(table_name)?;
        let span = sync_span("try_sync_table", table.db_name(), table.table_name());
        async {
            let started = Instant::now();
            let Some(guard) = self.locks.try_acquire(&table) else {
                tracing::debug!("sync already in flight");
                let skipped = report(
                    table.clone(),
                    SyncOutcome::Skipped,
                    ChangeCounts::default(),
                    started,
                );
                return self.finish(&table, started, Ok(skipped));
            };
            let result = self.sync_locked(&guard, started).await;
            drop(guard);
            self.finish(&table, started, result)
        }
        .instrument(span)
        .await
    }

    async fn sync_locked(&self, guard: &TableLockGuard, started: Instant) -> Result<SyncReport> {
        let table = guard.table_id();
        let fetch = self.udb.fetch_table(table.table_name());
        let fetched = tokio::time::timeout(self.config.fetch_timeout(), fetch)
            .await
            .map_err(|_| CatalogError::Cancelled {
                message: format!(
                    "fetching {table} took longer than {}s",
                    self.config.fetch_timeout_secs
                ),
            })?;

        let snapshot = match fetched {
            Ok(snapshot) => snapshot,
            Err(CatalogError::NotFound { .. }) => {
                let outcome = if self.store.drop_table(table).await? {
                    tracing::info!("table removed upstream, dropped from catalog");
                    SyncOutcome::TableRemoved
                } else {
                    SyncOutcome::Unchanged
                };
                return Ok(report(table.clone(), outcome, ChangeCounts::default(), started));
            }
            Err(e) => return Err(e),
        };

        if snapshot.name() != table.table_name() {
            return Err(CatalogError::InvalidTable {
                message: format!(
                    "connector returned table '{}' when asked for '{}'",
                    snapshot.name(),
                    table.table_name()
                ),
            });
        }

        let previous = self.store.load_table(table).await?;
        let change = diff_table(previous.as_ref(), &snapshot);
        let counts = change.partitions.counts();

        if change.is_noop() {
            tracing::debug!(unchanged = counts.unchanged, "table unchanged");
            return Ok(report(table.clone(), SyncOutcome::Unchanged, counts, started));
        }

        let expected_version = previous.as_ref().map(|record| record.version);
        let commit = self
            .store
            .apply_change_set(table, expected_version, change)
            .await?;

        metrics::record_partition_changes(&counts);
        tracing::info!(
            version = commit.version,
            added = counts.added,
            removed = counts.removed,
            updated = counts.updated,
            unchanged = counts.unchanged,
            "committed table sync"
        );
        Ok(report(
            table.clone(),
            SyncOutcome::Committed {
                version: commit.version,
            },
            counts,
            started,
        ))
    }

    fn finish(
        &self,
        table: &TableId,
        started: Instant,
        result: Result<SyncReport>,
    ) -> Result<SyncReport> {
        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(report) => metrics::record_sync(report.outcome.label(), elapsed),
            Err(e) => {
                if matches!(e, CatalogError::Commit { .. }) {
                    metrics::record_commit_failure();
                }
                if e.is_data_quality() {
                    tracing::warn!(table = %table, error = %e, "skipping table with malformed metadata");
                } else {
                    tracing::error!(table = %table, error = %e, kind = e.kind(), "table sync failed");
                }
                metrics::record_sync("failed", elapsed);
            }
        }
        result
    }

    /// Syncs every table of the database.
    ///
    /// Tables listed upstream are synced along with tables the catalog still
    /// holds for this database, so tables deleted upstream are dropped. At
    /// most `max_parallel_syncs` tables are in flight; one table's failure
    /// does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns an error only if the table lists cannot be obtained.
    pub async fn sync_database(&self) -> Result<DatabaseSyncReport> {
        let database = self.udb.database_name();
        let mut names: BTreeSet<String> = self.udb.table_names().await?.into_iter().collect();
        names.extend(
            self.store
                .list_tables()
                .await?
                .into_iter()
                .filter(|id| id.db_name() == database)
                .map(|id| id.table_name().to_string()),
        );

        tracing::info!(database, tables = names.len(), "starting database sync");

        let results: Vec<(String, Result<SyncReport>)> = stream::iter(names)
            .map(|name| async move {
                let result = self.sync_table(&name).await;
                (name, result)
            })
            .buffer_unordered(self.config.max_parallel_syncs.max(1))
            .collect()
            .await;

        let mut report = DatabaseSyncReport::default();
        for (table_name, result) in results {
            match result {
                Ok(table_report) => report.succeeded.push(table_report),
                Err(error) => report.failed.push(TableSyncFailure { table_name, error }),
            }
        }
        report.succeeded.sort_by(|a, b| a.table.cmp(&b.table));
        report.failed.sort_by(|a, b| a.table_name.cmp(&b.table_name));

        tracing::info!(
            database,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            committed = report.committed_count(),
            "finished database sync"
        );
        Ok(report)
    }
}

fn report(table: TableId, outcome: SyncOutcome, changes: ChangeCounts, started: Instant) -> SyncReport {
    SyncReport {
        table,
        outcome,
        changes,
        duration: started.elapsed(),
    }
}
