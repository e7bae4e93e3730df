//! # federa-catalog
//!
//! Catalog federation core for Federa.
//!
//! Federa mirrors the tables of external metastores ("under databases") into
//! its own catalog and keeps them current with incremental syncs. This crate
//! provides:
//!
//! - **Table model**: [`UdbTable`], [`UdbPartition`], [`Schema`], and
//!   column statistics, validated when built and immutable afterwards
//! - **Layouts**: opaque `{type, bytes}` storage descriptors decoded by
//!   registered [`LayoutCodec`]s (Hive built in)
//! - **Connectors**: the [`UnderDatabase`] trait and a factory registry
//! - **Reconciliation**: the diff between a fresh snapshot and the catalog
//! - **Catalog store**: atomic per-table commits, in memory or on object storage
//! - **Sync service**: per-table locking, fetch timeouts, bounded parallelism
//! - **Backups**: lock-aware snapshots of every committed table record
//!
//! ## Sync cycle
//!
//! ```text
//! UnderDatabase::fetch_table ──► diff_table(previous, snapshot) ──► CatalogStore::apply_change_set
//!        (under the table lock, bounded by the fetch timeout)          (one atomic commit)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use federa_catalog::prelude::*;
//!
//! let store: Arc<dyn CatalogStore> = Arc::new(MemoryCatalogStore::new());
//! let service = SyncService::new(udb, store, SyncConfig::from_env()?);
//!
//! let report = service.sync_database().await?;
//! for failure in &report.failed {
//!     tracing::warn!(table = %failure.table_name, error = %failure.error, "sync failed");
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod backup;
pub mod config;
pub mod error;
pub mod layout;
pub mod lock;
pub mod metrics;
pub mod partition;
pub mod reconciler;
pub mod schema;
pub mod statistics;
pub mod store;
pub mod sync;
pub mod table;
pub mod udb;

// Re-export main types at crate root
pub use backup::{BackupCoordinator, BackupEntry, BackupManifest};
pub use config::SyncConfig;
pub use error::{CatalogError, Result};
pub use layout::hive::{HiveLayout, HiveLayoutCodec, PartitionInfo};
pub use layout::{Layout, LayoutCodec, LayoutRegistry, TransformOutcome, TransformSpec};
pub use lock::{LockInfo, TableLockGuard, TableLocks};
pub use partition::{PartitionMap, UdbPartition};
pub use reconciler::{diff_table, reconcile, ChangeCounts, ChangeSet, TableChange};
pub use schema::{FieldSchema, Schema, SchemaError};
pub use statistics::{ColumnStatistics, ColumnStatisticsData, ColumnStatisticsSet, StatisticsError};
pub use store::{CatalogStore, CommitOutcome, MemoryCatalogStore, ObjectCatalogStore, TableRecord};
pub use sync::{DatabaseSyncReport, SyncOutcome, SyncReport, SyncService, TableSyncFailure};
pub use table::{TableDefinition, UdbTable};
pub use udb::{UdbConfig, UdbFactory, UdbRegistry, UnderDatabase};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backup::BackupCoordinator;
    pub use crate::config::SyncConfig;
    pub use crate::error::{CatalogError, Result};
    pub use crate::layout::{Layout, LayoutRegistry};
    pub use crate::store::{CatalogStore, MemoryCatalogStore, ObjectCatalogStore};
    pub use crate::sync::{SyncOutcome, SyncService};
    pub use crate::table::UdbTable;
    pub use crate::udb::UnderDatabase;
}
