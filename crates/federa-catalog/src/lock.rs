//! Per-table reconciliation locks.
//!
//! At most one reconciliation of a given table runs at a time; reconciliations
//! of different tables never wait on each other. Each table gets its own
//! `tokio` mutex, created on first use and removed when the last guard is
//! released with nobody waiting. The registry map is locked only long enough
//! to look up, insert or remove that mutex, never across a fetch or commit.
//!
//! # Example
//!
//! ```rust,ignore
//! let locks = TableLocks::new();
//!
//! let guard = locks.acquire(&table_id).await;
//! // fetch, diff, and commit while holding the guard
//! drop(guard);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use federa_core::{HolderId, TableId};

type LockMap = Arc<Mutex<HashMap<TableId, Arc<AsyncMutex<()>>>>>;

/// Who holds a table lock and since when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockInfo {
    /// Locked table.
    pub table_id: TableId,
    /// Unique holder id.
    pub holder_id: HolderId,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn new(table_id: TableId) -> Self {
        Self {
            table_id,
            holder_id: HolderId::generate(),
            acquired_at: Utc::now(),
        }
    }

    /// Time the lock has been held so far.
    #[must_use]
    pub fn held_for(&self) -> chrono::Duration {
        Utc::now() - self.acquired_at
    }
}

/// Held lock on one table. Dropping the guard releases it.
#[derive(Debug)]
pub struct TableLockGuard {
    info: LockInfo,
    registry: LockMap,
    guard: OwnedMutexGuard<()>,
}

impl TableLockGuard {
    /// Returns the holder information.
    #[must_use]
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    /// Returns the locked table.
    #[must_use]
    pub fn table_id(&self) -> &TableId {
        &self.info.table_id
    }
}

impl Drop for TableLockGuard {
    fn drop(&mut self) {
        // New holders clone the mutex under the map lock, so a count of two
        // (the map and this guard) cannot grow while we hold it.
        let mut tables = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = tables.get(&self.info.table_id).is_some_and(|mutex| {
            Arc::ptr_eq(mutex, OwnedMutexGuard::mutex(&self.guard))
                && Arc::strong_count(mutex) == 2
        });
        if idle {
            tables.remove(&self.info.table_id);
        }
        drop(tables);
        tracing::trace!(
            table = %self.info.table_id,
            holder_id = %self.info.holder_id,
            "released table lock"
        );
    }
}

/// Registry of per-table locks.
///
/// Cloning yields a handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    tables: LockMap,
}

impl TableLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex_for(&self, table: &TableId) -> Arc<AsyncMutex<()>> {
        // A poisoned map still holds valid mutexes; keep using it.
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(tables.entry(table.clone()).or_default())
    }

    fn guard(&self, table: &TableId, guard: OwnedMutexGuard<()>) -> TableLockGuard {
        let info = LockInfo::new(table.clone());
        tracing::trace!(table = %table, holder_id = %info.holder_id, "acquired table lock");
        TableLockGuard {
            info,
            registry: Arc::clone(&self.tables),
            guard,
        }
    }

    /// Acquires the lock for a table, waiting for the current holder.
    pub async fn acquire(&self, table: &TableId) -> TableLockGuard {
        let guard = self.mutex_for(table).lock_owned().await;
        self.guard(table, guard)
    }

    /// Acquires the lock for a table if nobody holds it.
    #[must_use]
    pub fn try_acquire(&self, table: &TableId) -> Option<TableLockGuard> {
        let mutex = self.mutex_for(table);
        match mutex.try_lock_owned() {
            Ok(guard) => Some(self.guard(table, guard)),
            Err(_) => None,
        }
    }

    /// Returns true if a reconciliation currently holds the table's lock.
    #[must_use]
    pub fn is_locked(&self, table: &TableId) -> bool {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .is_some_and(|mutex| mutex.try_lock().is_err())
    }

    /// Number of tables whose lock is held or awaited.
    #[must_use]
    pub fn tracked_tables(&self) -> usize {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
