//! Catalog store wrapper with commit recording and failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use federa_catalog::error::{CatalogError, Result};
use federa_catalog::reconciler::TableChange;
use federa_catalog::store::{CatalogStore, CommitOutcome, MemoryCatalogStore, TableRecord};
use federa_core::TableId;

/// A [`MemoryCatalogStore`] that counts commits and can reject them.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: MemoryCatalogStore,
    commits: Arc<AtomicUsize>,
    rejected: Arc<AtomicUsize>,
    fail_commits: Arc<AtomicBool>,
}

impl RecordingStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following commit fail (or succeed again).
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of commits that reached the inner store.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of commits rejected by injection.
    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for RecordingStore {
    async fn load_table(&self, table: &TableId) -> Result<Option<TableRecord>> {
        self.inner.load_table(table).await
    }

    async fn apply_change_set(
        &self,
        table: &TableId,
        expected_version: Option<u64>,
        change: TableChange,
    ) -> Result<CommitOutcome> {
        if self.fail_commits.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(CatalogError::commit("injected commit failure"));
        }
        let outcome = self
            .inner
            .apply_change_set(table, expected_version, change)
            .await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(outcome)
    }

    async fn drop_table(&self, table: &TableId) -> Result<bool> {
        self.inner.drop_table(table).await
    }

    async fn list_tables(&self) -> Result<Vec<TableId>> {
        self.inner.list_tables().await
    }
}
