//! Sync and backup metrics.
//!
//! These complement the structured logging emitted on the sync path.

use metrics::{counter, describe_counter, describe_histogram, histogram};

use crate::reconciler::ChangeCounts;

// ============================================================================
// Sync Metrics
// ============================================================================

/// Table syncs by outcome.
pub const SYNC_TOTAL: &str = "federa_sync_total";

/// Partitions written by syncs, by change kind.
pub const SYNC_PARTITIONS_CHANGED: &str = "federa_sync_partitions_changed_total";

/// Duration of one table sync.
pub const SYNC_DURATION: &str = "federa_sync_duration_seconds";

/// Commits rejected by the catalog store.
pub const COMMIT_FAILURES: &str = "federa_commit_failures_total";

// ============================================================================
// Backup Metrics
// ============================================================================

/// Table records written to backups.
pub const BACKUP_ENTRIES: &str = "federa_backup_entries_total";

/// Tables skipped by backups because a sync held them.
pub const BACKUP_SKIPPED: &str = "federa_backup_skipped_total";

/// Registers all metric descriptions.
///
/// Call this once at application startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(SYNC_TOTAL, "Total table syncs by outcome");
    describe_counter!(
        SYNC_PARTITIONS_CHANGED,
        "Total partitions added, removed or updated by syncs"
    );
    describe_histogram!(SYNC_DURATION, "Duration of table syncs in seconds");
    describe_counter!(COMMIT_FAILURES, "Total commits rejected by the catalog store");
    describe_counter!(BACKUP_ENTRIES, "Total table records written to backups");
    describe_counter!(BACKUP_SKIPPED, "Total tables skipped by backups");
}

/// Records the end of one table sync.
pub fn record_sync(outcome: &'static str, duration_secs: f64) {
    counter!(SYNC_TOTAL, "outcome" => outcome).increment(1);
    histogram!(SYNC_DURATION, "outcome" => outcome).record(duration_secs);
}

/// Records the partition writes of a committed sync.
pub fn record_partition_changes(counts: &ChangeCounts) {
    for (kind, n) in [
        ("added", counts.added),
        ("removed", counts.removed),
        ("updated", counts.updated),
    ] {
        if n > 0 {
            counter!(SYNC_PARTITIONS_CHANGED, "kind" => kind)
                .increment(u64::try_from(n).unwrap_or(u64::MAX));
        }
    }
}

/// Records a rejected commit.
pub fn record_commit_failure() {
    counter!(COMMIT_FAILURES).increment(1);
}

/// Records a finished backup.
pub fn record_backup(entries: usize, skipped: usize) {
    counter!(BACKUP_ENTRIES).increment(u64::try_from(entries).unwrap_or(u64::MAX));
    counter!(BACKUP_SKIPPED).increment(u64::try_from(skipped).unwrap_or(u64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_is_a_noop() {
        register_metrics();
        record_sync("committed", 0.25);
        record_partition_changes(&ChangeCounts {
            added: 2,
            removed: 0,
            updated: 1,
            unchanged: 4,
        });
        record_commit_failure();
        record_backup(3, 1);
    }

    #[test]
    fn metric_names_share_the_federa_prefix() {
        for name in [
            SYNC_TOTAL,
            SYNC_PARTITIONS_CHANGED,
            SYNC_DURATION,
            COMMIT_FAILURES,
            BACKUP_ENTRIES,
            BACKUP_SKIPPED,
        ] {
            assert!(name.starts_with("federa_"), "{name}");
        }
    }
}
