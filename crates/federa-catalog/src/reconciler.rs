//! Incremental sync: diffing a fresh table snapshot against catalog state.
//!
//! Partitions are paired by spec with one hash lookup per partition, so a
//! reconciliation is `O(|previous| + |current|)`. A partition present on both
//! sides is `updated` when its layout `(type, bytes)` or its statistics differ;
//! layouts are never compared by their spec. Unchanged partitions produce no
//! writes.
//!
//! Table-level attributes are compared as one value: any difference replaces
//! the whole [`TableDefinition`].

use serde::Serialize;

use crate::partition::{PartitionMap, UdbPartition};
use crate::store::TableRecord;
use crate::table::{TableDefinition, UdbTable};

/// Classification of a table's partitions after a reconciliation.
///
/// Every list is sorted by spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Partitions present only in the fresh snapshot.
    pub added: Vec<UdbPartition>,
    /// Specs present only in the catalog.
    pub removed: Vec<String>,
    /// Partitions present on both sides whose layout or statistics differ.
    pub updated: Vec<UdbPartition>,
    /// Specs present on both sides with identical layout and statistics.
    pub unchanged: Vec<String>,
}

impl ChangeSet {
    /// Returns true when nothing needs to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Number of partition writes this change set causes.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }

    /// Specs of added partitions.
    #[must_use]
    pub fn added_specs(&self) -> Vec<&str> {
        self.added.iter().map(UdbPartition::spec).collect()
    }

    /// Specs of updated partitions.
    #[must_use]
    pub fn updated_specs(&self) -> Vec<&str> {
        self.updated.iter().map(UdbPartition::spec).collect()
    }

    /// Returns the size of each class.
    #[must_use]
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            removed: self.removed.len(),
            updated: self.updated.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Sizes of the classes of a [`ChangeSet`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeCounts {
    /// Added partitions.
    pub added: usize,
    /// Removed partitions.
    pub removed: usize,
    /// Updated partitions.
    pub updated: usize,
    /// Unchanged partitions.
    pub unchanged: usize,
}

/// Everything one sync commits for a table, as a single transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableChange {
    /// Replacement table-level record; `None` keeps the stored one.
    pub definition: Option<TableDefinition>,
    /// Partition changes.
    pub partitions: ChangeSet,
}

impl TableChange {
    /// Returns true when committing this change would write nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.definition.is_none() && self.partitions.is_empty()
    }
}

/// Diffs two partition maps keyed by spec.
#[must_use]
pub fn reconcile(previous: &PartitionMap, current: &PartitionMap) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (spec, partition) in current {
        match previous.get(spec) {
            None => changes.added.push(partition.clone()),
            Some(old) if old.same_content(partition) => changes.unchanged.push(spec.clone()),
            Some(_) => changes.updated.push(partition.clone()),
        }
    }
    for spec in previous.keys() {
        if !current.contains_key(spec) {
            changes.removed.push(spec.clone());
        }
    }

    changes.added.sort_unstable_by(|a, b| a.spec().cmp(b.spec()));
    changes.updated.sort_unstable_by(|a, b| a.spec().cmp(b.spec()));
    changes.removed.sort_unstable();
    changes.unchanged.sort_unstable();
    changes
}

/// Diffs a fresh snapshot against the catalog's record of the same table.
///
/// With no previous record every partition is added and the definition is new.
#[must_use]
pub fn diff_table(previous: Option<&TableRecord>, current: &UdbTable) -> TableChange {
    let empty = PartitionMap::new();
    let (previous_definition, previous_partitions) = match previous {
        Some(record) => (Some(&record.definition), &record.partitions),
        None => (None, &empty),
    };

    let definition = match previous_definition {
        Some(old) if old == current.definition() => None,
        _ => Some(current.definition().clone()),
    };

    TableChange {
        definition,
        partitions: reconcile(previous_partitions, current.partitions()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::hive::{HiveLayout, PartitionInfo};
    use crate::layout::Layout;
    use crate::partition::partition_map;
    use crate::statistics::{
        ColumnStatistics, ColumnStatisticsData, ColumnStatisticsSet, LongStats,
    };
    use bytes::Bytes;

    fn partition(spec: &str) -> UdbPartition {
        let layout = HiveLayout::encode(&PartitionInfo::new("db", "t", spec)).unwrap();
        UdbPartition::new(spec, layout, ColumnStatisticsSet::empty()).unwrap()
    }

    fn map(specs: &[&str]) -> PartitionMap {
        partition_map(specs.iter().map(|s| partition(s))).unwrap()
    }

    #[test]
    fn identical_sides_yield_empty_change_set() {
        let side = map(&["a=1", "a=2"]);
        let changes = reconcile(&side, &side.clone());
        assert!(changes.is_empty());
        assert_eq!(changes.unchanged, vec!["a=1", "a=2"]);
    }

    #[test]
    fn empty_previous_adds_everything() {
        let changes = reconcile(&PartitionMap::new(), &map(&["a=2", "a=1"]));
        assert_eq!(changes.added_specs(), vec!["a=1", "a=2"]);
        assert!(changes.removed.is_empty());
        assert_eq!(changes.write_count(), 2);
    }

    #[test]
    fn empty_current_removes_everything() {
        let changes = reconcile(&map(&["a=1", "a=2"]), &PartitionMap::new());
        assert_eq!(changes.removed, vec!["a=1", "a=2"]);
        assert!(changes.added.is_empty());
    }

    #[test]
    fn layout_bytes_change_is_update_even_with_equal_spec() {
        let previous = map(&["a=1"]);
        let changed = UdbPartition::new(
            "a=1",
            Layout::new("hive", Bytes::from_static(b"{\"partitionName\":\"a=1\",\"x\":1}")),
            ColumnStatisticsSet::empty(),
        )
        .unwrap();
        let current = partition_map(vec![changed]).unwrap();

        let changes = reconcile(&previous, &current);
        assert_eq!(changes.updated_specs(), vec!["a=1"]);
        assert!(changes.unchanged.is_empty());
    }

    #[test]
    fn statistics_change_is_update() {
        let previous = map(&["a=1"]);
        let base = partition("a=1");
        let stats = ColumnStatisticsSet::new(vec![ColumnStatistics::new(
            "b",
            "bigint",
            ColumnStatisticsData::Long(LongStats {
                num_nulls: 4,
                ..LongStats::default()
            }),
        )])
        .unwrap();
        let current =
            partition_map(vec![UdbPartition::new("a=1", base.layout().clone(), stats).unwrap()])
                .unwrap();

        assert_eq!(reconcile(&previous, &current).updated_specs(), vec!["a=1"]);
    }

    #[test]
    fn mixed_changes_are_classified() {
        let changes = reconcile(&map(&["c=0", "c=1", "c=5"]), &map(&["c=0", "c=1", "c=2"]));
        assert_eq!(changes.added_specs(), vec!["c=2"]);
        assert_eq!(changes.removed, vec!["c=5"]);
        assert_eq!(changes.unchanged, vec!["c=0", "c=1"]);
        assert_eq!(
            changes.counts(),
            ChangeCounts {
                added: 1,
                removed: 1,
                updated: 0,
                unchanged: 2
            }
        );
    }
}
