//! One partition of a federated table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::layout::{Layout, LayoutRegistry};
use crate::statistics::ColumnStatisticsSet;

/// Partitions of one table keyed by spec.
pub type PartitionMap = HashMap<String, UdbPartition>;

/// Immutable description of one partition: its identity, layout, and statistics.
///
/// A changed partition is a new value with the same spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdbPartition {
    spec: String,
    layout: Layout,
    #[serde(default)]
    statistics: ColumnStatisticsSet,
}

impl UdbPartition {
    /// Creates a partition with an explicit spec.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidTable`] if the spec is empty.
    pub fn new(
        spec: impl Into<String>,
        layout: Layout,
        statistics: ColumnStatisticsSet,
    ) -> Result<Self> {
        let spec = spec.into();
        if spec.is_empty() {
            return Err(CatalogError::InvalidTable {
                message: "partition spec cannot be empty".to_string(),
            });
        }
        Ok(Self {
            spec,
            layout,
            statistics,
        })
    }

    /// Creates a partition whose spec is derived from its layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot be decoded or yields an empty spec.
    pub fn from_layout(
        layout: Layout,
        statistics: ColumnStatisticsSet,
        registry: &LayoutRegistry,
    ) -> Result<Self> {
        let spec = layout.spec(registry)?;
        Self::new(spec, layout, statistics)
    }

    /// Returns the partition's identity within its table.
    #[must_use]
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Returns the partition's layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Returns the partition's statistics.
    #[must_use]
    pub fn statistics(&self) -> &ColumnStatisticsSet {
        &self.statistics
    }

    /// Returns true when layout bytes and statistics are identical.
    ///
    /// The spec is not compared; callers pair partitions by spec.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.layout == other.layout && self.statistics == other.statistics
    }
}

/// Collects partitions into a map keyed by spec.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidTable`] if two partitions share a spec.
pub fn partition_map(partitions: impl IntoIterator<Item = UdbPartition>) -> Result<PartitionMap> {
    let partitions = partitions.into_iter();
    let mut map = PartitionMap::with_capacity(partitions.size_hint().0);
    for partition in partitions {
        if map.contains_key(partition.spec()) {
            return Err(CatalogError::InvalidTable {
                message: format!("duplicate partition spec '{}'", partition.spec()),
            });
        }
        map.insert(partition.spec.clone(), partition);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::hive::{HiveLayout, PartitionInfo};

    fn hive(name: &str) -> Layout {
        HiveLayout::encode(&PartitionInfo::new("db", "t", name)).unwrap()
    }

    #[test]
    fn spec_derived_from_layout() {
        let registry = LayoutRegistry::with_builtin();
        let p = UdbPartition::from_layout(hive("col1=7"), ColumnStatisticsSet::empty(), &registry)
            .unwrap();
        assert_eq!(p.spec(), "col1=7");
    }

    #[test]
    fn empty_spec_rejected() {
        assert!(UdbPartition::new("", hive("x"), ColumnStatisticsSet::empty()).is_err());
    }

    #[test]
    fn partition_map_rejects_duplicate_specs() {
        let a = UdbPartition::new("col1=0", hive("col1=0"), ColumnStatisticsSet::empty()).unwrap();
        let err = partition_map(vec![a.clone(), a]).unwrap_err();
        assert!(err.is_data_quality());
    }

    #[test]
    fn same_content_compares_layout_bytes() {
        let a = UdbPartition::new("col1=0", hive("col1=0"), ColumnStatisticsSet::empty()).unwrap();
        let b = UdbPartition::new("col1=0", hive("col1=0"), ColumnStatisticsSet::empty()).unwrap();
        let c = UdbPartition::new("col1=0", hive("col1=00"), ColumnStatisticsSet::empty()).unwrap();
        assert!(a.same_content(&b));
        assert!(!a.same_content(&c));
    }
}
