//! Canned table snapshots.
//!
//! [`TestUdbTable`] builds the table shape used throughout the sync tests:
//!
//! - schema `col1: int` (id 1), `col2: int` (id 2), partitioned by `col1`
//! - owner `testowner`, no parameters
//! - partition specs `col1=0 .. col1=n-1`
//! - one empty `Long` statistic on `col2`, reported for the table and
//!   replicated to every partition

use std::collections::BTreeMap;

use federa_catalog::layout::hive::{HiveLayout, PartitionInfo};
use federa_catalog::partition::UdbPartition;
use federa_catalog::schema::{FieldSchema, Schema};
use federa_catalog::statistics::{
    ColumnStatistics, ColumnStatisticsData, ColumnStatisticsSet, LongStats,
};
use federa_catalog::table::{TableDefinition, UdbTable};

/// Owner reported for every test table.
pub const TEST_OWNER: &str = "testowner";

/// Column statistics the test table and every test partition carry by default.
pub fn default_long_stats() -> ColumnStatisticsSet {
    long_stats(LongStats::default())
}

/// A statistics set with one `Long` entry for `col2`.
pub fn long_stats(stats: LongStats) -> ColumnStatisticsSet {
    ColumnStatisticsSet::new(vec![ColumnStatistics::new(
        "col2",
        "int",
        ColumnStatisticsData::Long(stats),
    )])
    .expect("single column")
}

/// Spec of the test partition with the given `col1` value.
pub fn spec(value: u32) -> String {
    format!("col1={value}")
}

/// Builder for canned test tables.
#[derive(Debug, Clone)]
pub struct TestUdbTable {
    db_name: String,
    table_name: String,
    values: Vec<u32>,
    parameters: BTreeMap<String, String>,
    stats: ColumnStatisticsSet,
    overrides: BTreeMap<u32, ColumnStatisticsSet>,
    locations: BTreeMap<u32, String>,
}

impl TestUdbTable {
    /// A table with partitions `col1=0 .. col1=num_partitions-1`.
    pub fn new(db_name: &str, table_name: &str, num_partitions: u32) -> Self {
        Self {
            db_name: db_name.to_string(),
            table_name: table_name.to_string(),
            values: (0..num_partitions).collect(),
            parameters: BTreeMap::new(),
            stats: default_long_stats(),
            overrides: BTreeMap::new(),
            locations: BTreeMap::new(),
        }
    }

    /// Replaces the partition values (`col1=v` for each `v`).
    #[must_use]
    pub fn with_partition_values(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.values = values.into_iter().collect();
        self
    }

    /// Sets a table parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_string(), value.to_string());
        self
    }

    /// Gives one partition its own statistics.
    #[must_use]
    pub fn with_partition_stats(mut self, value: u32, stats: ColumnStatisticsSet) -> Self {
        self.overrides.insert(value, stats);
        self
    }

    /// Gives one partition a storage location, changing its layout bytes.
    #[must_use]
    pub fn with_partition_location(mut self, value: u32, location: &str) -> Self {
        self.locations.insert(value, location.to_string());
        self
    }

    /// The table-level definition.
    pub fn definition(&self) -> TableDefinition {
        let col1 = FieldSchema::new(1, "col1", "int");
        let col2 = FieldSchema::new(2, "col2", "int");
        TableDefinition {
            name: self.table_name.clone(),
            owner: TEST_OWNER.to_string(),
            parameters: self.parameters.clone(),
            schema: Schema::new(vec![col1.clone(), col2]).expect("distinct columns"),
            partition_cols: vec![col1],
            layout: HiveLayout::encode(&PartitionInfo::new(
                &self.db_name,
                &self.table_name,
                &self.table_name,
            ))
            .expect("encodable"),
            statistics: self.stats.clone(),
        }
    }

    /// The partition with the given `col1` value.
    pub fn partition(&self, value: u32) -> UdbPartition {
        let name = spec(value);
        let mut info = PartitionInfo::new(&self.db_name, &self.table_name, &name);
        if let Some(location) = self.locations.get(&value) {
            info = info.with_location(location);
        }
        let stats = self
            .overrides
            .get(&value)
            .unwrap_or(&self.stats)
            .clone();
        UdbPartition::new(name, HiveLayout::encode(&info).expect("encodable"), stats)
            .expect("non-empty spec")
    }

    /// Builds the snapshot.
    pub fn build(&self) -> UdbTable {
        let partitions = self.values.iter().map(|v| self.partition(*v));
        UdbTable::new(self.definition(), partitions).expect("valid test table")
    }
}

impl From<TestUdbTable> for UdbTable {
    fn from(builder: TestUdbTable) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_shape() {
        let table = TestUdbTable::new("testdb", "t1", 3).build();
        assert_eq!(table.name(), "t1");
        assert_eq!(table.owner(), TEST_OWNER);
        assert!(table.parameters().is_empty());
        assert_eq!(table.partition_specs(), vec!["col1=0", "col1=1", "col1=2"]);
        assert_eq!(table.partition_cols().len(), 1);
        assert!(table.schema().field("col2").is_some());
        assert_eq!(table.statistics(), &default_long_stats());

        for partition in table.partitions().values() {
            assert_eq!(partition.statistics(), &default_long_stats());
        }
    }

    #[test]
    fn default_statistic_is_an_empty_long_on_col2() {
        let stats = default_long_stats();
        assert_eq!(stats.len(), 1);
        let entry = stats.get("col2").unwrap();
        assert_eq!(entry.col_type, "int");
        assert_eq!(entry.data, ColumnStatisticsData::Long(LongStats::default()));
    }

    #[test]
    fn equal_builders_give_equal_snapshots() {
        let a = TestUdbTable::new("testdb", "t1", 3).build();
        let b = TestUdbTable::new("testdb", "t1", 3).build();
        assert_eq!(a, b);
    }

    #[test]
    fn location_changes_layout_bytes() {
        let base = TestUdbTable::new("testdb", "t1", 1);
        let moved = base.clone().with_partition_location(0, "s3://bucket/t1/col1=0");
        assert_ne!(base.partition(0).layout(), moved.partition(0).layout());
        assert_eq!(base.partition(0).spec(), moved.partition(0).spec());
    }
}
