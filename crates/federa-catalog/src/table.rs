//! Snapshot of one federated table as observed by a connector.
//!
//! A [`UdbTable`] is built once, validated eagerly, and never mutated: the
//! connector returns a fresh snapshot every sync cycle.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::layout::Layout;
use crate::partition::{partition_map, PartitionMap, UdbPartition};
use crate::schema::{FieldSchema, Schema};
use crate::statistics::ColumnStatisticsSet;

/// Table-level attributes of a federated table.
///
/// The catalog compares and replaces these as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    /// Table name.
    pub name: String,
    /// Owner reported by the metastore.
    pub owner: String,
    /// Table parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    /// Column definitions.
    pub schema: Schema,
    /// Partition key columns, in partition path order.
    #[serde(default)]
    pub partition_cols: Vec<FieldSchema>,
    /// Table-level layout; the storage of an unpartitioned table.
    pub layout: Layout,
    /// Table-level statistics.
    #[serde(default)]
    pub statistics: ColumnStatisticsSet,
}

impl TableDefinition {
    /// Checks the table-level invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidTable`] for an empty name, or a schema
    /// error if a partition column is not part of the schema.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CatalogError::InvalidTable {
                message: "table name cannot be empty".to_string(),
            });
        }
        self.schema.validate_partition_columns(&self.partition_cols)?;
        Ok(())
    }
}

/// Immutable snapshot of one federated table and all of its partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdbTable {
    definition: TableDefinition,
    partitions: PartitionMap,
}

impl UdbTable {
    /// Builds a snapshot, validating every invariant up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid or two partitions share a spec.
    pub fn new(
        definition: TableDefinition,
        partitions: impl IntoIterator<Item = UdbPartition>,
    ) -> Result<Self> {
        definition.validate()?;
        let partitions = partition_map(partitions)?;
        Ok(Self {
            definition,
            partitions,
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Returns the owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.definition.owner
    }

    /// Returns the table parameters.
    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.definition.parameters
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.definition.schema
    }

    /// Returns the partition key columns.
    #[must_use]
    pub fn partition_cols(&self) -> &[FieldSchema] {
        &self.definition.partition_cols
    }

    /// Returns the table-level layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.definition.layout
    }

    /// Returns the table-level statistics.
    #[must_use]
    pub fn statistics(&self) -> &ColumnStatisticsSet {
        &self.definition.statistics
    }

    /// Returns the partitions keyed by spec.
    #[must_use]
    pub fn partitions(&self) -> &PartitionMap {
        &self.partitions
    }

    /// Looks up one partition.
    #[must_use]
    pub fn partition(&self, spec: &str) -> Option<&UdbPartition> {
        self.partitions.get(spec)
    }

    /// Returns the partition specs in sorted order.
    #[must_use]
    pub fn partition_specs(&self) -> Vec<&str> {
        let mut specs: Vec<&str> = self.partitions.keys().map(String::as_str).collect();
        specs.sort_unstable();
        specs
    }

    /// Returns true if the table declares partition columns.
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        !self.definition.partition_cols.is_empty()
    }

    /// Returns the table-level attributes.
    #[must_use]
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// Splits the snapshot into its definition and partitions.
    #[must_use]
    pub fn into_parts(self) -> (TableDefinition, PartitionMap) {
        (self.definition, self.partitions)
    }
}
