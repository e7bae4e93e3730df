//! Column definitions of a federated table.
//!
//! A [`Schema`] is validated when it is built: ids and names are unique, and
//! column order is preserved because it matches physical column order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when schema metadata is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two columns share an id.
    #[error("schema error: duplicate column id {id}")]
    DuplicateId {
        /// The repeated id.
        id: u32,
    },

    /// Two columns share a name.
    #[error("schema error: duplicate column name '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A column has an empty name.
    #[error("schema error: column {id} has an empty name")]
    EmptyName {
        /// Id of the unnamed column.
        id: u32,
    },

    /// A column has an empty type tag.
    #[error("schema error: column '{name}' has an empty type")]
    EmptyType {
        /// Name of the untyped column.
        name: String,
    },

    /// A partition column does not match any schema column.
    #[error("schema error: partition column '{name}' is not in the schema")]
    UnknownPartitionColumn {
        /// Name of the partition column.
        name: String,
    },

    /// A partition column is listed twice.
    #[error("schema error: partition column '{name}' is listed twice")]
    DuplicatePartitionColumn {
        /// Name of the repeated partition column.
        name: String,
    },
}

/// One column definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column id, unique within the schema.
    pub id: u32,
    /// Column name, unique within the schema.
    pub name: String,
    /// Type tag as reported by the metastore (e.g. `int`, `decimal(10,2)`).
    #[serde(rename = "type")]
    pub field_type: String,
    /// Free-form column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldSchema {
    /// Creates a column definition without a comment.
    #[must_use]
    pub fn new(id: u32, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            field_type: field_type.into(),
            comment: None,
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Ordered, validated sequence of column definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<FieldSchema>", into = "Vec<FieldSchema>")]
pub struct Schema {
    fields: Vec<FieldSchema>,
}

impl Schema {
    /// Builds a schema, rejecting duplicate ids or names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] on the first duplicate id, duplicate name,
    /// empty name, or empty type found in column order.
    pub fn new(fields: Vec<FieldSchema>) -> Result<Self, SchemaError> {
        let mut ids = HashSet::with_capacity(fields.len());
        let mut names = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name.is_empty() {
                return Err(SchemaError::EmptyName { id: field.id });
            }
            if field.field_type.is_empty() {
                return Err(SchemaError::EmptyType {
                    name: field.name.clone(),
                });
            }
            if !ids.insert(field.id) {
                return Err(SchemaError::DuplicateId { id: field.id });
            }
            if !names.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName {
                    name: field.name.clone(),
                });
            }
        }
        Ok(Self { fields })
    }

    /// Returns a schema with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the columns in physical order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if an identical column definition is part of this schema.
    #[must_use]
    pub fn contains(&self, field: &FieldSchema) -> bool {
        self.field(&field.name).is_some_and(|f| f == field)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks that `partition_cols` is a duplicate-free list of columns of this schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownPartitionColumn`] when a column is not
    /// part of the schema with identical id and type, or
    /// [`SchemaError::DuplicatePartitionColumn`] when one is listed twice.
    pub fn validate_partition_columns(
        &self,
        partition_cols: &[FieldSchema],
    ) -> Result<(), SchemaError> {
        let mut seen = HashSet::with_capacity(partition_cols.len());
        for col in partition_cols {
            if !self.contains(col) {
                return Err(SchemaError::UnknownPartitionColumn {
                    name: col.name.clone(),
                });
            }
            if !seen.insert(col.name.as_str()) {
                return Err(SchemaError::DuplicatePartitionColumn {
                    name: col.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<FieldSchema>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<FieldSchema>) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<Schema> for Vec<FieldSchema> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}
