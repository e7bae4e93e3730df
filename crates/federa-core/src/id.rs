//! Strongly-typed identifiers for Federa entities.
//!
//! - [`TableId`] names one federated table (`db.table`). It keys the catalog
//!   store and the per-table lock registry.
//! - [`HolderId`] and [`BackupId`] are ULIDs: sortable by creation time and
//!   unique without coordination.
//!
//! # Example
//!
//! ```rust
//! use federa_core::id::TableId;
//!
//! let id = TableId::new("sales", "orders").unwrap();
//! assert_eq!(id.to_string(), "sales.orders");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// Identifier of a federated table: the under-database name plus the table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableId {
    db_name: String,
    table_name: String,
}

impl TableId {
    /// Creates a table identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if either part is empty or contains a
    /// path separator or a dot.
    pub fn new(db_name: impl Into<String>, table_name: impl Into<String>) -> Result<Self> {
        let db_name = db_name.into();
        let table_name = table_name.into();
        validate_part("database", &db_name)?;
        validate_part("table", &table_name)?;
        Ok(Self {
            db_name,
            table_name,
        })
    }

    /// Returns the database name.
    #[must_use]
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

fn validate_part(kind: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidId {
            message: format!("{kind} name cannot be empty"),
        });
    }
    if value.contains(['/', '.']) {
        return Err(Error::InvalidId {
            message: format!("{kind} name '{value}' cannot contain '/' or '.'"),
        });
    }
    Ok(())
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.db_name, self.table_name)
    }
}

impl FromStr for TableId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (db, table) = s.split_once('.').ok_or_else(|| Error::InvalidId {
            message: format!("table id '{s}' must have the form db.table"),
        })?;
        Self::new(db, table)
    }
}

/// Identity of a lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(Ulid);

impl HolderId {
    /// Generates a new unique holder ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one backup run. Used as the backup directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(Ulid);

impl BackupId {
    /// Generates a new unique backup ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    /// Returns the creation timestamp encoded in the ID.
    #[must_use]
    pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
        let ms = i64::try_from(self.0.timestamp_ms()).unwrap_or(i64::MAX);
        chrono::DateTime::from_timestamp_millis(ms).unwrap_or_else(chrono::Utc::now)
    }
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BackupId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ulid::from_string(s)
            .map(Self)
            .map_err(|e| Error::InvalidId {
                message: format!("invalid backup ID '{s}': {e}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_id_display_and_parse() {
        let id = TableId::new("sales", "orders").unwrap();
        assert_eq!(id.to_string(), "sales.orders");
        let parsed: TableId = "sales.orders".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn table_id_rejects_bad_parts() {
        assert!(TableId::new("", "orders").is_err());
        assert!(TableId::new("sales", "  ").is_err());
        assert!(TableId::new("sa/les", "orders").is_err());
        assert!(TableId::new("sales", "or.ders").is_err());
        assert!("no_dot".parse::<TableId>().is_err());
    }

    #[test]
    fn holder_ids_are_unique() {
        assert_ne!(HolderId::generate(), HolderId::generate());
    }

    #[test]
    fn backup_id_roundtrips_through_string() {
        let id = BackupId::generate();
        let parsed: BackupId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!(id.created_at() <= chrono::Utc::now());
    }
}
