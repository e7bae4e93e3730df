//! Connector boundary to external metastores ("under databases").
//!
//! A connector translates one metastore's metadata model into [`UdbTable`]
//! snapshots. Every call to [`UnderDatabase::fetch_table`] is treated as a
//! fresh snapshot; connectors may cache internally but must document how
//! stale a cached answer can be.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::table::UdbTable;

/// A metastore-specific connector bound to one database.
#[async_trait]
pub trait UnderDatabase: Send + Sync + 'static {
    /// Connector type (e.g. `hive`).
    fn udb_type(&self) -> &str;

    /// Name of the database this connector serves.
    fn database_name(&self) -> &str;

    /// Lists the tables of the database.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Connector`] if the metastore cannot be reached.
    async fn table_names(&self) -> Result<Vec<String>>;

    /// Fetches a fresh snapshot of one table.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if the table does not exist upstream
    /// - [`CatalogError::Connector`] on upstream I/O or parse failure
    /// - schema/statistics errors if the upstream metadata is malformed
    async fn fetch_table(&self, table_name: &str) -> Result<UdbTable>;
}

/// Connection settings handed to a connector factory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdbConfig {
    /// Address of the metastore.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_uri: Option<String>,
    /// Connector-specific properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl UdbConfig {
    /// Creates a config pointing at a metastore.
    #[must_use]
    pub fn new(connection_uri: impl Into<String>) -> Self {
        Self {
            connection_uri: Some(connection_uri.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Creates connectors of one type.
pub trait UdbFactory: Send + Sync + 'static {
    /// Connector type this factory creates.
    fn udb_type(&self) -> &str;

    /// Creates a connector for a database.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is unusable.
    fn create(&self, db_name: &str, config: &UdbConfig) -> Result<Arc<dyn UnderDatabase>>;
}

/// Connector factories keyed by connector type.
#[derive(Clone, Default)]
pub struct UdbRegistry {
    factories: HashMap<String, Arc<dyn UdbFactory>>,
}

impl UdbRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Registry`] if the type is already registered.
    pub fn register(&mut self, factory: Arc<dyn UdbFactory>) -> Result<()> {
        let udb_type = factory.udb_type().to_string();
        if self.factories.contains_key(&udb_type) {
            return Err(CatalogError::Registry {
                message: format!("connector type '{udb_type}' already registered"),
            });
        }
        tracing::debug!(udb_type = %udb_type, "registered connector factory");
        self.factories.insert(udb_type, factory);
        Ok(())
    }

    /// Creates a connector of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Registry`] for an unknown type, or the factory's error.
    pub fn create(
        &self,
        udb_type: &str,
        db_name: &str,
        config: &UdbConfig,
    ) -> Result<Arc<dyn UnderDatabase>> {
        let factory = self
            .factories
            .get(udb_type)
            .ok_or_else(|| CatalogError::Registry {
                message: format!("no connector registered for type '{udb_type}'"),
            })?;
        factory.create(db_name, config)
    }

    /// Returns the registered connector types, sorted.
    #[must_use]
    pub fn udb_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl fmt::Debug for UdbRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdbRegistry")
            .field("udb_types", &self.udb_types())
            .finish()
    }
}
