//! Programmable in-memory connector.
//!
//! [`TestUdb`] serves whatever tables the test puts into it and can inject
//! faults per table. It also records how many fetches ran concurrently so
//! tests can assert on lock and parallelism behavior.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use federa_catalog::error::{CatalogError, Result};
use federa_catalog::schema::SchemaError;
use federa_catalog::table::UdbTable;
use federa_catalog::udb::UnderDatabase;

/// Connector type reported by [`TestUdb`].
pub const TEST_UDB_TYPE: &str = "test";

/// Fault injected into a table's fetches.
#[derive(Debug, Clone)]
pub enum FetchFault {
    /// Fail with a connector error.
    Connector(String),
    /// Report malformed schema metadata.
    Schema(SchemaError),
    /// Sleep before answering.
    Delay(Duration),
    /// Never answer.
    Hang,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, UdbTable>,
    faults: HashMap<String, FetchFault>,
    fetches: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    max_in_flight_per_table: HashMap<String, usize>,
}

/// In-memory connector for one database.
#[derive(Debug, Clone)]
pub struct TestUdb {
    db_name: String,
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl TestUdb {
    /// An empty connector for `db_name`.
    pub fn new(db_name: &str) -> Self {
        Self {
            db_name: db_name.to_string(),
            state: Arc::default(),
            in_flight: Arc::default(),
            max_in_flight: Arc::default(),
        }
    }

    /// Adds or replaces a table.
    pub fn put_table(&self, table: impl Into<UdbTable>) {
        let table = table.into();
        let mut state = self.state.lock().unwrap();
        state.tables.insert(table.name().to_string(), table);
    }

    /// Serves `table` when `table_name` is fetched, whatever name the
    /// snapshot itself reports.
    pub fn put_table_as(&self, table_name: &str, table: impl Into<UdbTable>) {
        let mut state = self.state.lock().unwrap();
        state.tables.insert(table_name.to_string(), table.into());
    }

    /// Removes a table, making its fetches return `NotFound`.
    pub fn remove_table(&self, table_name: &str) {
        self.state.lock().unwrap().tables.remove(table_name);
    }

    /// Injects a fault into every fetch of a table until cleared.
    pub fn set_fault(&self, table_name: &str, fault: FetchFault) {
        let mut state = self.state.lock().unwrap();
        state.faults.insert(table_name.to_string(), fault);
    }

    /// Clears a table's fault.
    pub fn clear_fault(&self, table_name: &str) {
        self.state.lock().unwrap().faults.remove(table_name);
    }

    /// Number of fetches started for a table.
    pub fn fetch_count(&self, table_name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.fetches.get(table_name).copied().unwrap_or(0)
    }

    /// Most fetches of one table ever running at the same time.
    pub fn max_concurrent_fetches_of(&self, table_name: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .max_in_flight_per_table
            .get(table_name)
            .copied()
            .unwrap_or(0)
    }

    /// Most fetches of any tables ever running at the same time.
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, table_name: &str) -> Option<FetchFault> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut state = self.state.lock().unwrap();
        *state.fetches.entry(table_name.to_string()).or_default() += 1;
        let current = {
            let n = state.in_flight.entry(table_name.to_string()).or_default();
            *n += 1;
            *n
        };
        let max = state
            .max_in_flight_per_table
            .entry(table_name.to_string())
            .or_default();
        *max = (*max).max(current);
        state.faults.get(table_name).cloned()
    }

    fn leave(&self, table_name: &str) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        if let Some(n) = state.in_flight.get_mut(table_name) {
            *n = n.saturating_sub(1);
        }
    }
}

/// Decrements the in-flight counters even if the fetch future is dropped.
struct InFlight<'a> {
    udb: &'a TestUdb,
    table_name: &'a str,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.udb.leave(self.table_name);
    }
}

#[async_trait]
impl UnderDatabase for TestUdb {
    fn udb_type(&self) -> &str {
        TEST_UDB_TYPE
    }

    fn database_name(&self) -> &str {
        &self.db_name
    }

    async fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().tables.keys().cloned().collect())
    }

    async fn fetch_table(&self, table_name: &str) -> Result<UdbTable> {
        let fault = self.enter(table_name);
        let _in_flight = InFlight {
            udb: self,
            table_name,
        };

        match fault {
            Some(FetchFault::Connector(message)) => return Err(CatalogError::connector(message)),
            Some(FetchFault::Schema(error)) => return Err(error.into()),
            Some(FetchFault::Delay(delay)) => tokio::time::sleep(delay).await,
            Some(FetchFault::Hang) => std::future::pending::<()>().await,
            None => {}
        }

        let table = self.state.lock().unwrap().tables.get(table_name).cloned();
        table.ok_or_else(|| CatalogError::not_found(format!("{}.{table_name}", self.db_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestUdbTable;

    #[tokio::test]
    async fn serves_put_tables() {
        let udb = TestUdb::new("testdb");
        udb.put_table(TestUdbTable::new("testdb", "t1", 2));
        assert_eq!(udb.table_names().await.unwrap(), vec!["t1"]);
        assert_eq!(udb.fetch_table("t1").await.unwrap().partitions().len(), 2);
        assert_eq!(udb.fetch_count("t1"), 1);

        udb.remove_table("t1");
        assert!(matches!(
            udb.fetch_table("t1").await,
            Err(CatalogError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn injected_connector_fault() {
        let udb = TestUdb::new("testdb");
        udb.put_table(TestUdbTable::new("testdb", "t1", 1));
        udb.set_fault("t1", FetchFault::Connector("metastore down".into()));
        assert!(matches!(
            udb.fetch_table("t1").await,
            Err(CatalogError::Connector { .. })
        ));
        udb.clear_fault("t1");
        assert!(udb.fetch_table("t1").await.is_ok());
    }

    #[tokio::test]
    async fn injected_schema_fault_is_data_quality() {
        let udb = TestUdb::new("testdb");
        udb.put_table(TestUdbTable::new("testdb", "t1", 1));
        udb.set_fault("t1", FetchFault::Schema(SchemaError::DuplicateId { id: 2 }));
        let err = udb.fetch_table("t1").await.unwrap_err();
        assert!(err.is_data_quality());
    }
}
