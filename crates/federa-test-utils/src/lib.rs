//! Shared test utilities for Federa integration tests.
//!
//! This crate provides:
//! - [`TestUdbTable`]: canned partitioned table snapshots
//! - [`TestUdb`]: in-memory connector with fault injection and concurrency tracking
//! - [`RecordingStore`]: catalog store that counts and can reject commits
//!
//! # Example
//!
//! ```rust,ignore
//! use federa_test_utils::{TestUdb, TestUdbTable};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let udb = TestUdb::new("testdb");
//!     udb.put_table(TestUdbTable::new("testdb", "t1", 3));
//!     // ... run a sync ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod store;
pub mod udb;

pub use fixtures::*;
pub use store::*;
pub use udb::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("federa=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
