//! # federa-core
//!
//! Core abstractions for the Federa catalog federation service.
//!
//! This crate provides the foundational types shared by every Federa component:
//!
//! - **Identifiers**: [`TableId`] plus ULID-based holder and backup ids
//! - **Storage**: the conditional-write object storage contract and an
//!   in-memory backend
//! - **Backup envelope**: request/response types for out-of-band snapshots
//! - **Observability**: logging initialization and span helpers
//! - **Error Types**: shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use federa_core::prelude::*;
//!
//! let table = TableId::new("sales", "orders").unwrap();
//! let backend = MemoryBackend::new();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod backup;
pub mod error;
pub mod id;
pub mod observability;
pub mod storage;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::backup::{BackupOptions, BackupRequest, BackupResponse};
    pub use crate::error::{Error, Result};
    pub use crate::id::{BackupId, HolderId, TableId};
    pub use crate::storage::{
        MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult,
    };
}

pub use backup::{BackupOptions, BackupRequest, BackupResponse};
pub use error::{Error, Result};
pub use id::{BackupId, HolderId, TableId};
pub use observability::{init_logging, LogFormat};
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend, WritePrecondition, WriteResult};
