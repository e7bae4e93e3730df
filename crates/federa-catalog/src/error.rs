//! Error types for federa-catalog operations.
//!
//! Every failure aborts only the reconciliation of the table it concerns. The
//! helpers on [`CatalogError`] classify errors for the scheduler that decides
//! whether to retry a table on its next cycle.

use thiserror::Error;

use crate::schema::SchemaError;
use crate::statistics::StatisticsError;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Table or partition absent upstream or in the catalog.
    #[error("not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// The connector failed to reach or parse the external metastore.
    #[error("connector error: {message}")]
    Connector {
        /// Description of the upstream failure.
        message: String,
    },

    /// The connector produced a malformed schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The connector produced malformed statistics.
    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    /// The connector produced a table snapshot that violates a table invariant.
    #[error("invalid table: {message}")]
    InvalidTable {
        /// Description of the violated invariant.
        message: String,
    },

    /// The catalog store rejected the transaction. Nothing was written.
    #[error("commit failed: {reason}")]
    Commit {
        /// Why the commit was rejected.
        reason: String,
    },

    /// No layout codec is registered for the layout type.
    #[error("unknown layout type '{layout_type}'")]
    UnknownLayout {
        /// The unregistered layout type.
        layout_type: String,
    },

    /// A layout payload could not be decoded by its codec.
    #[error("failed to decode '{layout_type}' layout: {message}")]
    LayoutDecode {
        /// The layout type whose payload failed to decode.
        layout_type: String,
        /// Description of the decode failure.
        message: String,
    },

    /// The sync was cancelled before commit. Nothing was written.
    #[error("cancelled: {message}")]
    Cancelled {
        /// Why the sync was cancelled.
        message: String,
    },

    /// Invalid input was provided by the caller.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid input.
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// A connector or codec registry operation failed.
    #[error("registry error: {message}")]
    Registry {
        /// Description of the registry failure.
        message: String,
    },
}

impl CatalogError {
    /// Creates a connector error.
    #[must_use]
    pub fn connector(message: impl Into<String>) -> Self {
        Self::Connector {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a commit error.
    #[must_use]
    pub fn commit(reason: impl Into<String>) -> Self {
        Self::Commit {
            reason: reason.into(),
        }
    }

    /// Returns true for malformed metadata from a connector. The table is
    /// skipped for this cycle.
    #[must_use]
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            Self::Schema(_)
                | Self::Statistics(_)
                | Self::InvalidTable { .. }
                | Self::UnknownLayout { .. }
                | Self::LayoutDecode { .. }
        )
    }

    /// Returns true when the whole cycle may succeed if the scheduler retries it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connector { .. } | Self::Commit { .. } | Self::Cancelled { .. } | Self::Storage { .. }
        )
    }

    /// Short, stable label used for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Connector { .. } => "connector",
            Self::Schema(_) => "schema",
            Self::Statistics(_) => "statistics",
            Self::InvalidTable { .. } => "invalid_table",
            Self::Commit { .. } => "commit",
            Self::UnknownLayout { .. } => "unknown_layout",
            Self::LayoutDecode { .. } => "layout_decode",
            Self::Cancelled { .. } => "cancelled",
            Self::InvalidInput { .. } => "invalid_input",
            Self::Serialization { .. } => "serialization",
            Self::Storage { .. } => "storage",
            Self::Registry { .. } => "registry",
        }
    }
}

impl From<federa_core::Error> for CatalogError {
    fn from(e: federa_core::Error) -> Self {
        match e {
            federa_core::Error::NotFound(message) => Self::NotFound { message },
            federa_core::Error::Serialization { message } => Self::Serialization { message },
            federa_core::Error::InvalidInput(message)
            | federa_core::Error::InvalidId { message } => Self::InvalidInput { message },
            federa_core::Error::Storage { message } => Self::Storage { message },
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_data_quality_errors() {
        let err = CatalogError::from(SchemaError::DuplicateId { id: 1 });
        assert!(err.is_data_quality());
        assert!(!err.is_retryable());
        assert_eq!(err.kind(), "schema");
    }

    #[test]
    fn classifies_retryable_errors() {
        assert!(CatalogError::connector("timeout").is_retryable());
        assert!(CatalogError::commit("conflict").is_retryable());
        assert!(!CatalogError::not_found("t").is_retryable());
    }

    #[test]
    fn converts_core_errors() {
        let err = CatalogError::from(federa_core::Error::NotFound("x".into()));
        assert!(matches!(err, CatalogError::NotFound { .. }));

        let err = CatalogError::from(federa_core::Error::InvalidId {
            message: "bad".into(),
        });
        assert!(matches!(err, CatalogError::InvalidInput { .. }));

        let err = CatalogError::from(federa_core::Error::storage("io"));
        assert!(matches!(err, CatalogError::Storage { .. }));
    }
}
