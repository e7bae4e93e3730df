//! Error types and result aliases for Federa.
//!
//! This module defines the shared error type used by the storage contract and
//! the identifier types. Catalog-level failures live in `federa-catalog`.

/// The result type used throughout Federa core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by identifiers, envelopes and storage backends.
///
/// A failed write precondition is not an error; backends report it as
/// [`crate::WriteResult::PreconditionFailed`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A table or backup identifier did not parse.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// A backend could not read or write an object.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// An envelope could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// No object exists at the requested path.
    #[error("not found: {0}")]
    NotFound(String),

    /// A configuration value was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Creates a storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
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
    fn storage_error_displays_message() {
        let err = Error::storage("lock poisoned");
        assert_eq!(err.to_string(), "storage error: lock poisoned");
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let json = serde_json::from_slice::<serde_json::Value>(b"{").unwrap_err();
        assert!(matches!(Error::from(json), Error::Serialization { .. }));
    }
}
