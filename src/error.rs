//! Unified error handling for the chargehub crate
//!
//! Every fallible library operation returns [`Result`], whose error type
//! classifies failures into a small set of [`ErrorCategory`] values. The HTTP
//! layer uses the category to pick a status code: validation failures become
//! client errors, everything else is reported as a server error.
//!
//! # Usage
//!
//! ```rust,ignore
//! use chargehub::error::{Error, ErrorCategory};
//!
//! fn status_for(err: &Error) -> u16 {
//!     match err.category() {
//!         ErrorCategory::Validation => 400,
//!         _ => 500,
//!     }
//! }
//! ```

use thiserror::Error;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Document store errors (connection, query, write)
    Store,
    /// Malformed identifiers and request payloads
    Validation,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Validation => "validation",
            Self::Other => "other",
        }
    }
}

/// Unified error type for the chargehub crate
#[derive(Error, Debug)]
pub enum Error {
    /// MongoDB driver errors
    #[error("Store error: {0}")]
    Store(#[from] mongodb::error::Error),

    /// Store failure that did not originate in the driver
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The store refused a write, e.g. an `$inc` that would overflow
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Path identifier is not a valid document id
    #[error("Invalid battery ID: {0}")]
    InvalidId(String),

    /// Conversion from a JSON value into a BSON value failed
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] mongodb::bson::ser::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(_) | Self::StoreUnavailable(_) | Self::WriteRejected(_) => {
                ErrorCategory::Store
            }
            Self::InvalidId(_) | Self::BsonSer(_) => ErrorCategory::Validation,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// Check if this error is recoverable (the same request may succeed later)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) => matches!(
                *e.kind,
                mongodb::error::ErrorKind::Io(_)
                    | mongodb::error::ErrorKind::ConnectionPoolCleared { .. }
                    | mongodb::error::ErrorKind::ServerSelection { .. }
            ),
            Self::StoreUnavailable(_) => true,
            _ => false,
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Validation
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::InvalidId("abc".to_string());
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.is_client_error());

        let err = Error::StoreUnavailable("down".to_string());
        assert_eq!(err.category(), ErrorCategory::Store);
        assert!(!err.is_client_error());

        let err = Error::WriteRejected("overflow".to_string());
        assert_eq!(err.category().as_str(), "store");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::StoreUnavailable("timeout".to_string()).is_recoverable());
        assert!(!Error::WriteRejected("overflow".to_string()).is_recoverable());
        assert!(!Error::InvalidId("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_invalid_id_message() {
        let err = Error::InvalidId("not-an-id".to_string());
        assert_eq!(err.to_string(), "Invalid battery ID: not-an-id");
    }

    #[test]
    fn test_unrepresentable_value_is_client_error() {
        let err: Error = mongodb::bson::to_bson(&u64::MAX).unwrap_err().into();
        assert!(matches!(err, Error::BsonSer(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Inserted document has no ObjectId");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.to_string(), "Inserted document has no ObjectId");
    }
}
