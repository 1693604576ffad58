//! Error types for the common crate
//!
//! This module defines the error taxonomy shared by storage, state, reconciliation
//! and the control API.

use thiserror::Error;

/// Result type for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for orchestrator operations
#[derive(Error, Debug)]
pub enum Error {
    /// Nothing has been persisted yet. This is the normal first-boot condition.
    #[error("Storage is uninitialized")]
    StorageUninitialized,

    /// The storage connection string names an unknown scheme
    #[error("Unsupported storage: {0}")]
    UnsupportedStorage(String),

    /// The coordination service chroot contains an empty path segment
    #[error("Specified blank path")]
    EmptyChrootPath,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Optimistic version mismatch on the coordination service
    #[error("Version conflict on {0}")]
    Conflict(String),

    /// Coordination service error other than a version conflict
    #[error("Coordination service error: {0}")]
    Coordination(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Add-group request without an identifier
    #[error("Missing required parameter group-id")]
    GroupIdRequired,

    /// Add-group request for an identifier that is already present
    #[error("Group {0} already exists")]
    GroupExists(String),

    /// A reconciliation request to the resource manager failed
    #[error("Reconciliation call failed: {0}")]
    Reconciliation(#[source] Box<Error>),

    /// A forced termination request to the resource manager failed
    #[error("Failed to kill task {task_id}: {source}")]
    Termination {
        /// Task that could not be terminated
        task_id: String,
        /// Underlying driver failure
        #[source]
        source: Box<Error>,
    },

    /// Resource manager transport error
    #[error("Driver error: {0}")]
    Driver(String),

    /// No resource manager driver has been retained yet
    #[error("Framework is not registered with the resource manager")]
    NotRegistered,

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Error message returned by the control API
    #[error("{0}")]
    Api(String),

    /// Non-2xx control API response whose body is not an error envelope
    #[error("Server returned non-JSON response.")]
    NonJsonResponse,

    /// Administrative action that has no defined behaviour
    #[error("{0} is not implemented")]
    NotImplemented(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if storage has never been written
    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Error::StorageUninitialized)
    }

    /// Returns true if the error is an optimistic version conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Returns true if the error rejects a duplicate group
    pub fn is_group_exists(&self) -> bool {
        matches!(self, Error::GroupExists(_))
    }

    /// Returns true if the error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Returns true if the error was caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::GroupIdRequired | Error::GroupExists(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_driver_errors_keep_message() {
        let err = Error::Reconciliation(Box::new(Error::Driver("boom!".to_string())));
        assert!(err.to_string().contains("boom!"));

        let err = Error::Termination {
            task_id: "foo".to_string(),
            source: Box::new(Error::Driver("boom!".to_string())),
        };
        assert!(err.to_string().contains("foo"));
        assert!(err.to_string().contains("boom!"));
    }

    #[test]
    fn test_predicates() {
        assert!(Error::StorageUninitialized.is_uninitialized());
        assert!(!Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_uninitialized());
        assert!(Error::Conflict("/foo".to_string()).is_conflict());
        assert!(Error::GroupExists("foo".to_string()).is_group_exists());
        assert!(Error::GroupIdRequired.is_client_error());
        assert!(!Error::Internal("x".to_string()).is_client_error());
    }

    #[test]
    fn test_api_error_displays_message_verbatim() {
        assert_eq!(Error::Api("error happened".to_string()).to_string(), "error happened");
    }
}
