//! Error types for the synchronization engine.

use crate::channel::ChannelError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by [`Database`](crate::Database) operations.
///
/// A permission denial is always distinguishable from an ordinary
/// business failure (existing key, missing key): the authority's denial
/// sentinel maps to [`ClientError::PermissionDenied`] and nothing else
/// does.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The authority denied the operation.
    #[error("permission denied for {operation} on {key}")]
    PermissionDenied {
        /// Wire event name of the denied operation.
        operation: &'static str,
        /// Key the operation addressed.
        key: String,
    },

    /// A create hit a key with a live record.
    #[error("key already exists: {0}")]
    KeyExists(String),

    /// An update addressed a key with no live record.
    #[error("no live record for key: {0}")]
    UnknownKey(String),

    /// A bounded update loop ran out of conflict retries.
    #[error("conflict retries exhausted for {key} after {attempts} attempts")]
    ConflictRetriesExhausted {
        /// Key the update addressed.
        key: String,
        /// Number of rejected attempts.
        attempts: u32,
    },

    /// The transport channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

impl ClientError {
    /// Returns true if the authority denied the operation.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ClientError::PermissionDenied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_classification() {
        let denied = ClientError::PermissionDenied {
            operation: "update",
            key: "room1".into(),
        };
        assert!(denied.is_permission_denied());
        assert!(!ClientError::KeyExists("room1".into()).is_permission_denied());
        assert!(!ClientError::UnknownKey("room1".into()).is_permission_denied());
    }

    #[test]
    fn error_display() {
        let err = ClientError::PermissionDenied {
            operation: "create",
            key: "room1".into(),
        };
        assert_eq!(err.to_string(), "permission denied for create on room1");

        let err = ClientError::ConflictRetriesExhausted {
            key: "room1".into(),
            attempts: 3,
        };
        assert!(err.to_string().contains("room1"));
        assert!(err.to_string().contains("3"));
    }
}
