//! Error types for the reference authority.

use thiserror::Error;

/// Result type for authority operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the reference authority.
///
/// Denials and write rejections are not errors; they travel inside
/// acknowledgments as the wire contract requires. Errors cover requests
/// the authority cannot answer at all.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request cannot be dispatched.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ServerError::InvalidRequest("register carries no acknowledgment".into());
        assert!(err.to_string().contains("register"));
    }
}
