//! Configuration for the synchronization engine.

/// Configuration for a [`Database`](crate::Database) instance.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Maximum number of conflict rebases one update may perform before
    /// it fails with
    /// [`ConflictRetriesExhausted`](crate::ClientError::ConflictRetriesExhausted).
    ///
    /// `None` retries without bound, matching the source protocol:
    /// under sustained contention an unbounded loop only terminates on
    /// success or denial. Bounding it is the caller's policy choice.
    pub max_conflict_retries: Option<u32>,
}

impl ClientConfig {
    /// Creates the default configuration (unbounded conflict retries).
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the update conflict loop to `retries` rebases.
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = Some(retries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_unbounded() {
        assert_eq!(ClientConfig::new().max_conflict_retries, None);
    }

    #[test]
    fn config_builder() {
        let config = ClientConfig::new().with_max_conflict_retries(5);
        assert_eq!(config.max_conflict_retries, Some(5));
    }
}
