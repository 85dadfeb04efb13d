//! Authorization hook for the reference authority.
//!
//! The wire contract reserves the `None` sentinel in acknowledgments for
//! permission denials. This module is the decision point that produces
//! them; what counts as "permitted" is entirely the deployment's
//! business, so the authority only asks a policy object. `index` has no
//! sentinel on the wire and is therefore never policed.

/// The operations a policy can deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read a record.
    Retrieve,
    /// Create a record.
    Create,
    /// Replace a record with its next revision.
    Update,
    /// Tombstone a record.
    Delete,
}

impl Operation {
    /// Returns the wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Retrieve => "retrieve",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// One authorization question: may `operation` touch `key` in
/// `namespace`?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action<'a> {
    /// The operation being attempted.
    pub operation: Operation,
    /// Namespace the key lives in.
    pub namespace: &'a str,
    /// Key being addressed.
    pub key: &'a str,
}

/// Decides whether an operation is permitted.
///
/// A `false` answer surfaces to the client as the denial sentinel.
/// Closures of the right shape implement this trait, so test policies
/// stay one-liners.
pub trait AccessPolicy: Send + Sync {
    /// Returns true if the action is permitted.
    fn allows(&self, action: Action<'_>) -> bool;
}

/// The default policy: everything is permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn allows(&self, _action: Action<'_>) -> bool {
        true
    }
}

impl<F> AccessPolicy for F
where
    F: Fn(Action<'_>) -> bool + Send + Sync,
{
    fn allows(&self, action: Action<'_>) -> bool {
        self(action)
    }
}
