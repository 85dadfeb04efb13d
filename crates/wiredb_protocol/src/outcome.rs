//! Discriminated acknowledgment outcomes.
//!
//! The raw acknowledgments carry the tri-state sentinel the wire contract
//! requires. These enums are the decoded form; the conversion happens
//! here and nowhere else.

use crate::messages::{FetchAck, WriteAck};
use crate::record::VersionedRecord;

/// Decoded outcome of a `retrieve` acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A live record exists.
    Found(VersionedRecord),
    /// No live record; the authority may still return a tombstone.
    Missing(Option<VersionedRecord>),
    /// The authority denied the request.
    Denied,
}

/// Decoded outcome of a `create`, `update`, or `delete` acknowledgment.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write was accepted; this is the stored revision.
    Applied(VersionedRecord),
    /// The write was rejected. For update conflicts the authority's
    /// current record is attached as the rebase point.
    Rejected(Option<VersionedRecord>),
    /// The authority denied the request.
    Denied,
}

impl FetchAck {
    /// Decodes the sentinel into a [`FetchOutcome`].
    pub fn outcome(self) -> FetchOutcome {
        match (self.exists, self.record) {
            (None, _) => FetchOutcome::Denied,
            (Some(true), Some(record)) => FetchOutcome::Found(record),
            // `exists` without a record is malformed; read it as missing.
            (Some(true), None) => FetchOutcome::Missing(None),
            (Some(false), record) => FetchOutcome::Missing(record),
        }
    }
}

impl WriteAck {
    /// Decodes the sentinel into a [`WriteOutcome`].
    pub fn outcome(self) -> WriteOutcome {
        match (self.success, self.record) {
            (None, _) => WriteOutcome::Denied,
            (Some(true), Some(record)) => WriteOutcome::Applied(record),
            // `success` without a record is malformed; read it as a
            // rejection with no rebase point.
            (Some(true), None) => WriteOutcome::Rejected(None),
            (Some(false), record) => WriteOutcome::Rejected(record),
        }
    }
}
