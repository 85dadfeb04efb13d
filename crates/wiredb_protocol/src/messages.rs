//! Request, acknowledgment, and push-notification payloads.

use crate::record::VersionedRecord;
use serde::{Deserialize, Serialize};

/// A client-to-server request.
///
/// The serde tag is the wire event name, so an encoded request frames as
/// `{"event": "retrieve", "namespace": ..., "key": ...}`. Every request
/// except `register` is acknowledged exactly once by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientRequest {
    /// Subscribe to push notifications for a namespace. Fire-and-forget.
    Register {
        /// Namespace to subscribe to.
        namespace: String,
    },
    /// Request the full key list of a namespace.
    Index {
        /// Namespace to list.
        namespace: String,
    },
    /// Fetch the current record for a key.
    Retrieve {
        /// Namespace the key lives in.
        namespace: String,
        /// Key to fetch.
        key: String,
    },
    /// Create a record under a key that has no live record.
    Create {
        /// Namespace the key lives in.
        namespace: String,
        /// Key to create.
        key: String,
        /// Initial revision, serial 1.
        record: VersionedRecord,
    },
    /// Replace a record with its next revision.
    Update {
        /// Namespace the key lives in.
        namespace: String,
        /// Key to update.
        key: String,
        /// Candidate revision, serial = base serial + 1.
        record: VersionedRecord,
    },
    /// Tombstone the record under a key.
    Delete {
        /// Namespace the key lives in.
        namespace: String,
        /// Key to delete.
        key: String,
    },
}

impl ClientRequest {
    /// Returns the wire event name.
    pub fn event(&self) -> &'static str {
        match self {
            ClientRequest::Register { .. } => "register",
            ClientRequest::Index { .. } => "index",
            ClientRequest::Retrieve { .. } => "retrieve",
            ClientRequest::Create { .. } => "create",
            ClientRequest::Update { .. } => "update",
            ClientRequest::Delete { .. } => "delete",
        }
    }

    /// Returns true if the server acknowledges this request.
    pub fn expects_ack(&self) -> bool {
        !matches!(self, ClientRequest::Register { .. })
    }

    /// Returns the namespace the request addresses.
    pub fn namespace(&self) -> &str {
        match self {
            ClientRequest::Register { namespace }
            | ClientRequest::Index { namespace }
            | ClientRequest::Retrieve { namespace, .. }
            | ClientRequest::Create { namespace, .. }
            | ClientRequest::Update { namespace, .. }
            | ClientRequest::Delete { namespace, .. } => namespace,
        }
    }
}

/// Acknowledgment for `index`: the namespace's key list, verbatim.
///
/// `index` is the one acknowledged request without a sentinel field; the
/// wire contract gives it no denial signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexAck {
    /// Keys known to the authority for the namespace.
    pub keys: Vec<String>,
}

impl IndexAck {
    /// Creates an index acknowledgment.
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

/// Acknowledgment for `retrieve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchAck {
    /// Tri-state sentinel: `None` denies, otherwise whether a live
    /// record exists.
    pub exists: Option<bool>,
    /// The authority's record for the key, when one is known. Tombstones
    /// are returned with `exists = Some(false)`.
    pub record: Option<VersionedRecord>,
}

impl FetchAck {
    /// A live record was found.
    pub fn found(record: VersionedRecord) -> Self {
        Self {
            exists: Some(true),
            record: Some(record),
        }
    }

    /// No live record exists; a tombstone may still be attached.
    pub fn missing(record: Option<VersionedRecord>) -> Self {
        Self {
            exists: Some(false),
            record,
        }
    }

    /// Permission denied.
    pub fn denied() -> Self {
        Self {
            exists: None,
            record: None,
        }
    }
}

/// Acknowledgment for `create`, `update`, and `delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteAck {
    /// Tri-state sentinel: `None` denies, otherwise whether the write
    /// was accepted.
    pub success: Option<bool>,
    /// The authoritative record after arbitration: the stored revision on
    /// acceptance, the conflicting current revision on rejection, absent
    /// when the authority has nothing for the key.
    pub record: Option<VersionedRecord>,
}

impl WriteAck {
    /// The write was accepted; `record` is the stored revision.
    pub fn applied(record: VersionedRecord) -> Self {
        Self {
            success: Some(true),
            record: Some(record),
        }
    }

    /// The write was rejected, optionally carrying the authority's
    /// current record for rebasing.
    pub fn rejected(record: Option<VersionedRecord>) -> Self {
        Self {
            success: Some(false),
            record,
        }
    }

    /// Permission denied.
    pub fn denied() -> Self {
        Self {
            success: None,
            record: None,
        }
    }
}

/// An unsolicited server-to-client `update` notification.
///
/// Emitted for every accepted mutation, to every subscriber of the
/// record's namespace, in the order the server applies them. May arrive
/// at any time relative to unrelated acknowledgments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPush {
    /// Namespace the record belongs to.
    pub namespace: String,
    /// Key of the record.
    pub key: String,
    /// The record as the authority now holds it.
    pub record: VersionedRecord,
}
